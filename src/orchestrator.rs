//! Top-level `run`: load a scenario file and drive it to completion.
//!
//! One call to [`run`] is one scenario file. It loads and validates the
//! scenario once, then for each loop spawns `parallel` worker tasks, each
//! with its own fresh `Cycle` deserialised from the original bytes, waits
//! for all of them (a strict barrier between loops), and finally emits a
//! mean-duration summary.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cycle::Cycle;
use crate::errors::LoadError;
use crate::logwriter::LogWriter;
use crate::metrics::MetricsRegistry;
use crate::scenario::{self, Scenario};

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Run the scenario described by `filename` to completion.
pub async fn run(filename: &str) -> Result<(), LoadError> {
    let content = tokio::fs::read(filename)
        .await
        .map_err(|e| LoadError::ScenarioLoad(format!("{filename}: {e}")))?;

    let scenario: Scenario = serde_json::from_slice(&content)?;
    scenario.preload()?;

    let variables = scenario::variables_for_replace(&scenario.variables);
    let metrics = Arc::new(MetricsRegistry::new());
    let client = crate::client::build_client()
        .map_err(|e| LoadError::configuration(format!("failed to build HTTP client: {e}")))?;

    let log_folder = scenario.log.trim().to_string();
    let log_enabled = scenario.log_enabled();

    let history = if log_enabled {
        tokio::fs::create_dir_all(&log_folder)
            .await
            .map_err(|e| LoadError::LogIo(format!("{log_folder}: {e}")))?;
        Some(LogWriter::start(format!("{log_folder}/history.txt")).await?)
    } else {
        None
    };

    for loop_index in 1..=scenario.total_loops() {
        let per_loop = if log_enabled {
            let writer = LogWriter::start(format!("{log_folder}/{loop_index}.loop.txt")).await?;
            writer.send(format!("LOOP [{loop_index}]"));
            Some(writer)
        } else {
            None
        };

        let mut tasks = Vec::new();
        for worker in 1..=scenario.workers_per_loop() {
            let content = content.clone();
            let variables = variables.clone();
            let client = client.clone();
            let metrics = Arc::clone(&metrics);
            let log_folder = log_folder.clone();

            tasks.push(tokio::spawn(async move {
                run_worker(
                    content,
                    variables,
                    client,
                    loop_index,
                    worker,
                    metrics,
                    log_enabled,
                    log_folder,
                )
                .await
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await);
        }

        for (worker, joined) in results.into_iter().enumerate() {
            let worker = worker as i64 + 1;
            let outcome = match joined {
                Ok(inner) => inner,
                Err(e) => Err(LoadError::Transport(format!("worker task panicked: {e}"))),
            };

            let line = match &outcome {
                Ok(()) => format!(
                    "{} | GROUP: {loop_index} | WORKER: {worker} | SUCCESS",
                    now_unix_secs()
                ),
                Err(e) => format!(
                    "{} | GROUP: {loop_index} | WORKER: {worker} | ERROR: {e}",
                    now_unix_secs()
                ),
            };

            if let Some(writer) = &history {
                writer.send(line);
            }
        }

        if let Some(writer) = per_loop {
            writer.wait().await?;
        }
    }

    if let Some(writer) = history {
        writer.wait().await?;
    }

    emit_summary(&metrics);

    Ok(())
}

fn emit_summary(metrics: &MetricsRegistry) {
    for average in metrics.averages_of_steps() {
        tracing::info!(step = average.index, mean_ms = ?average.mean, "step mean duration");
    }
    for average in metrics.averages_of_loop_steps() {
        tracing::info!(
            loop_index = ?average.loop_index,
            step = average.index,
            mean_ms = ?average.mean,
            "loop step mean duration"
        );
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    content: Vec<u8>,
    variables: Vec<crate::template::StaticVariable>,
    client: reqwest::Client,
    loop_index: i64,
    worker: i64,
    metrics: Arc<MetricsRegistry>,
    log_enabled: bool,
    log_folder: String,
) -> Result<(), LoadError> {
    let scenario: Scenario = serde_json::from_slice(&content)?;
    let mut cycle = Cycle::new(scenario.cycle);

    let worker_dir = format!("{log_folder}/{loop_index}/{worker}");
    let worker_log = if log_enabled {
        tokio::fs::create_dir_all(&worker_dir)
            .await
            .map_err(|e| LoadError::LogIo(format!("{worker_dir}: {e}")))?;
        Some(LogWriter::start(format!("{worker_dir}/history.txt")).await?)
    } else {
        None
    };

    let body_dir = if log_enabled {
        Some(Path::new(&worker_dir).join("body"))
    } else {
        None
    };

    let result = cycle
        .execute(
            &client,
            &variables,
            loop_index,
            worker,
            &metrics,
            worker_log.as_ref(),
            body_dir.as_deref(),
        )
        .await;

    if let Some(writer) = worker_log {
        writer.wait().await?;
    }

    result
}
