//! Sequential, single-worker execution of a scenario's `cycle` of steps.

use std::path::Path;
use std::sync::Arc;

use crate::errors::LoadError;
use crate::logwriter::LogWriter;
use crate::metrics::MetricsRegistry;
use crate::scenario::Step;
use crate::template::{ResponseCycle, StaticVariable, StepResponses};

/// One worker's private, mutable copy of the scenario's steps plus the
/// responses they've recorded so far.
pub struct Cycle {
    steps: Vec<Step>,
}

impl Cycle {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    fn exists_cycles(&self) -> Result<(), LoadError> {
        if self.steps.is_empty() {
            return Err(LoadError::configuration("no cycle provided"));
        }
        Ok(())
    }

    fn step_log_line(index: usize, result: &Result<(), LoadError>) -> String {
        match result {
            Ok(()) => format!("cycle[{index}]: SUCCESS\n"),
            Err(e) => format!("cycle[{index}]: ERROR: {e}\n"),
        }
    }

    /// Run every step in order. On the first failure, the cycle aborts and
    /// the error is returned; everything already executed is still
    /// reflected in the metrics registry and the per-worker log, if any.
    pub async fn execute(
        &mut self,
        client: &reqwest::Client,
        variables: &[StaticVariable],
        loop_index: i64,
        worker: i64,
        metrics: &Arc<MetricsRegistry>,
        worker_log: Option<&LogWriter>,
        body_dir: Option<&Path>,
    ) -> Result<(), LoadError> {
        self.exists_cycles()?;

        let mut log = format!(
            "----------------\n\nWORKER [{worker}] | STEPS TO RUN: {} [0-{}]\n",
            self.steps.len(),
            self.steps.len() - 1
        );

        for i in 0..self.steps.len() {
            let preload_result = self.steps[i].preload(i);
            if let Err(e) = preload_result {
                log.push_str(&Self::step_log_line(i, &Err(e.clone())));
                if let Some(writer) = worker_log {
                    writer.send(log);
                }
                return Err(e);
            }

            let exec_result = {
                let (before, rest) = self.steps.split_at_mut(i);
                let step = &mut rest[0];
                let snapshot = StepsSnapshot { before };
                step.execute(client, variables, &snapshot).await
            };

            log.push_str(&Self::step_log_line(i, &exec_result.as_ref().map(|_| ()).map_err(|e| e.clone())));

            match exec_result {
                Ok(()) => {
                    if let Some(response) = &self.steps[i].response {
                        metrics.add_duration(loop_index, i as i64, response.duration);

                        if let Some(dir) = body_dir {
                            persist_response_body(dir, i, &self.steps[i]).await?;
                        }
                    }
                }
                Err(e) => {
                    if let Some(writer) = worker_log {
                        writer.send(log);
                    }
                    return Err(e);
                }
            }
        }

        if let Some(writer) = worker_log {
            writer.send(log);
        }

        Ok(())
    }
}

/// Write a completed step's response body under `<dir>/<index>/response-body.{json|txt}`.
/// The extension follows the response's `Content-Type`: `.json` iff it
/// contains the substring `json`, else `.txt`.
async fn persist_response_body(dir: &Path, index: usize, step: &Step) -> Result<(), LoadError> {
    let response = match &step.response {
        Some(r) => r,
        None => return Ok(()),
    };

    let extension = match &step.response_content_type {
        Some(ct) if ct.to_lowercase().contains("json") => "json",
        _ => "txt",
    };

    let step_dir = dir.join(index.to_string());
    tokio::fs::create_dir_all(&step_dir)
        .await
        .map_err(|e| LoadError::LogIo(format!("{}: {e}", step_dir.display())))?;

    let file_path = step_dir.join(format!("response-body.{extension}"));
    tokio::fs::write(&file_path, &response.body)
        .await
        .map_err(|e| LoadError::LogIo(format!("{}: {e}", file_path.display())))
}

/// A view over the steps executed so far in this cycle, used while `steps`
/// is mutably borrowed by the step currently running.
struct StepsSnapshot<'a> {
    before: &'a [Step],
}

impl StepResponses for StepsSnapshot<'_> {
    fn response_at(&self, index: usize) -> Option<&ResponseCycle> {
        self.before.get(index).and_then(|s| s.response.as_ref())
    }
}
