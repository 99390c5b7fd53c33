//! Thread-safe accumulation of step durations and their means.
//!
//! One registry per run, constructed by the orchestrator and shared via
//! `Arc` into every worker's cycle — never a process-wide singleton, so
//! concurrent runs (including concurrent test cases in one test binary)
//! never cross-contaminate each other's numbers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// One `{loop?, index, mean}` record produced by [`MetricsRegistry::averages_of_steps`]
/// or [`MetricsRegistry::averages_of_loop_steps`].
#[derive(Debug, Clone, PartialEq)]
pub struct AverageTime {
    pub loop_index: Option<i64>,
    pub index: i64,
    pub mean: Duration,
}

#[derive(Default)]
struct Totals {
    duration_steps_loop: HashMap<String, u64>,
    duration_steps: HashMap<String, u64>,
    total_steps_loop: HashMap<String, u64>,
    total_steps: HashMap<String, u64>,
}

/// Accumulates per-step and per-(loop,step) duration sums/counts behind a
/// single mutex; sums are kept in microseconds so that sub-millisecond
/// steps still contribute non-zero weight to the mean.
pub struct MetricsRegistry {
    state: Mutex<Totals>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Totals::default()),
        }
    }

    fn key_loop_and_index(loop_index: i64, index: i64) -> String {
        format!("{loop_index}-{index}")
    }

    fn key_index(index: i64) -> String {
        format!("{index}")
    }

    /// Record one successful step's duration.
    pub fn add_duration(&self, loop_index: i64, index: i64, duration: Duration) {
        let micros = duration.as_micros() as u64;
        let key_both = Self::key_loop_and_index(loop_index, index);
        let key_idx = Self::key_index(index);

        let mut state = self.state.lock().expect("metrics mutex poisoned");
        *state.duration_steps_loop.entry(key_both.clone()).or_insert(0) += micros;
        *state.duration_steps.entry(key_idx.clone()).or_insert(0) += micros;
        *state.total_steps_loop.entry(key_both).or_insert(0) += 1;
        *state.total_steps.entry(key_idx).or_insert(0) += 1;
    }

    fn mean(sum_micros: u64, count: u64) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        let mean_micros = (sum_micros as f64 / count as f64).trunc() as u64;
        Duration::from_millis(mean_micros / 1000)
    }

    /// Mean duration per `(loop, index)` key.
    pub fn averages_of_loop_steps(&self) -> Vec<AverageTime> {
        let state = self.state.lock().expect("metrics mutex poisoned");
        state
            .duration_steps_loop
            .keys()
            .map(|key| {
                let mut parts = key.splitn(2, '-');
                let loop_index: i64 = parts.next().unwrap().parse().unwrap();
                let index: i64 = parts.next().unwrap().parse().unwrap();
                let sum = *state.duration_steps_loop.get(key).unwrap();
                let count = *state.total_steps_loop.get(key).unwrap();
                AverageTime {
                    loop_index: Some(loop_index),
                    index,
                    mean: Self::mean(sum, count),
                }
            })
            .collect()
    }

    /// Mean duration per `index` key, aggregated across all loops/workers.
    pub fn averages_of_steps(&self) -> Vec<AverageTime> {
        let state = self.state.lock().expect("metrics mutex poisoned");
        state
            .duration_steps
            .keys()
            .map(|key| {
                let index: i64 = key.parse().unwrap();
                let sum = *state.duration_steps.get(key).unwrap();
                let count = *state.total_steps.get(key).unwrap();
                AverageTime {
                    loop_index: None,
                    index,
                    mean: Self::mean(sum, count),
                }
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
