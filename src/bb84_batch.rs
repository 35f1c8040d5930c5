//! Batch execution and statistics over many independent runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bb84_config::{derive_run_seed, SimulationConfig};
use crate::bb84_interface::{seed_to_hex, Seed, SecurityLevel, SimulationError, SimulationResult, Timestamp};
use crate::bb84_pipeline::{now_millis, CancelToken, Simulator};
use crate::bb84_progress::{NoOpSink, ProgressSink};
use crate::bb84_security::security_level;

// ============================================================================
// Batch Statistics
// ============================================================================

/// Security-level histogram over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityHistogram {
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
}

impl SecurityHistogram {
    pub fn record(&mut self, level: SecurityLevel) {
        match level {
            SecurityLevel::High => self.high += 1,
            SecurityLevel::Medium => self.medium += 1,
            SecurityLevel::Low => self.low += 1,
        }
    }

    pub fn get(&self, level: SecurityLevel) -> usize {
        match level {
            SecurityLevel::High => self.high,
            SecurityLevel::Medium => self.medium,
            SecurityLevel::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Aggregate over one batch. Built once from the finished runs; nothing
/// carries over between batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnalysis {
    /// Runs that completed and were aggregated
    pub total_runs: usize,

    /// Runs asked for. Equal to `total_runs` unless the batch was cancelled.
    pub requested_runs: usize,

    pub cancelled: bool,

    pub average_key_length: f64,
    pub average_error_rate: f64,
    pub average_efficiency: f64,

    pub min_error_rate: f64,
    pub max_error_rate: f64,
    pub error_rate_std_dev: f64,

    /// Runs that ended with no key bits at all
    pub empty_key_runs: usize,

    pub security_levels: SecurityHistogram,

    /// Raw per-run values, in run order, for distribution plots
    pub error_rates: Vec<f64>,
    pub key_lengths: Vec<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_used: Option<String>,
    pub timestamp: Timestamp,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl BatchAnalysis {
    /// Aggregates finished runs.
    pub fn from_results(results: &[SimulationResult], requested_runs: usize) -> Self {
        let error_rates: Vec<f64> = results.iter().map(|r| r.error_rate).collect();
        let key_lengths: Vec<usize> = results.iter().map(|r| r.final_key.len()).collect();

        let mut security_levels = SecurityHistogram::default();
        for r in results {
            security_levels.record(security_level(r.error_rate));
        }

        let average_error_rate = mean(error_rates.iter().copied());
        let variance = mean(error_rates.iter().map(|e| (e - average_error_rate).powi(2)));

        Self {
            total_runs: results.len(),
            requested_runs,
            cancelled: results.len() < requested_runs,
            average_key_length: mean(key_lengths.iter().map(|&k| k as f64)),
            average_error_rate,
            average_efficiency: mean(results.iter().map(|r| r.transmission_efficiency)),
            min_error_rate: if error_rates.is_empty() {
                0.0
            } else {
                error_rates.iter().copied().fold(f64::INFINITY, f64::min)
            },
            max_error_rate: error_rates.iter().copied().fold(0.0, f64::max),
            error_rate_std_dev: variance.sqrt(),
            empty_key_runs: key_lengths.iter().filter(|&&k| k == 0).count(),
            security_levels,
            error_rates,
            key_lengths,
            seed_used: None,
            timestamp: now_millis(),
        }
    }

    /// Fraction of runs at `level`, 0 for an empty batch.
    pub fn level_fraction(&self, level: SecurityLevel) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.security_levels.get(level) as f64 / self.total_runs as f64
        }
    }

    /// Print a summary of the batch
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        BB84 Batch Analysis                            ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Configuration:");
        if let Some(ref seed) = self.seed_used {
            println!("  Seed: {}", seed);
        }
        println!("  Runs: {}/{}", self.total_runs, self.requested_runs);
        if self.cancelled {
            println!("  (cancelled before completion)");
        }
        println!();

        println!("Key Statistics:");
        println!("  Average key length: {:.2}", self.average_key_length);
        println!("  Runs with empty key: {}", self.empty_key_runs);
        if let (Some(min), Some(max)) = (self.key_lengths.iter().min(), self.key_lengths.iter().max()) {
            println!("  Key length: min={}, max={}", min, max);
        }
        println!();

        println!("Error Statistics:");
        println!("  Average error rate: {:.2}%", self.average_error_rate * 100.0);
        println!(
            "  Error rate: min={:.2}%, max={:.2}%, std={:.2}%",
            self.min_error_rate * 100.0,
            self.max_error_rate * 100.0,
            self.error_rate_std_dev * 100.0
        );
        println!("  Average efficiency: {:.2}%", self.average_efficiency * 100.0);
        println!();

        println!("Security Levels:");
        for level in [SecurityLevel::High, SecurityLevel::Medium, SecurityLevel::Low] {
            println!(
                "  {:<6} {:>5} ({:.1}%)",
                level.label(),
                self.security_levels.get(level),
                self.level_fraction(level) * 100.0
            );
        }
        println!();
    }
}

// ============================================================================
// Batch Runner
// ============================================================================

/// Runs a simulator N times and aggregates the results.
pub struct BatchRunner<S: Simulator> {
    simulator: S,
    runs: usize,
    seed: Seed,
    workers: usize,
    cancel: CancelToken,
}

impl<S: Simulator> BatchRunner<S> {
    pub fn new(simulator: S, config: &SimulationConfig) -> Self {
        Self {
            simulator,
            runs: config.runs,
            seed: config.resolve_seed(),
            workers: config.workers.max(1),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Runs the batch and returns only the aggregate.
    pub fn run(&self, sink: &mut dyn ProgressSink) -> Result<BatchAnalysis, SimulationError> {
        self.run_with_results(sink).map(|(analysis, _)| analysis)
    }

    /// Runs the batch and returns the aggregate plus every completed result in run order.
    ///
    /// A cancelled batch is not an error: the aggregate covers the runs that
    /// finished and has `cancelled` set.
    pub fn run_with_results(
        &self,
        sink: &mut dyn ProgressSink,
    ) -> Result<(BatchAnalysis, Vec<SimulationResult>), SimulationError> {
        let params = self.simulator.params();
        info!(
            "batch start: runs={} workers={} qubits={} eve={} seed={}",
            self.runs,
            self.workers,
            params.num_qubits(),
            params.include_eve(),
            seed_to_hex(&self.seed)
        );
        sink.progress(0, "Starting batch");

        let results = if self.workers <= 1 || self.runs <= 1 {
            self.run_sequential(sink)?
        } else {
            self.run_parallel(sink)?
        };

        let mut analysis = BatchAnalysis::from_results(&results, self.runs);
        analysis.seed_used = Some(seed_to_hex(&self.seed));
        if analysis.cancelled {
            warn!("batch cancelled after {}/{} runs", analysis.total_runs, self.runs);
        }
        info!(
            "batch done: runs={} avg_key={:.2} avg_qber={:.4} HIGH={} MEDIUM={} LOW={}",
            analysis.total_runs,
            analysis.average_key_length,
            analysis.average_error_rate,
            analysis.security_levels.high,
            analysis.security_levels.medium,
            analysis.security_levels.low
        );
        Ok((analysis, results))
    }

    fn report(&self, completed: usize, sink: &mut dyn ProgressSink) {
        let percent = (completed * 100 / self.runs.max(1)) as u8;
        sink.progress(percent, &format!("Run {}/{}", completed, self.runs));
    }

    fn run_sequential(&self, sink: &mut dyn ProgressSink) -> Result<Vec<SimulationResult>, SimulationError> {
        let mut results = Vec::with_capacity(self.runs);

        for index in 0..self.runs {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.simulator.simulate(derive_run_seed(&self.seed, index), &mut NoOpSink) {
                Ok(result) => results.push(result),
                Err(SimulationError::Cancelled { .. }) => break,
                Err(e) => return Err(e),
            }
            self.report(results.len(), sink);
        }

        Ok(results)
    }

    /// Workers pull run indices from a shared counter and send finished runs
    /// to this thread, which is the only place results are aggregated and
    /// progress is reported.
    fn run_parallel(&self, sink: &mut dyn ProgressSink) -> Result<Vec<SimulationResult>, SimulationError> {
        let next_index = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<SimulationResult, SimulationError>)>();

        let mut slots: Vec<Option<SimulationResult>> = vec![None; self.runs];
        let mut completed = 0;
        let mut failure: Option<SimulationError> = None;

        std::thread::scope(|s| {
            for worker in 0..self.workers {
                let tx = tx.clone();
                let next_index = &next_index;
                let stop = &stop;
                s.spawn(move || {
                    let mut done = 0;
                    loop {
                        if stop.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
                            break;
                        }
                        let index = next_index.fetch_add(1, Ordering::SeqCst);
                        if index >= self.runs {
                            break;
                        }
                        let outcome = self
                            .simulator
                            .simulate(derive_run_seed(&self.seed, index), &mut NoOpSink);
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                        done += 1;
                    }
                    debug!("worker {} finished after {} runs", worker, done);
                });
            }
            drop(tx);

            for (index, outcome) in rx {
                match outcome {
                    Ok(result) => {
                        slots[index] = Some(result);
                        completed += 1;
                        self.report(completed, sink);
                    }
                    Err(SimulationError::Cancelled { .. }) => {}
                    Err(e) => {
                        stop.store(true, Ordering::SeqCst);
                        failure.get_or_insert(e);
                    }
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}
