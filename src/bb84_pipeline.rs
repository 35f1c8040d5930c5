//! Single-run pipeline: prepare → transmit → [intercept] → measure →
//! reconcile → classify.
//!
//! Each stage consumes only its predecessor's output and the shared
//! `ParameterSet`. Progress is reported after each stage, and the cancel
//! token is checked before each stage begins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bb84_channel::{intercept_resend, transmit};
use crate::bb84_interface::{seed_to_hex, Seed, SimulationError, SimulationResult, Timestamp};
use crate::bb84_measurer::{measure, Detector};
use crate::bb84_params::ParameterSet;
use crate::bb84_progress::{CollectorSink, ProgressEvent, ProgressSink, Stage};
use crate::bb84_reconciler::reconcile;
use crate::bb84_security::classify;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub(crate) fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// Tracks the current state and enforces forward-only transitions.
struct StageTracker<'a> {
    current: Stage,
    cancel: &'a CancelToken,
}

impl<'a> StageTracker<'a> {
    fn begin(&self, next: Stage) -> Result<(), SimulationError> {
        if self.cancel.is_cancelled() {
            debug!("cancelled before {:?}", next);
            return Err(SimulationError::Cancelled { stage: next.label() });
        }
        Ok(())
    }

    fn complete(&mut self, stage: Stage, sink: &mut dyn ProgressSink) {
        debug_assert!(stage >= self.current, "stage {:?} after {:?}", stage, self.current);
        self.current = stage;
        debug!("stage {:?} ({}%)", stage, stage.percent());
        sink.progress(stage.percent(), stage.label());
    }
}

/// Anything that can produce one `SimulationResult` from a seed.
///
/// `Sync` so batch workers can share one instance.
pub trait Simulator: Sync {
    fn params(&self) -> &ParameterSet;

    fn simulate(
        &self,
        seed: Seed,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError>;
}

impl<T: Simulator + ?Sized> Simulator for &T {
    fn params(&self) -> &ParameterSet {
        (**self).params()
    }

    fn simulate(
        &self,
        seed: Seed,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError> {
        (**self).simulate(seed, sink)
    }
}

/// Runs one simulation against a fixed parameter set.
#[derive(Debug, Clone)]
pub struct SingleRunPipeline {
    params: ParameterSet,
    cancel: CancelToken,
}

impl SingleRunPipeline {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Runs the pipeline drawing every random choice from `rng`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError> {
        let params = &self.params;
        let n = params.num_qubits();
        let mut tracker = StageTracker {
            current: Stage::Init,
            cancel: &self.cancel,
        };

        tracker.begin(Stage::Init)?;
        tracker.complete(Stage::Init, sink);

        tracker.begin(Stage::Prepared)?;
        let prepared = crate::bb84_preparer::prepare(n, rng);
        let alice_bits = prepared.bits;
        let alice_bases = prepared.bases;
        let in_transit = prepared.qubits;
        tracker.complete(Stage::Prepared, sink);

        tracker.begin(Stage::Transmitted)?;
        tracker.complete(Stage::Transmitted, sink);

        let channel = if params.include_eve() {
            tracker.begin(Stage::Intercepted)?;
            let out = intercept_resend(in_transit, params.eve_interception_probability(), rng);
            tracker.complete(Stage::Intercepted, sink);
            out
        } else {
            transmit(in_transit)
        };

        tracker.begin(Stage::Measured)?;
        let detector = Detector::from_params(params);
        let bob = measure(&channel.qubits, &detector, rng);
        tracker.complete(Stage::Measured, sink);

        tracker.begin(Stage::Reconciled)?;
        let recon = reconcile(&alice_bits, &alice_bases, &bob.bits, &bob.bases);
        tracker.complete(Stage::Reconciled, sink);

        tracker.begin(Stage::Classified)?;
        let assessment = classify(recon.error_rate, params.include_eve());
        tracker.complete(Stage::Classified, sink);

        let result = SimulationResult {
            alice_bits,
            alice_bases,
            bob_bits: bob.bits,
            bob_bases: bob.bases,
            eve_bits: channel.eve.iter().map(|e| e.measured_bit).collect(),
            eve_bases: channel.eve.iter().map(|e| e.measured_basis).collect(),
            eve_interceptions: channel.eve.iter().map(|e| e.intercepted).collect(),
            matching_bases: recon.matching_bases,
            final_key: recon.final_key,
            error_rate: recon.error_rate,
            transmission_efficiency: recon.transmission_efficiency,
            quantum_fidelity: recon.quantum_fidelity,
            include_eve: params.include_eve(),
            security_assessment: assessment,
            seed_used: None,
            timestamp: now_millis(),
        };
        result.check_shape(n).map_err(SimulationError::Computation)?;

        tracker.begin(Stage::Complete)?;
        tracker.complete(Stage::Complete, sink);
        Ok(result)
    }

    /// Runs with a fresh `StdRng` seeded from `seed`; the seed is recorded on the result.
    pub fn run_seeded(
        &self,
        seed: Seed,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError> {
        let mut rng = StdRng::from_seed(seed);
        let mut result = self.run(&mut rng, sink)?;
        result.seed_used = Some(seed_to_hex(&seed));
        debug!(
            "run complete: key={} qber={:.3} security={}",
            result.final_key.len(),
            result.error_rate,
            result.security_level().label()
        );
        Ok(result)
    }

    /// Runs with a seed and returns the result together with every progress
    /// event that was emitted.
    pub fn run_recorded(
        &self,
        seed: Seed,
    ) -> Result<(SimulationResult, Vec<ProgressEvent>), SimulationError> {
        let mut collector = CollectorSink::new();
        let result = self.run_seeded(seed, &mut collector)?;
        Ok((result, collector.into_events()))
    }
}

impl Simulator for SingleRunPipeline {
    fn params(&self) -> &ParameterSet {
        &self.params
    }

    fn simulate(
        &self,
        seed: Seed,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError> {
        self.run_seeded(seed, sink)
    }
}
