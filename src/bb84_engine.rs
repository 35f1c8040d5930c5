//! Simulation engine: the single entry point used by every front end.
//!
//! If a remote service is configured it is tried first; any failure there is
//! logged and the run is executed locally instead, so callers always get a
//! result of the same shape.

use std::time::Duration;

use log::{info, warn};

use crate::bb84_batch::{BatchAnalysis, BatchRunner};
use crate::bb84_config::SimulationConfig;
use crate::bb84_interface::{BackendError, Seed, SimulationError, SimulationResult};
use crate::bb84_params::ParameterSet;
use crate::bb84_pipeline::{CancelToken, SingleRunPipeline, Simulator};
use crate::bb84_progress::{ProgressSink, Stage};
use crate::bb84_remote::RemoteBackend;

pub struct SimulationEngine {
    config: SimulationConfig,
    pipeline: SingleRunPipeline,
    remote: Option<RemoteBackend>,
    cancel: CancelToken,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        let cancel = CancelToken::new();
        let pipeline = SingleRunPipeline::new(config.params.clone()).with_cancel_token(cancel.clone());
        let remote = config
            .remote_url
            .as_deref()
            .map(|url| RemoteBackend::new(url, Duration::from_millis(config.remote_timeout_ms)));

        Self {
            config,
            pipeline,
            remote,
            cancel,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Token that aborts runs and batches started from this engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn try_remote(&self, remote: &RemoteBackend) -> Result<SimulationResult, BackendError> {
        remote.health()?;
        remote.simulate(&self.config.params)
    }

    /// One run using the configured (or a fresh random) seed.
    pub fn run(&self, sink: &mut dyn ProgressSink) -> Result<SimulationResult, SimulationError> {
        self.simulate(self.config.resolve_seed(), sink)
    }

    /// A batch of `config.runs` runs.
    pub fn run_batch(&self, sink: &mut dyn ProgressSink) -> Result<BatchAnalysis, SimulationError> {
        BatchRunner::new(self, &self.config)
            .with_cancel_token(self.cancel.clone())
            .run(sink)
    }

    /// A batch that also returns every individual result.
    pub fn run_batch_with_results(
        &self,
        sink: &mut dyn ProgressSink,
    ) -> Result<(BatchAnalysis, Vec<SimulationResult>), SimulationError> {
        BatchRunner::new(self, &self.config)
            .with_cancel_token(self.cancel.clone())
            .run_with_results(sink)
    }
}

impl Simulator for SimulationEngine {
    fn params(&self) -> &ParameterSet {
        &self.config.params
    }

    fn simulate(
        &self,
        seed: Seed,
        sink: &mut dyn ProgressSink,
    ) -> Result<SimulationResult, SimulationError> {
        if let Some(remote) = &self.remote {
            sink.progress(Stage::Init.percent(), "Delegating to remote backend");
            match self.try_remote(remote) {
                Ok(result) => {
                    info!("remote simulation from {} accepted", remote.base_url());
                    sink.progress(Stage::Complete.percent(), Stage::Complete.label());
                    return Ok(result);
                }
                Err(e) => warn!("remote backend unavailable, running locally: {}", e),
            }
        }
        self.pipeline.run_seeded(seed, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bb84_progress::{CollectorSink, NoOpSink};
    use crate::bb84_remote::test_server::serve;

    fn local_config() -> SimulationConfig {
        SimulationConfig {
            params: ParameterSet::new(16, true, 30.0, 0.01, 0.95).unwrap(),
            runs: 20,
            seed: Some([77u8; 32]),
            ..Default::default()
        }
    }

    #[test]
    fn test_local_run_uses_config_seed() {
        let engine = SimulationEngine::new(local_config());
        let a = engine.run(&mut NoOpSink).unwrap();
        let b = engine.run(&mut NoOpSink).unwrap();
        assert_eq!(a.alice_bits, b.alice_bits);
        assert_eq!(a.bob_bits, b.bob_bits);
        assert!(a.seed_used.is_some());
    }

    #[test]
    fn test_unreachable_remote_falls_back() {
        let config = SimulationConfig {
            remote_url: Some("http://127.0.0.1:1".to_string()),
            remote_timeout_ms: 500,
            ..local_config()
        };
        let remote_engine = SimulationEngine::new(config);
        let local_engine = SimulationEngine::new(local_config());

        let mut collector = CollectorSink::new();
        let fallback = remote_engine.run(&mut collector).unwrap();
        let local = local_engine.run(&mut NoOpSink).unwrap();

        assert_eq!(fallback.alice_bits, local.alice_bits);
        assert_eq!(fallback.final_key, local.final_key);
        assert!(collector.is_monotonic());
        assert_eq!(collector.events.last().unwrap().percent, 100);
    }

    #[test]
    fn test_malformed_remote_falls_back() {
        let (url, _h) = serve(vec![(200, "ok".into()), (200, "{\"broken\":".into())]);
        let config = SimulationConfig {
            remote_url: Some(url),
            ..local_config()
        };
        let result = SimulationEngine::new(config).run(&mut NoOpSink).unwrap();
        // local results carry the seed, remote ones do not
        assert!(result.seed_used.is_some());
        assert_eq!(result.alice_bits.len(), 16);
    }

    #[test]
    fn test_remote_include_eve_mismatch_falls_back() {
        let no_eve = ParameterSet::new(16, false, 30.0, 0.01, 0.95).unwrap();
        let canned = SingleRunPipeline::new(no_eve)
            .run_seeded([2u8; 32], &mut NoOpSink)
            .unwrap();
        let body = serde_json::to_string(&canned).unwrap();
        let (url, handle) = serve(vec![(200, "ok".into()), (200, body)]);

        let config = SimulationConfig {
            remote_url: Some(url),
            ..local_config()
        };
        let result = SimulationEngine::new(config).run(&mut NoOpSink).unwrap();
        assert!(result.seed_used.is_some());
        assert!(result.include_eve);
        assert_eq!(handle.join().unwrap().len(), 2);
    }

    #[test]
    fn test_remote_with_tampered_error_rate_falls_back() {
        let mut canned = SingleRunPipeline::new(local_config().params)
            .run_seeded([6u8; 32], &mut NoOpSink)
            .unwrap();
        canned.error_rate = if canned.error_rate > 0.5 { 0.0 } else { 1.0 };
        let body = serde_json::to_string(&canned).unwrap();
        let (url, _h) = serve(vec![(200, "ok".into()), (200, body)]);

        let config = SimulationConfig {
            remote_url: Some(url),
            ..local_config()
        };
        let result = SimulationEngine::new(config).run(&mut NoOpSink).unwrap();
        assert!(result.seed_used.is_some());
    }

    #[test]
    fn test_healthy_remote_result_is_used() {
        let params = local_config().params;
        let canned = SingleRunPipeline::new(params)
            .run_seeded([1u8; 32], &mut NoOpSink)
            .unwrap();
        let body = serde_json::to_string(&canned).unwrap();
        let (url, handle) = serve(vec![(200, "ok".into()), (200, body)]);

        let config = SimulationConfig {
            remote_url: Some(url),
            ..local_config()
        };
        let mut collector = CollectorSink::new();
        let result = SimulationEngine::new(config).run(&mut collector).unwrap();

        assert_eq!(result.alice_bits, canned.alice_bits);
        assert_eq!(collector.events.len(), 2);
        assert_eq!(collector.events[1].percent, 100);
        assert_eq!(handle.join().unwrap().len(), 2);
    }

    #[test]
    fn test_batch_through_engine() {
        let analysis = SimulationEngine::new(local_config()).run_batch(&mut NoOpSink).unwrap();
        assert_eq!(analysis.total_runs, 20);
        assert_eq!(analysis.security_levels.total(), 20);
    }

    #[test]
    fn test_engine_cancel_token() {
        let engine = SimulationEngine::new(local_config());
        engine.cancel_token().cancel();
        assert!(matches!(
            engine.run(&mut NoOpSink),
            Err(SimulationError::Cancelled { .. })
        ));
        let analysis = engine.run_batch(&mut NoOpSink).unwrap();
        assert!(analysis.cancelled);
        assert_eq!(analysis.total_runs, 0);
    }
}
