//! Configuration for single runs and batches

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::bb84_interface::Seed;
use crate::bb84_params::ParameterSet;

pub const DEFAULT_BATCH_RUNS: usize = 100;
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 2000;

/// Configuration for a simulation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Protocol parameters shared by every run
    pub params: ParameterSet,

    /// Number of runs in a batch
    pub runs: usize,

    /// Random seed (None = generate random)
    #[serde(skip)]
    pub seed: Option<Seed>,

    /// Worker threads for batch execution (1 = run inline)
    pub workers: usize,

    /// Base URL of an optional remote simulation service
    pub remote_url: Option<String>,

    /// Per-request timeout for the remote service
    pub remote_timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            params: ParameterSet::default(),
            runs: DEFAULT_BATCH_RUNS,
            seed: None,
            workers: 1,
            remote_url: None,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl SimulationConfig {
    /// Get or generate seed
    pub fn resolve_seed(&self) -> Seed {
        self.seed.unwrap_or_else(|| {
            let mut temp_rng = StdRng::from_entropy();
            let mut seed = [0u8; 32];
            temp_rng.fill_bytes(&mut seed);
            seed
        })
    }
}

/// Derives an independent seed for run `index` of a batch.
///
/// Runs get their own StdRng stream, so the batch result does not depend on
/// which worker executes which run.
pub fn derive_run_seed(batch_seed: &Seed, index: usize) -> Seed {
    let mut hasher = blake3::Hasher::new();
    hasher.update(batch_seed);
    hasher.update(&(index as u64).to_le_bytes());
    *hasher.finalize().as_bytes()
}
