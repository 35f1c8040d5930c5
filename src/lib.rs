//! # bb84-sim - BB84 Quantum Key Distribution Simulator
//!
//! A classical, seeded simulation of the BB84 protocol: Alice prepares random
//! bits in random bases, an optional eavesdropper (Eve) intercepts and resends,
//! Bob measures through a noisy detector, and the two sift a shared key and
//! estimate the quantum bit error rate (QBER).
//!
//! ## Core Components
//!
//! - **ParameterSet**: Validated protocol parameters (qubits, Eve, noise, efficiency)
//! - **SingleRunPipeline**: One run through prepare, transmit, intercept, measure, reconcile, classify
//! - **BatchRunner**: Repeated runs with aggregate statistics, optionally on worker threads
//! - **SimulationEngine**: Front door that optionally delegates to a remote service
//!
//! ```no_run
//! use bb84_sim::{NoOpSink, ParameterSet, SingleRunPipeline};
//!
//! let params = ParameterSet::builder()
//!     .num_qubits(20)
//!     .include_eve(true)
//!     .eve_interception_rate(30.0)
//!     .build()
//!     .unwrap();
//!
//! let result = SingleRunPipeline::new(params)
//!     .run_seeded([42u8; 32], &mut NoOpSink)
//!     .unwrap();
//! result.print_summary();
//! ```
//!
//! ## Simulation Front Ends
//!
//! `src/main.rs` is a command line runner, and `simulator/scenario_runner.rs`
//! executes YAML scenario files.

// Data model and parameters
pub mod bb84_interface;
pub mod bb84_params;
pub mod bb84_config;

// Protocol stages
pub mod bb84_preparer;
pub mod bb84_channel;
pub mod bb84_measurer;
pub mod bb84_reconciler;
pub mod bb84_security;

// Orchestration
pub mod bb84_progress;
pub mod bb84_pipeline;
pub mod bb84_batch;
pub mod bb84_remote;
pub mod bb84_engine;

// Output
pub mod bb84_export;

pub use bb84_batch::{BatchAnalysis, BatchRunner, SecurityHistogram};
pub use bb84_config::{derive_run_seed, SimulationConfig};
pub use bb84_engine::SimulationEngine;
pub use bb84_interface::{
    parse_seed_hex, seed_to_hex, BackendError, Basis, Bit, ConfigurationError, ExportError,
    Qubit, Seed, SecurityAssessment, SecurityLevel, SimulationError, SimulationResult,
};
pub use bb84_params::{ParameterSet, ParameterSetBuilder};
pub use bb84_pipeline::{CancelToken, Simulator, SingleRunPipeline};
pub use bb84_progress::{
    CollectorSink, LoggingProgressSink, MultiSink, NoOpSink, ProgressEvent, ProgressSink, Stage,
};
pub use bb84_remote::RemoteBackend;
