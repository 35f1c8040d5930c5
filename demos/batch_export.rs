//! Run a batch and export it as JSON and CSV
//!
//! Run with: cargo run --example batch_export

use std::env;

use bb84_sim::bb84_export::{write_json, write_qubits_csv, write_runs_csv_file};
use bb84_sim::{LoggingProgressSink, SimulationConfig, SimulationEngine};
use log::info;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new().init().unwrap();

    let out_dir = env::temp_dir();
    let config = SimulationConfig {
        runs: 50,
        seed: Some([3u8; 32]),
        ..Default::default()
    };

    let engine = SimulationEngine::new(config);
    let mut sink = LoggingProgressSink::new("[export] ");
    let (analysis, results) = engine.run_batch_with_results(&mut sink).unwrap();
    analysis.print_summary();

    let json_path = out_dir.join("bb84_batch.json");
    let csv_path = out_dir.join("bb84_runs.csv");
    write_json(&analysis, &json_path).unwrap();
    write_runs_csv_file(&results, &csv_path).unwrap();

    // per-qubit view of the first run on stdout
    if let Some(first) = results.first() {
        write_qubits_csv(first, std::io::stdout()).unwrap();
    }

    info!("✓ Exported {} and {}", json_path.display(), csv_path.display());
}
