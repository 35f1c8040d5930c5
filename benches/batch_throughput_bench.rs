use bb84_sim::{BatchRunner, NoOpSink, ParameterSet, SimulationConfig, SingleRunPipeline};
use std::time::Instant;

/// Benchmark batch throughput for different qubit counts and worker counts
fn main() {
    // Suppress debug logs for cleaner output
    let _ = simple_logger::init_with_level(log::Level::Error);

    println!("\n=== BB84 Batch Throughput Benchmark ===\n");

    let runs = 2000;

    for num_qubits in [8, 20, 32] {
        for workers in [1, 2, 4, 8] {
            let params = ParameterSet::builder()
                .num_qubits(num_qubits)
                .include_eve(true)
                .build()
                .unwrap();
            let config = SimulationConfig {
                params: params.clone(),
                runs,
                seed: Some([1u8; 32]),
                workers,
                ..Default::default()
            };

            let runner = BatchRunner::new(SingleRunPipeline::new(params), &config);
            let start = Instant::now();
            let analysis = runner.run(&mut NoOpSink).unwrap();
            let elapsed = start.elapsed();

            println!(
                "  {:>2} qubits, {} worker(s): {:>8.2?} total, {:>7.1} runs/ms, avg QBER {:.3}",
                num_qubits,
                workers,
                elapsed,
                analysis.total_runs as f64 / elapsed.as_secs_f64() / 1000.0,
                analysis.average_error_rate
            );
        }
        println!();
    }
}
