// Scenario Runner - Load and execute BB84 scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/no_eve.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/no_eve.yaml --seed 0x1234...

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bb84_sim::bb84_export::{write_json, write_runs_csv_file};
use bb84_sim::{
    parse_seed_hex, LoggingProgressSink, ParameterSet, Seed, SimulationConfig, SimulationEngine,
};
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    /// Configuration
    config: ScenarioConfig,

    /// Where to write results (optional)
    #[serde(default)]
    output: ScenarioOutput,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
    hypothesis: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ScenarioConfig {
    #[serde(default)]
    params: ParameterSet,

    #[serde(default = "default_runs")]
    runs: usize,

    #[serde(default = "default_workers")]
    workers: usize,

    /// Hex seed; the command line `--seed` wins over this
    #[serde(default)]
    seed: Option<String>,

    #[serde(default)]
    remote_url: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioOutput {
    json_path: Option<PathBuf>,
    csv_path: Option<PathBuf>,
}

fn default_runs() -> usize {
    bb84_sim::bb84_config::DEFAULT_BATCH_RUNS
}

fn default_workers() -> usize {
    1
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX] [--verbose]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/no_eve.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/full_intercept.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    let verbose = args.iter().any(|a| a == "--verbose");
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger init failed: {}", e);
    }

    let path = Path::new(&args[1]);

    // Parse optional seed
    let seed: Option<Seed> = match args.iter().position(|a| a == "--seed") {
        Some(i) => match args.get(i + 1).map(|s| parse_seed_hex(s)) {
            Some(Ok(seed)) => Some(seed),
            Some(Err(e)) => {
                eprintln!("Invalid seed: {}", e);
                std::process::exit(1);
            }
            None => {
                eprintln!("--seed needs a hex value");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let ok = if path.is_file() {
        run_scenario_file(path, seed)
    } else if path.is_dir() {
        run_scenario_directory(path, seed)
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        false
    };

    if !ok {
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<Seed>) -> bool {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        return false;
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  BB84 SCENARIO RUNNER - Multiple Scenarios             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    let mut failures = 0;
    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        if !run_scenario_file(scenario_path, seed) {
            failures += 1;
        }
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete! ({} failed)                    ", failures);
    println!("╚════════════════════════════════════════════════════════╝\n");
    failures == 0
}

fn load_scenario(path: &Path) -> Result<ScenarioFile, String> {
    let yaml_content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&yaml_content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn build_config(scenario: &ScenarioConfig, seed: Option<Seed>) -> Result<SimulationConfig, String> {
    let seed = match (seed, &scenario.seed) {
        (Some(seed), _) => Some(seed),
        (None, Some(hex)) => Some(parse_seed_hex(hex)?),
        (None, None) => None,
    };
    Ok(SimulationConfig {
        params: scenario.params.clone(),
        runs: scenario.runs,
        seed,
        workers: scenario.workers.max(1),
        remote_url: scenario.remote_url.clone(),
        ..Default::default()
    })
}

fn run_scenario_file(path: &Path, seed: Option<Seed>) -> bool {
    println!("Loading scenario from: {}", path.display());

    let scenario = match load_scenario(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return false;
        }
    };

    // Print scenario header
    let name = scenario.meta.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario")
            .to_string()
    });
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  {}{}║", name, " ".repeat(54_usize.saturating_sub(name.len())));
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = match build_config(&scenario.config, seed) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid seed in {}: {}", path.display(), e);
            return false;
        }
    };

    println!("Configuration:");
    println!("  Qubits per run: {}", config.params.num_qubits());
    println!("  Eve: {}", config.params.include_eve());
    println!("  Eve interception rate: {:.1}%", config.params.eve_interception_rate());
    println!("  Noise level: {:.3}", config.params.noise_level());
    println!("  Detector efficiency: {:.3}", config.params.detector_efficiency());
    println!("  Runs: {} on {} worker(s)", config.runs, config.workers);
    println!("\nStarting simulation...\n");

    let engine = SimulationEngine::new(config);
    let mut sink = LoggingProgressSink::new(format!("[{}] ", name));
    let (analysis, results) = match engine.run_batch_with_results(&mut sink) {
        Ok(r) => r,
        Err(e) => {
            error!("scenario {} failed: {}", name, e);
            return false;
        }
    };

    analysis.print_summary();

    if let Some(ref json_path) = scenario.output.json_path {
        if let Err(e) = write_json(&analysis, json_path) {
            eprintln!("Failed to write {}: {}", json_path.display(), e);
            return false;
        }
        println!("Wrote batch analysis to {}", json_path.display());
    }
    if let Some(ref csv_path) = scenario.output.csv_path {
        if let Err(e) = write_runs_csv_file(&results, csv_path) {
            eprintln!("Failed to write {}: {}", csv_path.display(), e);
            return false;
        }
        println!("Wrote per-run rows to {}", csv_path.display());
    }

    println!("\n✓ Scenario complete!\n");
    true
}
