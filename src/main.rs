// bb84-sim - command line runner
//
// Usage:
//   bb84-sim                                  single run, default parameters
//   bb84-sim --eve --eve-rate 100 --runs 500  batch with a full intercept-resend attack
//   bb84-sim --seed 0x2a... --json out.json   reproducible run, result written as JSON
//   bb84-sim --remote http://localhost:8000   try a remote service first

use std::env;
use std::process;
use std::str::FromStr;

use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use bb84_sim::bb84_export::{to_json, write_json};
use bb84_sim::{
    parse_seed_hex, LoggingProgressSink, NoOpSink, ParameterSet, ProgressSink, SimulationConfig,
    SimulationEngine,
};

#[derive(Debug)]
struct CliArgs {
    config: SimulationConfig,
    json_path: Option<String>,
    print_json: bool,
    verbose: bool,
    show_progress: bool,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [options]", program);
    eprintln!();
    eprintln!("  --qubits N          qubits per run (4..=32, default 20)");
    eprintln!("  --eve               include an eavesdropper");
    eprintln!("  --eve-rate P        interception rate in percent (default 30)");
    eprintln!("  --noise P           channel noise probability (default 0.01)");
    eprintln!("  --efficiency P      detector efficiency (default 0.95)");
    eprintln!("  --runs N            run a batch of N simulations");
    eprintln!("  --workers N         worker threads for batches (default 1)");
    eprintln!("  --seed HEX          fixed 32-byte seed");
    eprintln!("  --remote URL        remote simulation service");
    eprintln!("  --json PATH         write the result as JSON ('-' for stdout)");
    eprintln!("  --progress          log stage progress");
    eprintln!("  --verbose           debug logging");
    process::exit(2);
}

fn value<T: FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = args.get(i + 1).ok_or_else(|| format!("{} needs a value", flag))?;
    raw.parse::<T>()
        .map_err(|_| format!("{} got an invalid value '{}'", flag, raw))
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut builder = ParameterSet::builder();
    let mut config = SimulationConfig {
        runs: 1,
        ..Default::default()
    };
    let mut json_path = None;
    let mut verbose = false;
    let mut show_progress = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut consumed = 2;
        match flag {
            "--qubits" => builder = builder.num_qubits(value(args, i, flag)?),
            "--eve" => {
                builder = builder.include_eve(true);
                consumed = 1;
            }
            "--eve-rate" => builder = builder.eve_interception_rate(value(args, i, flag)?),
            "--noise" => builder = builder.noise_level(value(args, i, flag)?),
            "--efficiency" => builder = builder.detector_efficiency(value(args, i, flag)?),
            "--runs" => config.runs = value(args, i, flag)?,
            "--workers" => config.workers = value::<usize>(args, i, flag)?.max(1),
            "--seed" => config.seed = Some(parse_seed_hex(&value::<String>(args, i, flag)?)?),
            "--remote" => config.remote_url = Some(value(args, i, flag)?),
            "--json" => json_path = Some(value(args, i, flag)?),
            "--progress" => {
                show_progress = true;
                consumed = 1;
            }
            "--verbose" => {
                verbose = true;
                consumed = 1;
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
        i += consumed;
    }

    config.params = builder.build().map_err(|e| e.to_string())?;
    if config.runs == 0 {
        return Err("--runs must be at least 1".to_string());
    }

    let print_json = json_path.as_deref() == Some("-");
    Ok(CliArgs {
        config,
        json_path: json_path.filter(|p| p != "-"),
        print_json,
        verbose,
        show_progress,
    })
}

fn emit<T: serde::Serialize>(value: &T, cli: &CliArgs) -> Result<(), String> {
    if cli.print_json {
        println!("{}", to_json(value).map_err(|e| e.to_string())?);
    }
    if let Some(ref path) = cli.json_path {
        write_json(value, path).map_err(|e| e.to_string())?;
        println!("Wrote {}", path);
    }
    Ok(())
}

fn run(cli: &CliArgs) -> Result<(), String> {
    let engine = SimulationEngine::new(cli.config.clone());
    let mut progress: Box<dyn ProgressSink> = if cli.show_progress {
        Box::new(LoggingProgressSink::new(""))
    } else {
        Box::new(NoOpSink)
    };

    if cli.config.runs == 1 {
        let result = engine.run(progress.as_mut()).map_err(|e| e.to_string())?;
        if !cli.print_json {
            result.print_summary();
        }
        emit(&result, cli)
    } else {
        let analysis = engine.run_batch(progress.as_mut()).map_err(|e| e.to_string())?;
        if !cli.print_json {
            analysis.print_summary();
        }
        emit(&analysis, cli)
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("bb84-sim");

    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage(program);
    }

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {}\n", e);
            usage(program);
        }
    };

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger init failed: {}", e);
    }

    info!(
        "starting: {} qubits, eve={}, runs={}",
        cli.config.params.num_qubits(),
        cli.config.params.include_eve(),
        cli.config.runs
    );

    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}
