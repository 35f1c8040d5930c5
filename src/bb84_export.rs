//! Export of results for external tools

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::bb84_interface::{Basis, Bit, ExportError, SimulationResult};
use crate::bb84_security::security_level;

/// Pretty JSON with the record's camelCase field names.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    info!("wrote {}", path.as_ref().display());
    Ok(())
}

fn bits_field(bits: &[Bit]) -> String {
    bits.iter().map(|b| b.to_string()).collect()
}

fn bases_field(bases: &[Basis]) -> String {
    bases.iter().map(|b| b.label()).collect()
}

/// One CSV row per run, in run order.
pub fn write_runs_csv<W: Write>(results: &[SimulationResult], mut writer: W) -> Result<(), ExportError> {
    writeln!(
        writer,
        "run,num_qubits,include_eve,intercepted,matching,key_length,error_rate,efficiency,fidelity,security_level,final_key"
    )?;
    for (i, r) in results.iter().enumerate() {
        writeln!(
            writer,
            "{},{},{},{},{},{},{:.6},{:.6},{:.6},{},{}",
            i,
            r.num_qubits(),
            r.include_eve,
            r.eve_interceptions.iter().filter(|&&x| x).count(),
            r.matching_bases.iter().filter(|&&m| m).count(),
            r.final_key.len(),
            r.error_rate,
            r.transmission_efficiency,
            r.quantum_fidelity,
            security_level(r.error_rate).label(),
            bits_field(&r.final_key)
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_runs_csv_file<P: AsRef<Path>>(results: &[SimulationResult], path: P) -> Result<(), ExportError> {
    let file = File::create(path.as_ref())?;
    write_runs_csv(results, BufWriter::new(file))?;
    info!("wrote {} rows to {}", results.len(), path.as_ref().display());
    Ok(())
}

/// Per-qubit table for a single run.
pub fn write_qubits_csv<W: Write>(result: &SimulationResult, mut writer: W) -> Result<(), ExportError> {
    writeln!(writer, "index,alice_bit,alice_basis,eve_basis,eve_bit,bob_basis,bob_bit,match")?;
    for i in 0..result.num_qubits() {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            i,
            result.alice_bits[i],
            result.alice_bases[i].label(),
            result.eve_bases[i].map(|b| b.label()).unwrap_or("-"),
            result.eve_bits[i].map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
            result.bob_bases[i].label(),
            result.bob_bits[i],
            result.matching_bases[i]
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Compact one-line rendering of a run, e.g. for logs.
pub fn describe(result: &SimulationResult) -> String {
    format!(
        "alice={} bases={} bob={} key={} qber={:.3}",
        bits_field(&result.alice_bits),
        bases_field(&result.alice_bases),
        bits_field(&result.bob_bits),
        bits_field(&result.final_key),
        result.error_rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bb84_batch::BatchAnalysis;
    use crate::bb84_params::ParameterSet;
    use crate::bb84_pipeline::SingleRunPipeline;
    use crate::bb84_progress::NoOpSink;

    fn sample(eve: bool) -> SimulationResult {
        let params = ParameterSet::new(8, eve, 100.0, 0.0, 1.0).unwrap();
        SingleRunPipeline::new(params)
            .run_seeded([12u8; 32], &mut NoOpSink)
            .unwrap()
    }

    #[test]
    fn test_result_json_field_names() {
        let json = to_json(&sample(true)).unwrap();
        for field in [
            "aliceBits",
            "aliceBases",
            "bobBits",
            "bobBases",
            "eveBits",
            "eveBases",
            "eveInterceptions",
            "matchingBases",
            "finalKey",
            "errorRate",
            "transmissionEfficiency",
            "includeEve",
            "timestamp",
        ] {
            assert!(json.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
        let back: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_with_timestamp(back.timestamp));
    }

    fn sample_with_timestamp(ts: u64) -> SimulationResult {
        let mut r = sample(true);
        r.timestamp = ts;
        r
    }

    #[test]
    fn test_batch_json_field_names() {
        let analysis = BatchAnalysis::from_results(&[sample(false), sample(true)], 2);
        let json = to_json(&analysis).unwrap();
        for field in [
            "totalRuns",
            "averageKeyLength",
            "averageErrorRate",
            "averageEfficiency",
            "securityLevels",
            "errorRates",
            "keyLengths",
        ] {
            assert!(json.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
    }

    #[test]
    fn test_runs_csv() {
        let mut out = Vec::new();
        write_runs_csv(&[sample(false), sample(true)], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("run,num_qubits"));
        assert!(lines[1].starts_with("0,8,false,0,"));
        assert!(lines[2].starts_with("1,8,true,8,"));
    }

    #[test]
    fn test_qubits_csv_marks_missing_eve() {
        let mut out = Vec::new();
        write_qubits_csv(&sample(false), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 9);
        assert!(text.lines().nth(1).unwrap().contains(",-,-,"));
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_json(&sample(false), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: SimulationResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back.alice_bits.len(), 8);
    }

    #[test]
    fn test_write_runs_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        write_runs_csv_file(&[sample(false), sample(true), sample(true)], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_describe() {
        let text = describe(&sample(false));
        assert!(text.starts_with("alice="));
        assert!(text.contains("qber="));
    }
}
