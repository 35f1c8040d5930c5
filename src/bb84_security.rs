//! QBER-based security classification.

use crate::bb84_interface::{SecurityAssessment, SecurityLevel};

/// Above this QBER the key is considered compromised.
pub const LOW_SECURITY_THRESHOLD: f64 = 0.11;
/// Above this QBER the channel needs attention.
pub const MEDIUM_SECURITY_THRESHOLD: f64 = 0.05;

pub fn security_level(error_rate: f64) -> SecurityLevel {
    if error_rate > LOW_SECURITY_THRESHOLD {
        SecurityLevel::Low
    } else if error_rate > MEDIUM_SECURITY_THRESHOLD {
        SecurityLevel::Medium
    } else {
        SecurityLevel::High
    }
}

pub fn recommendations(level: SecurityLevel) -> Vec<String> {
    let items: &[&str] = match level {
        SecurityLevel::High => &[
            "Key is safe to use",
            "Continue routine QBER monitoring",
        ],
        SecurityLevel::Medium => &[
            "Apply error correction and privacy amplification before use",
            "Increase the sample size used for error estimation",
            "Inspect the channel for noise sources",
        ],
        SecurityLevel::Low => &[
            "Discard key and restart channel",
            "Investigate possible eavesdropping on the quantum channel",
            "Switch to a backup channel if the error rate persists",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

/// Classifies one run. Pure: the same inputs always give the same output.
pub fn classify(error_rate: f64, include_eve: bool) -> SecurityAssessment {
    let level = security_level(error_rate);
    let eavesdropping_probability = if include_eve && error_rate > MEDIUM_SECURITY_THRESHOLD {
        Some((2.0 * error_rate).min(1.0))
    } else {
        None
    };

    SecurityAssessment {
        level,
        recommendations: recommendations(level),
        eavesdropping_probability,
    }
}
