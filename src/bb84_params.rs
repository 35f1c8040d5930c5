//! Simulation Parameters
//!
//! Validated, immutable configuration for one BB84 run. Every path that
//! produces a `ParameterSet` (constructor, builder, serde) goes through the
//! same range checks, so stages can read fields without re-validating.

use crate::bb84_interface::ConfigurationError;
use serde::{Deserialize, Serialize};

pub const MIN_QUBITS: usize = 4;
pub const MAX_QUBITS: usize = 32;

pub const DEFAULT_NUM_QUBITS: usize = 20;
pub const DEFAULT_EVE_INTERCEPTION_RATE: f64 = 30.0;
pub const DEFAULT_NOISE_LEVEL: f64 = 0.01;
pub const DEFAULT_DETECTOR_EFFICIENCY: f64 = 0.95;

/// Validated parameters shared read-only by every stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawParameters")]
pub struct ParameterSet {
    num_qubits: usize,
    include_eve: bool,
    eve_interception_rate: f64,
    noise_level: f64,
    detector_efficiency: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            num_qubits: DEFAULT_NUM_QUBITS,
            include_eve: false,
            eve_interception_rate: DEFAULT_EVE_INTERCEPTION_RATE,
            noise_level: DEFAULT_NOISE_LEVEL,
            detector_efficiency: DEFAULT_DETECTOR_EFFICIENCY,
        }
    }
}

impl ParameterSet {
    pub fn new(
        num_qubits: usize,
        include_eve: bool,
        eve_interception_rate: f64,
        noise_level: f64,
        detector_efficiency: f64,
    ) -> Result<Self, ConfigurationError> {
        check_range("numQubits", num_qubits as f64, MIN_QUBITS as f64, MAX_QUBITS as f64)?;
        check_range("eveInterceptionRate", eve_interception_rate, 0.0, 100.0)?;
        check_range("noiseLevel", noise_level, 0.0, 1.0)?;
        check_range("detectorEfficiency", detector_efficiency, 0.0, 1.0)?;

        Ok(Self {
            num_qubits,
            include_eve,
            eve_interception_rate,
            noise_level,
            detector_efficiency,
        })
    }

    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn include_eve(&self) -> bool {
        self.include_eve
    }

    /// Interception rate as a percentage in [0, 100].
    pub fn eve_interception_rate(&self) -> f64 {
        self.eve_interception_rate
    }

    /// Interception rate as a probability in [0, 1].
    pub fn eve_interception_probability(&self) -> f64 {
        self.eve_interception_rate / 100.0
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn detector_efficiency(&self) -> f64 {
        self.detector_efficiency
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigurationError> {
    // NaN fails both comparisons, so it is rejected here as well
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigurationError {
            field,
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Field-by-field construction for control surfaces that set one value at a
/// time. Nothing is checked until [`ParameterSetBuilder::build`].
#[derive(Debug, Clone)]
pub struct ParameterSetBuilder {
    num_qubits: usize,
    include_eve: bool,
    eve_interception_rate: f64,
    noise_level: f64,
    detector_efficiency: f64,
}

impl Default for ParameterSetBuilder {
    fn default() -> Self {
        let defaults = ParameterSet::default();
        Self {
            num_qubits: defaults.num_qubits,
            include_eve: defaults.include_eve,
            eve_interception_rate: defaults.eve_interception_rate,
            noise_level: defaults.noise_level,
            detector_efficiency: defaults.detector_efficiency,
        }
    }
}

impl ParameterSetBuilder {
    pub fn num_qubits(mut self, n: usize) -> Self {
        self.num_qubits = n;
        self
    }

    pub fn include_eve(mut self, include: bool) -> Self {
        self.include_eve = include;
        self
    }

    pub fn eve_interception_rate(mut self, percent: f64) -> Self {
        self.eve_interception_rate = percent;
        self
    }

    pub fn noise_level(mut self, p: f64) -> Self {
        self.noise_level = p;
        self
    }

    pub fn detector_efficiency(mut self, p: f64) -> Self {
        self.detector_efficiency = p;
        self
    }

    pub fn build(self) -> Result<ParameterSet, ConfigurationError> {
        ParameterSet::new(
            self.num_qubits,
            self.include_eve,
            self.eve_interception_rate,
            self.noise_level,
            self.detector_efficiency,
        )
    }
}

// ============================================================================
// Serde
// ============================================================================

/// Unvalidated wire/file form. Missing fields take the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawParameters {
    num_qubits: usize,
    include_eve: bool,
    eve_interception_rate: f64,
    noise_level: f64,
    detector_efficiency: f64,
}

impl Default for RawParameters {
    fn default() -> Self {
        let d = ParameterSet::default();
        Self {
            num_qubits: d.num_qubits,
            include_eve: d.include_eve,
            eve_interception_rate: d.eve_interception_rate,
            noise_level: d.noise_level,
            detector_efficiency: d.detector_efficiency,
        }
    }
}

impl TryFrom<RawParameters> for ParameterSet {
    type Error = ConfigurationError;

    fn try_from(raw: RawParameters) -> Result<Self, Self::Error> {
        ParameterSet::new(
            raw.num_qubits,
            raw.include_eve,
            raw.eve_interception_rate,
            raw.noise_level,
            raw.detector_efficiency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let p = ParameterSet::default();
        assert_eq!(p.num_qubits(), 20);
        assert!(!p.include_eve());
        assert_eq!(p.eve_interception_rate(), 30.0);
        assert_eq!(p.noise_level(), 0.01);
        assert_eq!(p.detector_efficiency(), 0.95);
        assert_eq!(ParameterSet::builder().build().unwrap(), p);
    }

    #[test]
    fn test_num_qubits_bounds() {
        assert!(ParameterSet::new(4, false, 0.0, 0.0, 1.0).is_ok());
        assert!(ParameterSet::new(32, false, 0.0, 0.0, 1.0).is_ok());

        let err = ParameterSet::new(3, false, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(err.field, "numQubits");
        assert_eq!(err.min, 4.0);
        assert_eq!(err.max, 32.0);

        let err = ParameterSet::new(33, false, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(err.field, "numQubits");
    }

    #[test]
    fn test_percentage_and_probability_bounds() {
        let err = ParameterSet::builder().eve_interception_rate(100.5).build().unwrap_err();
        assert_eq!(err.field, "eveInterceptionRate");
        let err = ParameterSet::builder().eve_interception_rate(-1.0).build().unwrap_err();
        assert_eq!(err.field, "eveInterceptionRate");

        let err = ParameterSet::builder().noise_level(1.5).build().unwrap_err();
        assert_eq!(err.field, "noiseLevel");
        let err = ParameterSet::builder().detector_efficiency(-0.1).build().unwrap_err();
        assert_eq!(err.field, "detectorEfficiency");
    }

    #[test]
    fn test_nan_rejected() {
        let err = ParameterSet::builder().noise_level(f64::NAN).build().unwrap_err();
        assert_eq!(err.field, "noiseLevel");
    }

    #[test]
    fn test_interception_probability() {
        let p = ParameterSet::builder().eve_interception_rate(25.0).build().unwrap();
        assert_eq!(p.eve_interception_probability(), 0.25);
    }

    #[test]
    fn test_serde_camel_case_roundtrip() {
        let p = ParameterSet::new(8, true, 50.0, 0.0, 1.0).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"numQubits\":8"));
        assert!(json.contains("\"includeEve\":true"));
        assert!(json.contains("\"eveInterceptionRate\":50.0"));
        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_deserialize_validates_and_fills_defaults() {
        let p: ParameterSet = serde_json::from_str(r#"{"numQubits": 12}"#).unwrap();
        assert_eq!(p.num_qubits(), 12);
        assert_eq!(p.detector_efficiency(), DEFAULT_DETECTOR_EFFICIENCY);

        let bad: Result<ParameterSet, _> = serde_json::from_str(r#"{"numQubits": 64}"#);
        assert!(bad.is_err());

        let yaml: ParameterSet =
            serde_yaml::from_str("numQubits: 16\nincludeEve: true\neveInterceptionRate: 100\n")
                .unwrap();
        assert!(yaml.include_eve());
        assert_eq!(yaml.eve_interception_rate(), 100.0);
    }
}
