// A single classical bit as carried by a simulated qubit (always 0 or 1).
pub type Bit = u8;

// 32-byte seed for StdRng, the same width used for every run and batch.
pub type Seed = [u8; 32];

// milliseconds since the unix epoch
pub type Timestamp = u64;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Qubit Model
// ============================================================================

/// Measurement/preparation basis.
///
/// `Z` is the rectilinear basis (0° / 90°), `X` the diagonal basis (45° / 135°).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    Z,
    X,
}

impl Basis {
    /// Polarization angle in degrees for a bit prepared in this basis.
    pub fn polarization_angle(self, bit: Bit) -> u16 {
        match (self, bit) {
            (Basis::Z, 0) => 0,
            (Basis::Z, _) => 90,
            (Basis::X, 0) => 45,
            (Basis::X, _) => 135,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Basis::Z => "Z",
            Basis::X => "X",
        }
    }
}

/// One simulated photon in transit from Alice to Bob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qubit {
    pub bit: Bit,
    pub basis: Basis,
    pub polarization_angle: u16,
    pub eve_intercepted: bool,
}

impl Qubit {
    pub fn prepare(bit: Bit, basis: Basis) -> Self {
        Self {
            bit,
            basis,
            polarization_angle: basis.polarization_angle(bit),
            eve_intercepted: false,
        }
    }
}

/// What Eve learned about one qubit. Every index has an entry; qubits she let
/// through carry [`EveOutcome::NOT_INTERCEPTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EveOutcome {
    pub intercepted: bool,
    pub measured_bit: Option<Bit>,
    pub measured_basis: Option<Basis>,
}

impl EveOutcome {
    pub const NOT_INTERCEPTED: EveOutcome = EveOutcome {
        intercepted: false,
        measured_bit: None,
        measured_basis: None,
    };

    pub fn intercepted(bit: Bit, basis: Basis) -> Self {
        Self {
            intercepted: true,
            measured_bit: Some(bit),
            measured_basis: Some(basis),
        }
    }
}

// ============================================================================
// Security Classification
// ============================================================================

/// Discrete channel security level derived from the observed QBER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityLevel {
    High,
    Medium,
    Low,
}

impl SecurityLevel {
    pub fn label(self) -> &'static str {
        match self {
            SecurityLevel::High => "HIGH",
            SecurityLevel::Medium => "MEDIUM",
            SecurityLevel::Low => "LOW",
        }
    }
}

/// Output of the security classifier for a single error rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAssessment {
    pub level: SecurityLevel,
    pub recommendations: Vec<String>,
    /// Heuristic `min(2 * errorRate, 1)`, only present when Eve was simulated
    /// and the error rate exceeded the medium threshold.
    pub eavesdropping_probability: Option<f64>,
}

// ============================================================================
// Run Output
// ============================================================================

/// Immutable record of one BB84 run. Field names serialize exactly as the
/// presentation/export layer expects (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub alice_bits: Vec<Bit>,
    pub alice_bases: Vec<Basis>,
    pub bob_bits: Vec<Bit>,
    pub bob_bases: Vec<Basis>,
    pub eve_bits: Vec<Option<Bit>>,
    pub eve_bases: Vec<Option<Basis>>,
    pub eve_interceptions: Vec<bool>,
    pub matching_bases: Vec<bool>,
    pub final_key: Vec<Bit>,
    pub error_rate: f64,
    pub transmission_efficiency: f64,
    pub quantum_fidelity: f64,
    pub include_eve: bool,
    pub security_assessment: SecurityAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_used: Option<String>,
    pub timestamp: Timestamp,
}

impl SimulationResult {
    pub fn num_qubits(&self) -> usize {
        self.alice_bits.len()
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_assessment.level
    }

    /// Checks the structural invariants every result must satisfy.
    ///
    /// Used on locally produced results before they are handed out and on
    /// anything received from a remote backend.
    pub fn check_shape(&self, num_qubits: usize) -> Result<(), String> {
        let lengths = [
            ("aliceBits", self.alice_bits.len()),
            ("aliceBases", self.alice_bases.len()),
            ("bobBits", self.bob_bits.len()),
            ("bobBases", self.bob_bases.len()),
            ("eveBits", self.eve_bits.len()),
            ("eveBases", self.eve_bases.len()),
            ("eveInterceptions", self.eve_interceptions.len()),
            ("matchingBases", self.matching_bases.len()),
        ];
        for (name, len) in lengths {
            if len != num_qubits {
                return Err(format!("{} has {} entries, expected {}", name, len, num_qubits));
            }
        }
        if self.final_key.len() > num_qubits {
            return Err(format!("finalKey longer than {} qubits", num_qubits));
        }
        for (name, value) in [
            ("errorRate", self.error_rate),
            ("transmissionEfficiency", self.transmission_efficiency),
            ("quantumFidelity", self.quantum_fidelity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} = {} outside [0, 1]", name, value));
            }
        }
        let bits_ok = self
            .alice_bits
            .iter()
            .chain(self.bob_bits.iter())
            .chain(self.final_key.iter())
            .all(|&b| b <= 1);
        if !bits_ok {
            return Err("bit value outside {0, 1}".to_string());
        }
        let matches_ok = self
            .matching_bases
            .iter()
            .zip(self.alice_bases.iter().zip(self.bob_bases.iter()))
            .all(|(&m, (a, b))| m == (a == b));
        if !matches_ok {
            return Err("matchingBases disagrees with aliceBases/bobBases".to_string());
        }
        Ok(())
    }

    /// Print a summary of the run
    pub fn print_summary(&self) {
        let bits = |v: &[Bit]| v.iter().map(|b| b.to_string()).collect::<String>();
        let bases = |v: &[Basis]| v.iter().map(|b| b.label()).collect::<String>();

        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        BB84 Simulation Result                         ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Transmission:");
        println!("  Qubits: {}", self.num_qubits());
        println!("  Eavesdropper: {}", if self.include_eve { "present" } else { "absent" });
        if let Some(ref seed) = self.seed_used {
            println!("  Seed: {}", seed);
        }
        println!("  Alice bits:  {}", bits(&self.alice_bits));
        println!("  Alice bases: {}", bases(&self.alice_bases));
        println!("  Bob bases:   {}", bases(&self.bob_bases));
        println!("  Bob bits:    {}", bits(&self.bob_bits));
        if self.include_eve {
            let intercepted = self.eve_interceptions.iter().filter(|&&i| i).count();
            println!("  Intercepted: {}/{}", intercepted, self.num_qubits());
        }
        println!();

        println!("Reconciliation:");
        println!(
            "  Matching bases: {}",
            self.matching_bases.iter().filter(|&&m| m).count()
        );
        println!("  Final key ({} bits): {}", self.final_key.len(), bits(&self.final_key));
        println!("  Error rate: {:.2}%", self.error_rate * 100.0);
        println!("  Efficiency: {:.2}%", self.transmission_efficiency * 100.0);
        println!("  Fidelity: {:.3}", self.quantum_fidelity);
        println!();

        println!("Security: {}", self.security_assessment.level.label());
        if let Some(p) = self.security_assessment.eavesdropping_probability {
            println!("  Eavesdropping detection estimate: {:.0}%", p * 100.0);
        }
        for rec in &self.security_assessment.recommendations {
            println!("  - {}", rec);
        }
        println!();
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A parameter outside its valid range. Always fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field} = {value} is out of range (valid: {min}..={max})")]
pub struct ConfigurationError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Simulation cancelled before stage '{stage}'")]
    Cancelled { stage: &'static str },

    #[error("Simulation produced an inconsistent result: {0}")]
    Computation(String),
}

/// Failures talking to a remote simulation backend. These never leave the
/// engine: every variant triggers the local fallback.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {0}")]
    Status(u16),

    #[error("Backend response could not be parsed: {0}")]
    Malformed(String),

    #[error("Backend result has the wrong shape: {0}")]
    InvalidShape(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Hex rendering used for seeds in results, logs and scenario files.
pub fn seed_to_hex(seed: &Seed) -> String {
    let mut out = String::with_capacity(2 + seed.len() * 2);
    out.push_str("0x");
    for b in seed {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Parses `0x`-prefixed (or bare) hex into a seed. Short input is zero-padded.
pub fn parse_seed_hex(hex: &str) -> Result<Seed, String> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.len() > 64 {
        return Err(format!("seed has {} hex digits, at most 64 allowed", hex.len()));
    }
    let mut seed = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let byte_str = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
        seed[i] = u8::from_str_radix(byte_str, 16)
            .map_err(|e| format!("invalid hex seed '{}': {}", byte_str, e))?;
    }
    Ok(seed)
}
