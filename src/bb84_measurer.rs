//! Bob's detector.
//!
//! Per qubit, in order:
//! 1. detector inefficiency: a missed detection yields a random bit and nothing else happens
//! 2. channel noise flips the carried bit with probability `noise_level`
//! 3. a basis mismatch with the arriving qubit yields a fresh random bit

use crate::bb84_interface::{Basis, Bit, Qubit};
use crate::bb84_params::ParameterSet;
use crate::bb84_preparer::{random_bases, random_bit};
use rand::Rng;

/// Bob's chosen bases and the bits he recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub bases: Vec<Basis>,
    pub bits: Vec<Bit>,
}

/// Detector model parameters. Both are probabilities in [0, 1], guaranteed by
/// building from a validated [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    noise_level: f64,
    efficiency: f64,
}

impl Detector {
    pub(crate) fn new(noise_level: f64, efficiency: f64) -> Self {
        Self {
            noise_level,
            efficiency,
        }
    }

    pub fn from_params(params: &ParameterSet) -> Self {
        Self::new(params.noise_level(), params.detector_efficiency())
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// An ideal detector: no noise, no lost detections.
    pub fn ideal() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Measures one qubit in `bob_basis`.
    pub fn measure_one<R: Rng + ?Sized>(&self, qubit: &Qubit, bob_basis: Basis, rng: &mut R) -> Bit {
        if !rng.gen_bool(self.efficiency) {
            return random_bit(rng);
        }

        let mut bit = qubit.bit;
        if rng.gen_bool(self.noise_level) {
            bit ^= 1;
        }

        if bob_basis == qubit.basis {
            bit
        } else {
            random_bit(rng)
        }
    }

    /// Measures every qubit in the corresponding pre-drawn basis.
    pub fn measure_all<R: Rng + ?Sized>(&self, qubits: &[Qubit], bases: Vec<Basis>, rng: &mut R) -> Measurement {
        let bits = qubits
            .iter()
            .zip(bases.iter())
            .map(|(q, &b)| self.measure_one(q, b, rng))
            .collect();
        Measurement { bases, bits }
    }
}

/// Draws Bob's bases independently of everything upstream, then measures.
pub fn measure<R: Rng + ?Sized>(qubits: &[Qubit], detector: &Detector, rng: &mut R) -> Measurement {
    let bases = random_bases(qubits.len(), rng);
    detector.measure_all(qubits, bases, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ideal_detector_matching_basis_is_exact() {
        let mut rng = StdRng::from_seed([11u8; 32]);
        let detector = Detector::ideal();
        for bit in [0u8, 1] {
            for basis in [Basis::Z, Basis::X] {
                let q = Qubit::prepare(bit, basis);
                for _ in 0..50 {
                    assert_eq!(detector.measure_one(&q, basis, &mut rng), bit);
                }
            }
        }
    }

    #[test]
    fn test_mismatched_basis_is_random() {
        let mut rng = StdRng::from_seed([12u8; 32]);
        let detector = Detector::ideal();
        let q = Qubit::prepare(1, Basis::Z);
        let ones = (0..4000)
            .filter(|_| detector.measure_one(&q, Basis::X, &mut rng) == 1)
            .count();
        let frac = ones as f64 / 4000.0;
        assert!((frac - 0.5).abs() < 0.04, "mismatch bias {}", frac);
    }

    #[test]
    fn test_full_noise_always_flips_on_matching_basis() {
        let mut rng = StdRng::from_seed([13u8; 32]);
        let detector = Detector::new(1.0, 1.0);
        let q = Qubit::prepare(0, Basis::X);
        for _ in 0..50 {
            assert_eq!(detector.measure_one(&q, Basis::X, &mut rng), 1);
        }
    }

    #[test]
    fn test_noise_rate_on_matching_basis() {
        let mut rng = StdRng::from_seed([14u8; 32]);
        let detector = Detector::new(0.1, 1.0);
        let q = Qubit::prepare(0, Basis::Z);
        let flips = (0..5000)
            .filter(|_| detector.measure_one(&q, Basis::Z, &mut rng) == 1)
            .count();
        let frac = flips as f64 / 5000.0;
        assert!((frac - 0.1).abs() < 0.02, "noise rate {}", frac);
    }

    #[test]
    fn test_dead_detector_is_random() {
        let mut rng = StdRng::from_seed([15u8; 32]);
        let detector = Detector::new(0.0, 0.0);
        let q = Qubit::prepare(1, Basis::Z);
        let ones = (0..4000)
            .filter(|_| detector.measure_one(&q, Basis::Z, &mut rng) == 1)
            .count();
        let frac = ones as f64 / 4000.0;
        assert!((frac - 0.5).abs() < 0.04, "dead detector bias {}", frac);
    }

    #[test]
    fn test_measure_lengths() {
        let mut rng = StdRng::from_seed([16u8; 32]);
        let qubits = vec![Qubit::prepare(0, Basis::Z); 9];
        let m = measure(&qubits, &Detector::new(0.01, 0.95), &mut rng);
        assert_eq!(m.bases.len(), 9);
        assert_eq!(m.bits.len(), 9);
        assert!(m.bits.iter().all(|&b| b <= 1));
    }

    #[test]
    fn test_detector_from_params() {
        let params = ParameterSet::builder()
            .noise_level(0.2)
            .detector_efficiency(0.7)
            .build()
            .unwrap();
        let detector = Detector::from_params(&params);
        assert_eq!(detector.noise_level(), 0.2);
        assert_eq!(detector.efficiency(), 0.7);
        assert_eq!(Detector::from_params(&ParameterSet::default()), Detector::new(0.01, 0.95));
    }
}
