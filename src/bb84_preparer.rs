//! Alice's state preparation.

use crate::bb84_interface::{Basis, Bit, Qubit};
use rand::Rng;

/// Alice's private choices plus the photons she sends.
///
/// `bits` and `bases` are kept separately from `qubits` because the channel
/// may overwrite the qubits in transit, while reconciliation must compare
/// against what Alice actually prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStates {
    pub bits: Vec<Bit>,
    pub bases: Vec<Basis>,
    pub qubits: Vec<Qubit>,
}

impl PreparedStates {
    pub fn polarization_angles(&self) -> Vec<u16> {
        self.qubits.iter().map(|q| q.polarization_angle).collect()
    }
}

/// Fair coin flip.
pub(crate) fn random_bit<R: Rng + ?Sized>(rng: &mut R) -> Bit {
    rng.gen_bool(0.5) as Bit
}

/// Uniform choice between Z and X.
pub(crate) fn random_basis<R: Rng + ?Sized>(rng: &mut R) -> Basis {
    if rng.gen_bool(0.5) {
        Basis::X
    } else {
        Basis::Z
    }
}

pub(crate) fn random_bases<R: Rng + ?Sized>(num_qubits: usize, rng: &mut R) -> Vec<Basis> {
    (0..num_qubits).map(|_| random_basis(rng)).collect()
}

/// Draws `num_qubits` independent bits, then `num_qubits` independent bases,
/// and encodes each pair as a polarized qubit.
pub fn prepare<R: Rng + ?Sized>(num_qubits: usize, rng: &mut R) -> PreparedStates {
    let bits: Vec<Bit> = (0..num_qubits).map(|_| random_bit(rng)).collect();
    let bases = random_bases(num_qubits, rng);

    let qubits = bits
        .iter()
        .zip(bases.iter())
        .map(|(&bit, &basis)| Qubit::prepare(bit, basis))
        .collect();

    PreparedStates {
        bits,
        bases,
        qubits,
    }
}
