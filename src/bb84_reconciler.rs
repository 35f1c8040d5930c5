//! Public basis comparison and key extraction.
//!
//! Note on the key rule: an index enters the final key only when the bases
//! match AND Alice's and Bob's bits agree, while the error rate is taken from
//! the matching-basis indices where they disagree. The retained key is
//! therefore error-free by construction and the error estimate comes from
//! exactly the bits that were dropped. A real deployment keeps every
//! matching-basis bit and estimates QBER on a disclosed sample instead.

use crate::bb84_interface::{Basis, Bit};

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub matching_bases: Vec<bool>,
    pub final_key: Vec<Bit>,
    /// Number of indices where the bases matched.
    pub sifted: usize,
    /// Matching-basis indices where the bits disagreed.
    pub errors: usize,
    pub error_rate: f64,
    pub transmission_efficiency: f64,
    pub quantum_fidelity: f64,
}

/// Sequences of unequal length are compared up to the shortest one.
pub fn reconcile(
    alice_bits: &[Bit],
    alice_bases: &[Basis],
    bob_bits: &[Bit],
    bob_bases: &[Basis],
) -> Reconciliation {
    let mut matching_bases = Vec::with_capacity(alice_bases.len());
    let mut final_key = Vec::new();
    let mut sifted = 0;
    let mut errors = 0;

    let positions = alice_bits
        .iter()
        .zip(alice_bases.iter())
        .zip(bob_bits.iter().zip(bob_bases.iter()));
    for ((&alice_bit, alice_basis), (&bob_bit, bob_basis)) in positions {
        let matched = alice_basis == bob_basis;
        matching_bases.push(matched);
        if !matched {
            continue;
        }
        sifted += 1;
        if alice_bit == bob_bit {
            final_key.push(alice_bit);
        } else {
            errors += 1;
        }
    }

    let (error_rate, quantum_fidelity) = if sifted > 0 {
        (
            errors as f64 / sifted as f64,
            (sifted - errors) as f64 / sifted as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let transmission_efficiency = if matching_bases.is_empty() {
        0.0
    } else {
        sifted as f64 / matching_bases.len() as f64
    };

    Reconciliation {
        matching_bases,
        final_key,
        sifted,
        errors,
        error_rate,
        transmission_efficiency,
        quantum_fidelity,
    }
}
