//! Quantum channel between Alice and Bob, with an optional intercept-resend
//! eavesdropper.
//!
//! The channel takes ownership of the prepared qubits and hands back the
//! sequence Bob will actually receive. When Eve intercepts a qubit she
//! measures it in a basis of her own choosing and resends a fresh qubit
//! encoding her result, so downstream stages only ever see her copy.

use crate::bb84_interface::{EveOutcome, Qubit};
use crate::bb84_preparer::{random_basis, random_bit};
use log::debug;
use rand::Rng;

/// Qubits after transit plus Eve's per-index record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutput {
    pub qubits: Vec<Qubit>,
    pub eve: Vec<EveOutcome>,
}

impl ChannelOutput {
    pub fn intercepted_count(&self) -> usize {
        self.eve.iter().filter(|e| e.intercepted).count()
    }
}

/// Attack-free transit: every qubit passes unchanged and every Eve entry is
/// the not-intercepted sentinel.
pub fn transmit(qubits: Vec<Qubit>) -> ChannelOutput {
    let eve = vec![EveOutcome::NOT_INTERCEPTED; qubits.len()];
    ChannelOutput { qubits, eve }
}

/// Intercept-resend attack. `interception_probability` is in [0, 1].
pub fn intercept_resend<R: Rng + ?Sized>(
    qubits: Vec<Qubit>,
    interception_probability: f64,
    rng: &mut R,
) -> ChannelOutput {
    let mut resent = Vec::with_capacity(qubits.len());
    let mut eve = Vec::with_capacity(qubits.len());

    for qubit in qubits {
        if !rng.gen_bool(interception_probability) {
            resent.push(qubit);
            eve.push(EveOutcome::NOT_INTERCEPTED);
            continue;
        }

        let eve_basis = random_basis(rng);
        let eve_bit = if eve_basis == qubit.basis {
            qubit.bit
        } else {
            // wrong basis: the outcome carries no information about the original bit
            random_bit(rng)
        };

        let mut forged = Qubit::prepare(eve_bit, eve_basis);
        forged.eve_intercepted = true;
        resent.push(forged);
        eve.push(EveOutcome::intercepted(eve_bit, eve_basis));
    }

    let output = ChannelOutput { qubits: resent, eve };
    debug!(
        "eve intercepted {}/{} qubits (p={:.2})",
        output.intercepted_count(),
        output.qubits.len(),
        interception_probability
    );
    output
}
