//! Client for an optional remote simulation service.
//!
//! Contract:
//! - `GET  {base}/health`   any 2xx means available
//! - `POST {base}/simulate` body is a `ParameterSet`, response a `SimulationResult`
//!
//! Every failure comes back as a [`BackendError`]; callers are expected to
//! fall back to local simulation rather than surface it.

use std::time::Duration;

use serde::Deserialize;

use crate::bb84_interface::{BackendError, Basis, Bit, SimulationResult, Timestamp};
use crate::bb84_params::ParameterSet;
use crate::bb84_pipeline::now_millis;
use crate::bb84_reconciler::{reconcile, Reconciliation};
use crate::bb84_security::classify;

// Rates are compared after a JSON round trip.
const RATE_TOLERANCE: f64 = 1e-9;

/// Wire form of a remote result. Only the core record fields are required;
/// derived fields the service leaves out are recomputed locally.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteResult {
    alice_bits: Vec<Bit>,
    alice_bases: Vec<Basis>,
    bob_bits: Vec<Bit>,
    bob_bases: Vec<Basis>,
    eve_bits: Vec<Option<Bit>>,
    eve_bases: Vec<Option<Basis>>,
    eve_interceptions: Vec<bool>,
    matching_bases: Vec<bool>,
    final_key: Vec<Bit>,
    error_rate: f64,
    transmission_efficiency: f64,
    include_eve: bool,
    #[serde(default)]
    quantum_fidelity: Option<f64>,
    #[serde(default)]
    timestamp: Option<Timestamp>,
}

impl RemoteResult {
    /// Converts to a local result after checking it against `num_qubits` and
    /// against a local re-reconciliation of the reported bits and bases.
    /// The security assessment is always recomputed locally.
    fn into_result(self, num_qubits: usize) -> Result<SimulationResult, BackendError> {
        let recon = reconcile(&self.alice_bits, &self.alice_bases, &self.bob_bits, &self.bob_bases);
        let result = SimulationResult {
            security_assessment: classify(recon.error_rate, self.include_eve),
            alice_bits: self.alice_bits,
            alice_bases: self.alice_bases,
            bob_bits: self.bob_bits,
            bob_bases: self.bob_bases,
            eve_bits: self.eve_bits,
            eve_bases: self.eve_bases,
            eve_interceptions: self.eve_interceptions,
            matching_bases: self.matching_bases,
            final_key: self.final_key,
            error_rate: self.error_rate,
            transmission_efficiency: self.transmission_efficiency,
            quantum_fidelity: self.quantum_fidelity.unwrap_or(recon.quantum_fidelity),
            include_eve: self.include_eve,
            seed_used: None,
            timestamp: self.timestamp.unwrap_or_else(now_millis),
        };
        result.check_shape(num_qubits).map_err(BackendError::InvalidShape)?;
        check_consistency(&result, &recon).map_err(BackendError::InvalidShape)?;
        Ok(result)
    }
}

fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATE_TOLERANCE
}

/// Derived fields must agree with what the bits and bases imply.
fn check_consistency(result: &SimulationResult, recon: &Reconciliation) -> Result<(), String> {
    if result.matching_bases != recon.matching_bases {
        return Err("matchingBases disagrees with the reported bases".to_string());
    }
    if result.final_key != recon.final_key {
        return Err(format!(
            "finalKey has {} bits, the reported bits give {}",
            result.final_key.len(),
            recon.final_key.len()
        ));
    }
    if !same_rate(result.error_rate, recon.error_rate) {
        return Err(format!(
            "errorRate = {} but the reported bits give {}",
            result.error_rate, recon.error_rate
        ));
    }
    if !same_rate(result.transmission_efficiency, recon.transmission_efficiency) {
        return Err(format!(
            "transmissionEfficiency = {} but the reported bases give {}",
            result.transmission_efficiency, recon.transmission_efficiency
        ));
    }
    if !same_rate(result.quantum_fidelity, recon.quantum_fidelity) {
        return Err(format!(
            "quantumFidelity = {} but the reported bits give {}",
            result.quantum_fidelity, recon.quantum_fidelity
        ));
    }
    if !result.include_eve && result.eve_interceptions.iter().any(|&x| x) {
        return Err("eveInterceptions set although includeEve is false".to_string());
    }
    let eve_ok = result
        .eve_interceptions
        .iter()
        .zip(result.eve_bits.iter().zip(result.eve_bases.iter()))
        .all(|(&hit, (bit, basis))| hit == bit.is_some() && hit == basis.is_some());
    if !eve_ok {
        return Err("eveBits/eveBases disagree with eveInterceptions".to_string());
    }
    Ok(())
}

fn map_error(path: &str, e: ureq::Error) -> BackendError {
    match e {
        ureq::Error::Status(code, _) => BackendError::Status(code),
        other => BackendError::Transport(format!("{} failed: {}", path, other)),
    }
}

/// Blocking HTTP client for the remote service
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Liveness probe.
    pub fn health(&self) -> Result<(), BackendError> {
        let resp = self
            .agent
            .get(&self.url("/health"))
            .call()
            .map_err(|e| map_error("GET /health", e))?;
        match resp.status() {
            200..=299 => Ok(()),
            code => Err(BackendError::Status(code)),
        }
    }

    /// Asks the service for one run and checks the answer against `params`.
    pub fn simulate(&self, params: &ParameterSet) -> Result<SimulationResult, BackendError> {
        let resp = self
            .agent
            .post(&self.url("/simulate"))
            .set("Content-Type", "application/json")
            .send_json(params)
            .map_err(|e| map_error("POST /simulate", e))?;

        let remote: RemoteResult = resp
            .into_json()
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        if remote.include_eve != params.include_eve() {
            return Err(BackendError::InvalidShape(format!(
                "includeEve is {}, requested {}",
                remote.include_eve,
                params.include_eve()
            )));
        }

        remote.into_result(params.num_qubits())
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Canned-response HTTP fixture for exercising the client.

    use std::thread::JoinHandle;

    use tiny_http::{Header, Response, Server};

    /// Answers one request per entry of `responses`, in order, then shuts down.
    /// Returns the base URL and a handle yielding `"METHOD /path"` for each request seen.
    pub fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let request = match server.recv() {
                    Ok(request) => request,
                    Err(_) => break,
                };
                seen.push(format!("{} {}", request.method(), request.url()));
                let mut resp = Response::from_string(body).with_status_code(status);
                let _ = Header::from_bytes("Content-Type", "application/json").map(|h| resp.add_header(h));
                let _ = request.respond(resp);
            }
            seen
        });
        (format!("http://{}", addr), handle)
    }
}
