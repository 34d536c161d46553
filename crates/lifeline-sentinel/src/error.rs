//! Error taxonomy for the Sentinel
//!
//! Only [`SentinelError`] crosses the public API boundary. Sampler and
//! invoker failures are recovered locally into skipped ticks and failed
//! tasks, so their error types never escape a tick or a cycle.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the Sentinel
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Policy or roster is unusable (fatal at startup)
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// A cycle is already in flight (benign, expected under load)
    #[error("cycle already active")]
    AdmissionRejected,

    /// A reactor could not complete its reaction
    #[error("Reaction failed: {0}")]
    Reaction(String),

    /// A component needed for the requested operation was not set up
    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl SentinelError {
    /// Benign conditions are expected outcomes, not faults
    pub fn is_benign(&self) -> bool {
        matches!(self, SentinelError::AdmissionRejected)
    }
}

/// Why a sampler call produced no reading
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Probe transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Probe returned HTTP {0}")]
    Status(u16),

    #[error("Probe response has no numeric value at '{0}'")]
    MissingValue(String),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Sampler unavailable: {0}")]
    Unavailable(String),
}

/// Why a remediation call failed
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("subsystem unavailable: {0}")]
    Unavailable(String),
}
