//! Sentinel Policy Engine
//!
//! Defines the thresholds and timing rules for the monitor and the
//! orchestrator.

use crate::error::SentinelError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Crisis monitor policy
///
/// Configures the hysteresis rule and how often the signal is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorPolicy {
    /// Readings at or below this value count as depressed
    ///
    /// **Default:** 0.0
    pub threshold: f64,

    /// Consecutive depressed readings required before triggering
    ///
    /// A single noisy reading never triggers, so this must be at least 2.
    ///
    /// **Default:** 2
    pub min_consecutive_below: u32,

    /// Sampling interval in seconds
    ///
    /// **Default:** 300 (5 minutes)
    pub sample_interval_s: u64,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            min_consecutive_below: 2,
            sample_interval_s: 300,
        }
    }
}

impl MonitorPolicy {
    /// Create a new policy with a custom threshold
    ///
    /// Other parameters will use defaults.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_s)
    }

    /// Validate the policy configuration
    pub fn validate(&self) -> Result<(), SentinelError> {
        if !self.threshold.is_finite() {
            return Err(SentinelError::InvalidPolicy(
                "threshold must be a finite number".to_string(),
            ));
        }

        if self.min_consecutive_below < 2 {
            return Err(SentinelError::InvalidPolicy(
                "min_consecutive_below must be at least 2".to_string(),
            ));
        }

        if self.sample_interval_s == 0 {
            return Err(SentinelError::InvalidPolicy(
                "sample_interval_s must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Orchestrator policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorPolicy {
    /// Upper bound for a single remediation call, in milliseconds
    ///
    /// Expiry is recorded as a task failure.
    ///
    /// **Default:** 5000
    pub call_timeout_ms: u64,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
        }
    }
}

impl OrchestratorPolicy {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.call_timeout_ms == 0 {
            return Err(SentinelError::InvalidPolicy(
                "call_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
