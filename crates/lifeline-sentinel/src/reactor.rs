//! Reactor: what the crisis monitor does when it fires
//!
//! The monitor is handed a reactor at construction. The stock reactor is the
//! [`AutomationOrchestrator`](crate::orchestrator::AutomationOrchestrator)
//! itself, so a sustained crisis starts a remediation cycle.

use crate::error::SentinelError;
use crate::sampler::Reading;
use async_trait::async_trait;
use serde::Serialize;

/// Why the reactor was invoked
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerContext {
    /// The reading that completed the depressed run
    pub reading: Reading,

    /// Length of the run, at least the policy minimum
    pub consecutive_below: u32,

    pub threshold: f64,
}

/// Capability invoked once per qualifying depressed run
#[async_trait]
pub trait Reactor: Send + Sync {
    /// Short name recorded with the crisis event
    fn action(&self) -> &str {
        "reaction"
    }

    async fn react(&self, trigger: TriggerContext) -> Result<(), SentinelError>;
}
