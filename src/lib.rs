/*!
 * Lifeline - crisis monitoring and automated remediation
 *
 * Watches one business signal through an HTTP probe. When the signal stays
 * at or below a threshold for enough consecutive samples, every collaborator
 * subsystem is invoked in parallel and their reported metrics are summed.
 * A scheduler also runs the same cycle on a fixed period.
 *
 * The engine lives in `lifeline-sentinel`; this crate adds configuration,
 * logging, service wiring and the CLI.
 */

pub mod cli_style;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;

// Re-export commonly used types
pub use config::{LifelineConfig, LogLevel};
pub use error::{LifelineError, Result};
pub use lifeline_sentinel::{CycleResult, Reading, SentinelError, SubsystemEndpoint};
pub use service::{Lifeline, LifelineStatus, SchedulerSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
