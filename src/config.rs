/*!
 * Configuration types for Lifeline
 */

use crate::error::{LifelineError, Result};
use lifeline_sentinel::{MonitorPolicy, OrchestratorPolicy, SubsystemEndpoint};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration, loaded from `lifeline.toml`
///
/// Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifelineConfig {
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub journal: JournalConfig,
}

impl Default for LifelineConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            monitor: MonitorConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            scheduler: SchedulerConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

/// Crisis monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Readings at or below this value are depressed
    #[serde(default)]
    pub threshold: f64,

    /// Consecutive depressed readings before a trigger (at least 2)
    #[serde(default = "default_min_consecutive_below")]
    pub min_consecutive_below: u32,

    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Endpoint returning the monitored signal as JSON (None = no monitoring)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,

    /// JSON pointer to the numeric value in the probe response
    #[serde(default = "default_probe_value_pointer")]
    pub probe_value_pointer: String,

    #[serde(default = "default_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            min_consecutive_below: default_min_consecutive_below(),
            sample_interval_secs: default_sample_interval_secs(),
            probe_url: None,
            probe_value_pointer: default_probe_value_pointer(),
            probe_timeout_ms: default_timeout_ms(),
        }
    }
}

/// Remediation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base URL the subsystem paths are joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each subsystem call
    #[serde(default = "default_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Name of the environment variable holding the bearer token
    ///
    /// When set, the variable must exist at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_env: Option<String>,

    #[serde(default = "default_subsystems")]
    pub subsystems: Vec<SubsystemEndpoint>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            call_timeout_ms: default_timeout_ms(),
            auth_token_env: None,
            subsystems: default_subsystems(),
        }
    }
}

/// Periodic trigger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    #[serde(default = "default_status_poll_interval_secs")]
    pub status_poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            status_poll_interval_secs: default_status_poll_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs)
    }
}

/// Event journal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Events kept in memory
    #[serde(default = "default_journal_capacity")]
    pub capacity: usize,

    /// JSONL file every event is appended to (None = memory only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            capacity: default_journal_capacity(),
            path: None,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_min_consecutive_below() -> u32 {
    2
}

fn default_sample_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_probe_value_pointer() -> String {
    "/total".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_cycle_interval_secs() -> u64 {
    3_600 // 1 hour
}

fn default_status_poll_interval_secs() -> u64 {
    600 // 10 minutes
}

fn default_journal_capacity() -> usize {
    1_000
}

/// The six remediation subsystems
fn default_subsystems() -> Vec<SubsystemEndpoint> {
    vec![
        SubsystemEndpoint::new(
            "manual-automation",
            "/api/atlas-automation/execute-full-automation",
        ),
        SubsystemEndpoint::new(
            "payments",
            "/api/atlas-payments/execute-payment-automation",
        ),
        SubsystemEndpoint::new(
            "content",
            "/api/atlas-content/execute-content-automation",
        ),
        SubsystemEndpoint::new("executor", "/api/atlas-executor/execute-all"),
        SubsystemEndpoint::new("bots", "/api/atlas-bots/start-cycle"),
        SubsystemEndpoint::new("schedule", "/api/atlas-executor/activate-schedule"),
    ]
}

impl LifelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LifelineError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: LifelineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check every section; failures are configuration faults
    pub fn validate(&self) -> Result<()> {
        self.monitor_policy()
            .validate()
            .map_err(|e| LifelineError::Config(e.to_string()))?;
        self.orchestrator_policy()
            .validate()
            .map_err(|e| LifelineError::Config(e.to_string()))?;

        if self.monitor.probe_timeout_ms == 0 {
            return Err(LifelineError::Config(
                "monitor.probe_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.orchestrator.subsystems.is_empty() {
            return Err(LifelineError::Config(
                "orchestrator.subsystems must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for subsystem in &self.orchestrator.subsystems {
            if !seen.insert(subsystem.id.as_str()) {
                return Err(LifelineError::Config(format!(
                    "duplicate subsystem id '{}'",
                    subsystem.id
                )));
            }
        }

        if self.scheduler.cycle_interval_secs == 0 || self.scheduler.status_poll_interval_secs == 0
        {
            return Err(LifelineError::Config(
                "scheduler intervals must be greater than 0".to_string(),
            ));
        }

        if self.journal.capacity == 0 {
            return Err(LifelineError::Config(
                "journal.capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn monitor_policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            threshold: self.monitor.threshold,
            min_consecutive_below: self.monitor.min_consecutive_below,
            sample_interval_s: self.monitor.sample_interval_secs,
        }
    }

    pub fn orchestrator_policy(&self) -> OrchestratorPolicy {
        OrchestratorPolicy {
            call_timeout_ms: self.orchestrator.call_timeout_ms,
        }
    }

    /// Read the bearer token from the configured environment variable
    ///
    /// A named but unset variable is a configuration fault.
    pub fn resolve_auth_token(&self) -> Result<Option<String>> {
        match self.orchestrator.auth_token_env {
            Some(ref var) => std::env::var(var).map(Some).map_err(|_| {
                LifelineError::Config(format!("environment variable {} is not set", var))
            }),
            None => Ok(None),
        }
    }

    /// Configuration with a fast schedule for local experiments
    pub fn demo_preset() -> Self {
        Self {
            monitor: MonitorConfig {
                sample_interval_secs: 10,
                ..Default::default()
            },
            scheduler: SchedulerConfig {
                cycle_interval_secs: 60,
                status_poll_interval_secs: 30,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: LifelineConfig = toml::from_str("").unwrap();

        assert_eq!(config, LifelineConfig::default());
        assert_eq!(config.orchestrator.subsystems.len(), 6);
        assert_eq!(config.monitor.min_consecutive_below, 2);
        assert_eq!(config.scheduler.cycle_interval(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config: LifelineConfig = toml::from_str(
            r#"
            log_level = "debug"

            [monitor]
            threshold = 10.5
            probe_url = "http://localhost:5000/api/revenue/current"

            [[orchestrator.subsystems]]
            id = "payments"
            path = "/api/payments/run"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.monitor.threshold, 10.5);
        assert_eq!(config.monitor.sample_interval_secs, 300);
        assert_eq!(config.monitor.probe_value_pointer, "/total");
        assert_eq!(config.orchestrator.subsystems.len(), 1);
        assert_eq!(config.orchestrator.base_url, "http://localhost:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("lifeline.toml");

        let mut config = LifelineConfig::demo_preset();
        config.journal.path = Some(PathBuf::from("/tmp/events.jsonl"));
        config.to_file(&path).unwrap();

        assert_eq!(LifelineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = LifelineConfig::default();
        config.monitor.min_consecutive_below = 1;
        assert!(matches!(config.validate(), Err(LifelineError::Config(_))));

        let mut config = LifelineConfig::default();
        config.orchestrator.subsystems.clear();
        assert!(config.validate().is_err());

        let mut config = LifelineConfig::default();
        config
            .orchestrator
            .subsystems
            .push(SubsystemEndpoint::new("bots", "/again"));
        assert!(config.validate().is_err());

        let mut config = LifelineConfig::default();
        config.scheduler.status_poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = LifelineConfig::default();
        config.journal.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = LifelineConfig::default();
        config.orchestrator.call_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_token_env_is_fatal() {
        let mut config = LifelineConfig::default();
        assert_eq!(config.resolve_auth_token().unwrap(), None);

        config.orchestrator.auth_token_env = Some("LIFELINE_TEST_TOKEN_THAT_IS_NOT_SET".into());
        let err = config.resolve_auth_token().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[monitor\nthreshold = ").unwrap();

        assert!(matches!(
            LifelineConfig::from_file(&path),
            Err(LifelineError::Config(_))
        ));
        assert!(LifelineConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
