/*!
 * Logging and tracing initialization
 */

use std::fs::OpenOptions;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LifelineConfig;
use crate::error::{LifelineError, Result};

/// Crates whose events pass the default filter
const WORKSPACE_TARGETS: &[&str] = &[
    "lifeline",
    "lifeline_sentinel",
    "lifeline_observability",
    "lifeline_core_resilience",
];

/// Default filter directive for a level, e.g. `lifeline=info,lifeline_sentinel=info,...`
pub fn default_filter(level: Level) -> String {
    WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LifelineConfig) -> Result<()> {
    let log_level = if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(log_level)))
        .map_err(|e| LifelineError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_console_logging(env_filter);
    }

    Ok(())
}

/// Initialize compact logging on stderr
///
/// Stdout is left to command output such as `cycle` JSON.
fn init_console_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize JSON logging to a file
///
/// The file is appended to, so daemon restarts keep earlier logs.
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| LifelineError::Config(format!("Failed to open log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false) // No ANSI colors in file
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Initialize logging with custom format for testing
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(Level::DEBUG)));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace() {
        let filter = default_filter(Level::INFO);

        assert_eq!(
            filter,
            "lifeline=INFO,lifeline_sentinel=INFO,lifeline_observability=INFO,lifeline_core_resilience=INFO"
        );
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn test_init_test_logging_twice() {
        init_test_logging();
        init_test_logging();
        tracing::debug!("test logging is live");
    }
}
