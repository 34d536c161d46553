/*!
 * Error types for Lifeline
 */

use lifeline_observability::JournalError;
use lifeline_sentinel::SentinelError;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, LifelineError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum LifelineError {
    /// Configuration error (invalid file, missing credential, bad policy)
    Config(String),

    /// I/O error
    Io(io::Error),

    /// Monitor, orchestrator or scheduler error
    Sentinel(SentinelError),

    /// Event journal error
    Journal(JournalError),

    /// Work completed with some failures
    Partial(String),
}

impl LifelineError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            LifelineError::Config(_) => EXIT_FATAL,
            LifelineError::Sentinel(SentinelError::InvalidPolicy(_))
            | LifelineError::Sentinel(SentinelError::NotConfigured(_)) => EXIT_FATAL,
            // Everything else: partial failure
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is fatal (startup cannot proceed)
    pub fn is_fatal(&self) -> bool {
        self.exit_code() == EXIT_FATAL
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            LifelineError::Config(_) => ErrorCategory::Configuration,
            LifelineError::Io(_) => ErrorCategory::IoError,
            LifelineError::Sentinel(SentinelError::AdmissionRejected) => {
                ErrorCategory::Concurrency
            }
            LifelineError::Sentinel(SentinelError::InvalidPolicy(_))
            | LifelineError::Sentinel(SentinelError::NotConfigured(_)) => {
                ErrorCategory::Configuration
            }
            LifelineError::Sentinel(SentinelError::Reaction(_)) => ErrorCategory::Remediation,
            LifelineError::Journal(_) => ErrorCategory::Journal,
            LifelineError::Partial(_) => ErrorCategory::Remediation,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration errors
    Configuration,
    /// I/O operation errors
    IoError,
    /// Single-flight conflicts
    Concurrency,
    /// Remediation failures
    Remediation,
    /// Event journal errors
    Journal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
            ErrorCategory::Remediation => write!(f, "remediation"),
            ErrorCategory::Journal => write!(f, "journal"),
        }
    }
}

impl fmt::Display for LifelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifelineError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            LifelineError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            LifelineError::Sentinel(err) => {
                write!(f, "{}", err)
            }
            LifelineError::Journal(err) => {
                write!(f, "Journal error: {}", err)
            }
            LifelineError::Partial(msg) => {
                write!(f, "Partial failure: {}", msg)
            }
        }
    }
}

impl std::error::Error for LifelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifelineError::Io(err) => Some(err),
            LifelineError::Sentinel(err) => Some(err),
            LifelineError::Journal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LifelineError {
    fn from(err: io::Error) -> Self {
        LifelineError::Io(err)
    }
}

impl From<SentinelError> for LifelineError {
    fn from(err: SentinelError) -> Self {
        LifelineError::Sentinel(err)
    }
}

impl From<JournalError> for LifelineError {
    fn from(err: JournalError) -> Self {
        LifelineError::Journal(err)
    }
}

impl From<serde_json::Error> for LifelineError {
    fn from(err: serde_json::Error) -> Self {
        LifelineError::Config(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for LifelineError {
    fn from(err: toml::de::Error) -> Self {
        LifelineError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for LifelineError {
    fn from(err: toml::ser::Error) -> Self {
        LifelineError::Config(format!("TOML serialize error: {}", err))
    }
}
