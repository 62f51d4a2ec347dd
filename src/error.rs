//! Error types for the monitoring engine
//!
//! Check and alert failures never show up here: checks turn them into failing
//! results, and alert failures are logged by the engine. What remains are
//! configuration errors (fatal at startup) and contract violations.

use std::fmt;

/// Result type alias for engine operations
pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// A check with this name is already registered
    DuplicateCheck(String),

    /// Check names must contain at least one non-whitespace character
    EmptyCheckName,

    /// A result was stored under a name that was never registered
    UnregisteredCheck(String),

    /// A check returned a result carrying someone else's name
    ResultNameMismatch { expected: String, actual: String },

    /// No constructor is registered for this check type
    UnknownCheckType(String),

    /// No constructor is registered for this alert type
    UnknownAlertType(String),

    /// A constructor rejected its parameters
    InvalidParams { kind: String, reason: String },

    /// The polling interval must be non-zero
    InvalidInterval,

    /// A configured timeout must be non-zero
    InvalidTimeout(&'static str),

    /// The engine has been stopped and will not run further cycles
    EngineStopped,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::DuplicateCheck(name) => {
                write!(f, "check '{name}' is registered more than once")
            }
            MonitorError::EmptyCheckName => write!(f, "check name must not be empty"),
            MonitorError::UnregisteredCheck(name) => {
                write!(f, "no check named '{name}' is registered")
            }
            MonitorError::ResultNameMismatch { expected, actual } => write!(
                f,
                "check '{expected}' returned a result named '{actual}'"
            ),
            MonitorError::UnknownCheckType(kind) => write!(f, "unknown check type: {kind}"),
            MonitorError::UnknownAlertType(kind) => write!(f, "unknown alert type: {kind}"),
            MonitorError::InvalidParams { kind, reason } => {
                write!(f, "invalid parameters for '{kind}': {reason}")
            }
            MonitorError::InvalidInterval => write!(f, "polling interval must be non-zero"),
            MonitorError::InvalidTimeout(setting) => write!(f, "{setting} must be non-zero"),
            MonitorError::EngineStopped => write!(f, "monitoring engine is stopped"),
        }
    }
}

impl std::error::Error for MonitorError {}

impl MonitorError {
    /// Whether this error is raised while building the engine, before any cycle.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MonitorError::DuplicateCheck(_)
                | MonitorError::EmptyCheckName
                | MonitorError::UnknownCheckType(_)
                | MonitorError::UnknownAlertType(_)
                | MonitorError::InvalidParams { .. }
                | MonitorError::InvalidInterval
                | MonitorError::InvalidTimeout(_)
        )
    }
}
