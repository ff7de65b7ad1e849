//! Error types for command composition and execution
//!
//! Only failures that must interrupt the caller live here. Blocked safe-mode
//! insertions and missing anchors are silent no-ops, and a nonzero exit is
//! reported through callbacks rather than as an error.

use std::time::Duration;
use thiserror::Error;

/// Main error type for building and running commands
#[derive(Error, Debug)]
pub enum CommandError {
    /// The child process could not be started at all
    #[error("Execution error: {command} could not be started")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The run exceeded its configured deadline and was killed
    #[error("Timeout error: {command} exceeded {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// An output parser rejected the captured text
    #[error("Parser error: {message}")]
    Parser {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Setup mistakes such as an invalid pattern
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rejected configuration values
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CommandError {
    /// Create a new execution error
    pub fn execution(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Execution {
            command: command.into(),
            source,
        }
    }

    /// Create a new timeout error
    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout,
        }
    }

    /// Create a new parser error
    pub fn parser(message: impl Into<String>) -> Self {
        Self::Parser {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error wrapping its cause
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether this error is a deadline expiry
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = CommandError::timeout("sleep 5", Duration::from_millis(200));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timeout error: sleep 5 exceeded 200ms");
    }

    #[test]
    fn test_execution_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = CommandError::execution("nope --help", io);
        assert!(!err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());
    }
}
