//! Error types for botswarm
//!
//! Defines a single error enum covering every failure mode of the swarm.
//! Uses thiserror for ergonomic error handling.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for botswarm operations
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Error type for botswarm operations
#[derive(Error, Debug)]
pub enum SwarmError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server address could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No ready or error signal arrived before the connect deadline
    #[error("Connection timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// Transport reported a failure before the session became ready
    #[error("Connection error: {0}")]
    Connect(String),

    /// A dispatched action failed (always recovered locally)
    #[error("Action failed: {0}")]
    Action(String),

    /// Transport-level failure on an established session
    #[error("Transport error: {0}")]
    Transport(String),

    /// Session state machine refused a transition
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Interactive prompt failed
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SwarmError {
    /// True for the two ways an initial connect attempt can fail
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::ConnectTimeout(_) | Self::Connect(_))
    }

    /// True if the attempt was abandoned because the deadline passed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_classification() {
        assert!(SwarmError::ConnectTimeout(Duration::from_millis(2000)).is_connect_failure());
        assert!(SwarmError::Connect("refused".into()).is_connect_failure());
        assert!(!SwarmError::Action("no block".into()).is_connect_failure());
        assert!(!SwarmError::Config("bad".into()).is_connect_failure());
    }

    #[test]
    fn test_timeout_message() {
        let err = SwarmError::ConnectTimeout(Duration::from_millis(2000));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Connection timeout after 2000ms");
    }
}
