//! Configuration validation
//!
//! Validates swarm configuration for correctness:
//! - Concurrency cap and connect timeout are positive
//! - Reconnect range is non-empty and strictly positive
//! - Optional action interval is positive

use super::swarm_config::SwarmConfig;
use crate::SwarmError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a swarm configuration, collecting every problem found
pub fn validate_config(config: &SwarmConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.concurrency == 0 {
        errors.push(ValidationError::new(
            "concurrency",
            "Concurrency cap must be at least 1",
        ));
    }

    if config.connect_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "connect_timeout_ms",
            "Connect timeout must be greater than 0",
        ));
    }

    if config.default_port == 0 {
        errors.push(ValidationError::new(
            "default_port",
            "Port must be greater than 0",
        ));
    }

    // Delay must be strictly positive and the range half-open
    if config.reconnect.min_delay_ms == 0 {
        errors.push(ValidationError::new(
            "reconnect.min_delay_ms",
            "Reconnect delay must be greater than 0",
        ));
    }

    if config.reconnect.min_delay_ms >= config.reconnect.max_delay_ms {
        errors.push(ValidationError::new(
            "reconnect.max_delay_ms",
            format!(
                "Must be greater than min_delay_ms ({} >= {})",
                config.reconnect.min_delay_ms, config.reconnect.max_delay_ms
            ),
        ));
    }

    if config.action_interval_ms == Some(0) {
        errors.push(ValidationError::new(
            "action_interval_ms",
            "Action interval must be greater than 0",
        ));
    }

    if config.protocol.version.trim().is_empty() {
        errors.push(ValidationError::new(
            "protocol.version",
            "Protocol version cannot be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert errors to a single SwarmError
pub fn validate_config_result(config: &SwarmConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        SwarmError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
