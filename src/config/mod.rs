//! Configuration system
//!
//! Loads ~/.config/botswarm/config.yaml with support for:
//! - Concurrency cap and connect deadline for the initial ramp
//! - Reconnect delay range
//! - Optional periodic action driver
//! - Protocol options passed through to the transport

mod endpoint;
mod swarm_config;
pub mod validation;

pub use endpoint::Endpoint;
pub use swarm_config::{ProtocolOptions, ReconnectConfig, SwarmConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};
