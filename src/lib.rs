//! botswarm - Bot swarm session lifecycle and concurrency controller
//!
//! botswarm opens many concurrent bot sessions against a single game server,
//! optionally has each one send a chat line or command once it is in, and
//! keeps every session that made it in alive by reconnecting it whenever
//! the server drops it.
//!
//! # Architecture
//!
//! - **swarm**: Ramp-up controller, per-session supervisors, reconnect policy
//! - **session**: Session state machine, identities and pluggable transports
//! - **actions**: Randomized action catalog and dispatcher
//! - **config**: YAML configuration, endpoint parsing and validation
//! - **style** / **prompt** / **commands**: Terminal surface of the binary

// Core modules
pub mod actions;
pub mod config;
pub mod error;
pub mod session;
pub mod swarm;

// Binary support
pub mod commands;
pub mod logging;
pub mod prompt;
pub mod style;

// Re-exports
pub use error::{Result, SwarmError};
