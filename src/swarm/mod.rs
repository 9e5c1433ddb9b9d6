//! Swarm lifecycle
//!
//! Starts a fleet of bot sessions against one server and keeps them alive.
//!
//! # Overview
//!
//! - **Ramp-up**: [`SwarmController::run`] requests `count` sessions with a
//!   bounded number of connect attempts in flight and reports a
//!   [`SwarmStats`] summary once each request has settled.
//! - **Supervision**: every session that came up gets its own task that runs
//!   the one-shot action after a settle delay, optionally drives periodic
//!   random actions, and reconnects after a random delay when the connection
//!   closes.
//! - **Reconnects**: [`ReconnectPolicy`] picks a flat delay from
//!   `[min, max)`. Sessions that never became active are not retried.
//!
//! # Example
//!
//! ```ignore
//! use botswarm::config::{Endpoint, SwarmConfig};
//! use botswarm::session::TcpConnector;
//! use botswarm::swarm::SwarmController;
//! use std::sync::Arc;
//!
//! let mut swarm = SwarmController::new(SwarmConfig::default(), Arc::new(TcpConnector::new()));
//! let stats = swarm.run(&Endpoint::parse("localhost:25565")?, 10, Some("/help")).await;
//! println!("{} of {} up", stats.succeeded_initial, stats.requested);
//!
//! swarm.shutdown();
//! swarm.wait().await;
//! ```

mod controller;
mod reconnect;
mod stats;
mod supervisor;

pub use controller::SwarmController;
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use stats::{SwarmEvent, SwarmStats};
