//! Sessions and their transports
//!
//! A session is one logical client connection. [`SessionHandle`] owns its
//! lifecycle state machine; the [`Connector`] and [`BotSession`] traits are
//! the seam to whatever actually speaks to the server.
//!
//! Transports:
//! - [`TcpConnector`]: real sockets, protocol-agnostic
//! - [`MemoryConnector`]: scriptable in-process server for dry runs and tests

mod handle;
mod identity;
pub mod memory;
mod tcp;
mod transport;

pub use handle::{ConnectSettings, SessionHandle, SessionState};
pub use identity::{random_identity, IdentityGenerator, IDENTITY_LEN};
pub use memory::{ConnectBehavior, MemoryConnector, MemorySession, MemoryWorld, SessionRecord};
pub use tcp::{TcpConnector, TcpSession};
pub use transport::{
    Block, BotSession, ConnectRequest, Connection, Connector, Control, Entity, Item,
    SessionEvent, Vec3,
};
