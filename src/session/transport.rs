//! Session transport abstraction
//!
//! Defines the traits for pluggable connection backends. The swarm core only
//! sees "connect" and the capability calls below; the wire protocol lives
//! entirely behind these traits.

use crate::config::{Endpoint, ProtocolOptions};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// World position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit offsets towards the six faces of a block
    pub const FACES: [Vec3; 6] = [
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];

    pub fn plus(&self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Something visible in the world near the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    /// Not every tracked entity has a known position
    pub position: Option<Vec3>,
}

/// Inventory stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_type: u32,
    pub name: String,
    pub count: u32,
}

/// World block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub position: Vec3,
}

/// Movement control flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Sprint,
    Jump,
    Forward,
    Back,
    Left,
    Right,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Sprint,
        Control::Jump,
        Control::Forward,
        Control::Back,
        Control::Left,
        Control::Right,
    ];
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sprint => write!(f, "sprint"),
            Self::Jump => write!(f, "jump"),
            Self::Forward => write!(f, "forward"),
            Self::Back => write!(f, "back"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Lifecycle signals raised by a transport connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session fully established (post-handshake)
    Ready,

    /// Transport-level failure
    Error(String),

    /// Connection closed by either side, with the transport's reason
    Closed(String),
}

/// Everything a connector needs to open one session
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub endpoint: Endpoint,
    pub identity: String,
    pub options: ProtocolOptions,
    /// Port to use when the endpoint has none
    pub default_port: u16,
}

impl ConnectRequest {
    pub fn port(&self) -> u16 {
        self.endpoint.port_or(self.default_port)
    }
}

/// An opened (not necessarily ready) connection
pub struct Connection {
    /// Capability handle, shared with action callers
    pub session: Arc<dyn BotSession>,

    /// Ready/error/closed signals for this connection
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Connection {
    pub fn new(
        session: Arc<dyn BotSession>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self { session, events }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("identity", &self.session.identity())
            .finish_non_exhaustive()
    }
}

/// Opens connections to a server
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection
    ///
    /// Returning `Ok` only means the connection exists; the session is usable
    /// once [`SessionEvent::Ready`] arrives on its event channel.
    async fn connect(&self, request: &ConnectRequest) -> Result<Connection>;
}

/// Capabilities of an established session
#[async_trait]
pub trait BotSession: Send + Sync {
    /// Name the session connected with
    fn identity(&self) -> &str;

    fn set_control_state(&self, control: Control, state: bool) -> Result<()>;

    async fn look_at(&self, position: Vec3) -> Result<()>;

    async fn navigate_to(&self, position: Vec3) -> Result<()>;

    async fn look(&self, yaw: f64, pitch: f64) -> Result<()>;

    /// Number of inventory slots
    fn inventory_slots(&self) -> usize;

    async fn select_slot(&self, slot: usize) -> Result<()>;

    fn inventory_items(&self) -> Vec<Item>;

    async fn toss(&self, item_type: u32, count: u32) -> Result<()>;

    async fn chat(&self, text: &str) -> Result<()>;

    /// Nearest block within `max_distance`, if any
    fn find_block(&self, max_distance: f64) -> Option<Block>;

    async fn dig(&self, block: &Block) -> Result<()>;

    async fn place_block(&self, reference: &Block, face: Vec3) -> Result<()>;

    fn can_place_block(&self, item: &Item, block: &Block) -> bool;

    /// Tracked entities by id
    fn entities(&self) -> HashMap<u32, Entity>;

    /// Tear the connection down; idempotent
    fn end(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_plus_and_distance() {
        let origin = Vec3::new(1.0, 64.0, 1.0);
        let above = origin.plus(Vec3::FACES[0]);
        assert_eq!(above, Vec3::new(1.0, 65.0, 1.0));
        assert!((origin.distance(&above) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_faces_are_unit_offsets() {
        for face in Vec3::FACES {
            assert!((Vec3::default().distance(&face) - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_connect_request_port() {
        let request = ConnectRequest {
            endpoint: Endpoint::new("localhost", None),
            identity: "Bot".to_string(),
            options: ProtocolOptions::default(),
            default_port: 25565,
        };
        assert_eq!(request.port(), 25565);

        let request = ConnectRequest {
            endpoint: Endpoint::new("localhost", Some(25570)),
            ..request
        };
        assert_eq!(request.port(), 25570);
    }
}
