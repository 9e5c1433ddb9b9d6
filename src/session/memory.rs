//! In-process transport
//!
//! A scriptable [`Connector`] that never touches the network. Each connect
//! pops the next [`ConnectBehavior`] from a script (falling back to a
//! default), and every session it creates is kept so callers can inspect
//! what the swarm did to it. Backs `--dry-run` and the test suite.

use super::transport::{
    Block, BotSession, ConnectRequest, Connection, Connector, Control, Entity, Item,
    SessionEvent, Vec3,
};
use crate::{Result, SwarmError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How the simulated server answers one connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Ready immediately
    Ready,

    /// Ready after a delay
    ReadyAfter(Duration),

    /// Connect call itself fails (e.g. connection refused)
    Refuse(String),

    /// Connection opens, then reports an error before ready
    ErrorAfter(Duration, String),

    /// Connection opens and never signals anything
    Hang,

    /// Ready immediately, then closed by the server after a delay
    ReadyThenClose { after: Duration, reason: String },
}

/// World contents each new session starts with
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    pub position: Vec3,
    pub entities: HashMap<u32, Entity>,
    pub items: Vec<Item>,
    pub blocks: Vec<Block>,
    pub slots: usize,
    /// Item types that can be placed
    pub placeable: HashSet<u32>,
    /// Make every async capability call fail
    pub fail_actions: bool,
}

impl MemoryWorld {
    /// Nothing around, nothing in the inventory
    pub fn empty() -> Self {
        Self {
            slots: 36,
            ..Default::default()
        }
    }

    /// A small populated world used for dry runs
    pub fn sample() -> Self {
        let position = Vec3::new(0.0, 64.0, 0.0);
        let mut entities = HashMap::new();
        entities.insert(
            1,
            Entity {
                id: 1,
                name: "sheep".to_string(),
                position: Some(Vec3::new(4.0, 64.0, -2.0)),
            },
        );
        entities.insert(
            2,
            Entity {
                id: 2,
                name: "item_frame".to_string(),
                position: None,
            },
        );

        Self {
            position,
            entities,
            items: vec![Item {
                item_type: 4,
                name: "cobblestone".to_string(),
                count: 16,
            }],
            blocks: vec![
                Block {
                    name: "dirt".to_string(),
                    position: Vec3::new(1.0, 63.0, 0.0),
                },
                Block {
                    name: "stone".to_string(),
                    position: Vec3::new(2.0, 63.0, 1.0),
                },
            ],
            slots: 36,
            placeable: HashSet::from([4]),
            fail_actions: false,
        }
    }
}

/// Everything a session has been asked to do
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    pub chat: Vec<String>,
    pub controls: HashMap<Control, bool>,
    pub looks: Vec<(f64, f64)>,
    pub look_targets: Vec<Vec3>,
    pub navigation: Vec<Vec3>,
    pub selected_slot: Option<usize>,
    pub tossed: Vec<(u32, u32)>,
    pub dug: Vec<Block>,
    pub placed: Vec<(Block, Vec3)>,
}

impl SessionRecord {
    /// Number of capability calls that changed something
    pub fn interactions(&self) -> usize {
        self.chat.len()
            + self.controls.len()
            + self.looks.len()
            + self.look_targets.len()
            + self.navigation.len()
            + usize::from(self.selected_slot.is_some())
            + self.tossed.len()
            + self.dug.len()
            + self.placed.len()
    }
}

/// Connector-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Calls to `connect`
    pub connects: usize,
    /// Connects rejected outright
    pub refused: usize,
    /// Ready signals actually delivered
    pub ready_signals: usize,
    /// Connects that have not yet been answered or ended
    pub in_flight: usize,
    /// Highest `in_flight` ever observed
    pub peak_in_flight: usize,
}

struct Shared {
    default_behavior: Mutex<ConnectBehavior>,
    script: Mutex<VecDeque<ConnectBehavior>>,
    world: Mutex<MemoryWorld>,
    sessions: Mutex<Vec<Arc<MemorySession>>>,
    stats: Arc<Mutex<MemoryStats>>,
}

/// Scriptable in-process connector
#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// Connector answering every connect with `behavior` and an empty world
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self::with_world(behavior, MemoryWorld::empty())
    }

    pub fn with_world(behavior: ConnectBehavior, world: MemoryWorld) -> Self {
        Self {
            shared: Arc::new(Shared {
                default_behavior: Mutex::new(behavior),
                script: Mutex::new(VecDeque::new()),
                world: Mutex::new(world),
                sessions: Mutex::new(Vec::new()),
                stats: Arc::new(Mutex::new(MemoryStats::default())),
            }),
        }
    }

    /// Queue a behavior for the next connect (FIFO, ahead of the default)
    pub fn push_behavior(&self, behavior: ConnectBehavior) {
        lock(&self.shared.script).push_back(behavior);
    }

    pub fn stats(&self) -> MemoryStats {
        lock(&self.shared.stats).clone()
    }

    /// Every session created so far, oldest first
    pub fn sessions(&self) -> Vec<Arc<MemorySession>> {
        lock(&self.shared.sessions).clone()
    }

    /// Most recent session for `identity`
    pub fn latest_session(&self, identity: &str) -> Option<Arc<MemorySession>> {
        lock(&self.shared.sessions)
            .iter()
            .rev()
            .find(|s| s.identity == identity)
            .cloned()
    }

    /// Number of connects made with `identity`
    pub fn connects_for(&self, identity: &str) -> usize {
        lock(&self.shared.sessions)
            .iter()
            .filter(|s| s.identity == identity)
            .count()
    }

    /// Server-side close of the latest session for `identity`
    pub fn close(&self, identity: &str, reason: &str) -> bool {
        match self.latest_session(identity) {
            Some(session) if !session.is_ended() => {
                session.close(reason);
                true
            }
            _ => false,
        }
    }

    fn next_behavior(&self) -> ConnectBehavior {
        lock(&self.shared.script)
            .pop_front()
            .unwrap_or_else(|| lock(&self.shared.default_behavior).clone())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Connection> {
        let behavior = self.next_behavior();

        {
            let mut stats = lock(&self.shared.stats);
            stats.connects += 1;
            if let ConnectBehavior::Refuse(_) = behavior {
                stats.refused += 1;
            } else {
                stats.in_flight += 1;
                stats.peak_in_flight = stats.peak_in_flight.max(stats.in_flight);
            }
        }

        if let ConnectBehavior::Refuse(reason) = behavior {
            tracing::trace!(identity = %request.identity, "Memory connect refused");
            return Err(SwarmError::Connect(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let world = lock(&self.shared.world).clone();
        let session = Arc::new(MemorySession {
            identity: request.identity.clone(),
            events: tx,
            ended: AtomicBool::new(false),
            settled: AtomicBool::new(false),
            stats: Arc::clone(&self.shared.stats),
            world: Mutex::new(world),
            record: Mutex::new(SessionRecord::default()),
        });
        lock(&self.shared.sessions).push(Arc::clone(&session));

        match behavior {
            ConnectBehavior::Ready => session.signal_ready(),
            ConnectBehavior::ReadyAfter(delay) => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    session.signal_ready();
                });
            }
            ConnectBehavior::ErrorAfter(delay, error) => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    session.signal_error(error);
                });
            }
            ConnectBehavior::ReadyThenClose { after, reason } => {
                session.signal_ready();
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    if !session.is_ended() {
                        session.close(&reason);
                    }
                });
            }
            ConnectBehavior::Hang | ConnectBehavior::Refuse(_) => {}
        }

        let capabilities: Arc<dyn BotSession> = session;
        Ok(Connection::new(capabilities, rx))
    }
}

/// One simulated session
pub struct MemorySession {
    identity: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    ended: AtomicBool,
    settled: AtomicBool,
    stats: Arc<Mutex<MemoryStats>>,
    world: Mutex<MemoryWorld>,
    record: Mutex<SessionRecord>,
}

impl MemorySession {
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Snapshot of what this session was asked to do
    pub fn record(&self) -> SessionRecord {
        lock(&self.record).clone()
    }

    /// Close from the server side
    pub fn close(&self, reason: &str) {
        self.settle();
        self.ended.store(true, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::Closed(reason.to_string()));
    }

    fn signal_ready(&self) {
        if self.is_ended() {
            return;
        }
        self.settle();
        lock(&self.stats).ready_signals += 1;
        let _ = self.events.send(SessionEvent::Ready);
    }

    fn signal_error(&self, error: String) {
        if self.is_ended() {
            return;
        }
        self.settle();
        let _ = self.events.send(SessionEvent::Error(error));
    }

    /// Leave the in-flight count exactly once
    fn settle(&self) {
        if !self.settled.swap(true, Ordering::SeqCst) {
            let mut stats = lock(&self.stats);
            stats.in_flight = stats.in_flight.saturating_sub(1);
        }
    }

    fn check_usable(&self) -> Result<()> {
        if self.is_ended() {
            return Err(SwarmError::Transport("session ended".to_string()));
        }
        if lock(&self.world).fail_actions {
            return Err(SwarmError::Transport("simulated transport failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BotSession for MemorySession {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn set_control_state(&self, control: Control, state: bool) -> Result<()> {
        self.check_usable()?;
        lock(&self.record).controls.insert(control, state);
        Ok(())
    }

    async fn look_at(&self, position: Vec3) -> Result<()> {
        self.check_usable()?;
        lock(&self.record).look_targets.push(position);
        Ok(())
    }

    async fn navigate_to(&self, position: Vec3) -> Result<()> {
        self.check_usable()?;
        lock(&self.record).navigation.push(position);
        Ok(())
    }

    async fn look(&self, yaw: f64, pitch: f64) -> Result<()> {
        self.check_usable()?;
        lock(&self.record).looks.push((yaw, pitch));
        Ok(())
    }

    fn inventory_slots(&self) -> usize {
        lock(&self.world).slots
    }

    async fn select_slot(&self, slot: usize) -> Result<()> {
        self.check_usable()?;
        if slot >= self.inventory_slots() {
            return Err(SwarmError::Action(format!("slot {} out of range", slot)));
        }
        lock(&self.record).selected_slot = Some(slot);
        Ok(())
    }

    fn inventory_items(&self) -> Vec<Item> {
        lock(&self.world).items.clone()
    }

    async fn toss(&self, item_type: u32, count: u32) -> Result<()> {
        self.check_usable()?;
        {
            let mut world = lock(&self.world);
            let index = world
                .items
                .iter()
                .position(|i| i.item_type == item_type)
                .ok_or_else(|| SwarmError::Action(format!("no item of type {}", item_type)))?;
            let item = &mut world.items[index];
            item.count = item.count.saturating_sub(count);
            if item.count == 0 {
                world.items.remove(index);
            }
        }
        lock(&self.record).tossed.push((item_type, count));
        Ok(())
    }

    async fn chat(&self, text: &str) -> Result<()> {
        self.check_usable()?;
        lock(&self.record).chat.push(text.to_string());
        Ok(())
    }

    fn find_block(&self, max_distance: f64) -> Option<Block> {
        let world = lock(&self.world);
        world
            .blocks
            .iter()
            .map(|b| (b.position.distance(&world.position), b))
            .filter(|(distance, _)| *distance <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, block)| block.clone())
    }

    async fn dig(&self, block: &Block) -> Result<()> {
        self.check_usable()?;
        lock(&self.world).blocks.retain(|b| b != block);
        lock(&self.record).dug.push(block.clone());
        Ok(())
    }

    async fn place_block(&self, reference: &Block, face: Vec3) -> Result<()> {
        self.check_usable()?;
        lock(&self.world).blocks.push(Block {
            name: "placed".to_string(),
            position: reference.position.plus(face),
        });
        lock(&self.record).placed.push((reference.clone(), face));
        Ok(())
    }

    fn can_place_block(&self, item: &Item, _block: &Block) -> bool {
        item.count > 0 && lock(&self.world).placeable.contains(&item.item_type)
    }

    fn entities(&self) -> HashMap<u32, Entity> {
        lock(&self.world).entities.clone()
    }

    fn end(&self) {
        self.settle();
        self.ended.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, ProtocolOptions};

    fn request(identity: &str) -> ConnectRequest {
        ConnectRequest {
            endpoint: Endpoint::new("memory", None),
            identity: identity.to_string(),
            options: ProtocolOptions::default(),
            default_port: 25565,
        }
    }

    #[tokio::test]
    async fn test_ready_connection_signals() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let mut connection = connector.connect(&request("a")).await.unwrap();

        assert_eq!(connection.events.recv().await, Some(SessionEvent::Ready));
        assert_eq!(connection.session.identity(), "a");

        let stats = connector.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.ready_signals, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.peak_in_flight, 1);
    }

    #[tokio::test]
    async fn test_script_runs_before_default() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        connector.push_behavior(ConnectBehavior::Refuse("refused".into()));

        assert!(connector.connect(&request("a")).await.is_err());
        assert!(connector.connect(&request("a")).await.is_ok());
        assert_eq!(connector.stats().refused, 1);
        assert_eq!(connector.connects_for("a"), 1);
    }

    #[tokio::test]
    async fn test_hang_stays_in_flight_until_ended() {
        let connector = MemoryConnector::new(ConnectBehavior::Hang);
        let connection = connector.connect(&request("a")).await.unwrap();
        assert_eq!(connector.stats().in_flight, 1);

        connection.session.end();
        connection.session.end();
        assert_eq!(connector.stats().in_flight, 0);
        assert!(connector.sessions()[0].is_ended());
    }

    #[tokio::test]
    async fn test_server_close() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let mut connection = connector.connect(&request("a")).await.unwrap();
        connection.events.recv().await;

        assert!(connector.close("a", "server shutdown"));
        assert_eq!(
            connection.events.recv().await,
            Some(SessionEvent::Closed("server shutdown".into()))
        );
        assert!(!connector.close("a", "again"));
    }

    #[tokio::test]
    async fn test_world_capabilities() {
        let connector = MemoryConnector::with_world(ConnectBehavior::Ready, MemoryWorld::sample());
        let connection = connector.connect(&request("a")).await.unwrap();
        let session = connection.session;

        let block = session.find_block(5.0).unwrap();
        assert_eq!(block.name, "dirt");
        assert!(session.find_block(0.5).is_none());

        let item = session.inventory_items().remove(0);
        assert!(session.can_place_block(&item, &block));

        session.dig(&block).await.unwrap();
        assert_eq!(session.find_block(5.0).unwrap().name, "stone");

        session.toss(item.item_type, item.count).await.unwrap();
        assert!(session.inventory_items().is_empty());

        let record = connector.sessions()[0].record();
        assert_eq!(record.dug.len(), 1);
        assert_eq!(record.tossed, vec![(4, 16)]);
    }

    #[tokio::test]
    async fn test_ended_session_rejects_actions() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let connection = connector.connect(&request("a")).await.unwrap();
        connection.session.end();

        assert!(connection.session.chat("hi").await.is_err());
        assert!(connection
            .session
            .set_control_state(Control::Jump, true)
            .is_err());
    }
}
