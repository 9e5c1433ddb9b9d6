//! Plain TCP transport
//!
//! Opens a real socket to the server and reports ready once it is
//! established. No game protocol is spoken: chat is written as
//! newline-terminated text, movement/look/slot state is kept locally and
//! world queries come back empty, so world actions quietly do nothing.

use super::transport::{
    Block, BotSession, ConnectRequest, Connection, Connector, Control, Entity, Item,
    SessionEvent, Vec3,
};
use crate::{Result, SwarmError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

/// Slots in a player inventory
const INVENTORY_SLOTS: usize = 36;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Connector dialing the endpoint over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Connection> {
        let port = request.port();
        tracing::debug!(
            identity = %request.identity,
            host = %request.endpoint.host,
            port,
            version = %request.options.version,
            auth = %request.options.auth,
            "Opening TCP connection"
        );

        let stream = TcpStream::connect((request.endpoint.host.as_str(), port))
            .await
            .map_err(|e| SwarmError::Connect(e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| SwarmError::Connect(e.to_string()))?;

        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(Notify::new());

        let session = Arc::new(TcpSession {
            identity: request.identity.clone(),
            writer: tokio::sync::Mutex::new(Some(writer)),
            local: Mutex::new(LocalState::default()),
            ended: AtomicBool::new(false),
            stop: Arc::clone(&stop),
        });

        tokio::spawn(watch_socket(reader, tx.clone(), stop));
        let _ = tx.send(SessionEvent::Ready);

        let capabilities: Arc<dyn BotSession> = session;
        Ok(Connection::new(capabilities, rx))
    }
}

/// Read until EOF/error and report the close
async fn watch_socket(
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<SessionEvent>,
    stop: Arc<Notify>,
) {
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            _ = stop.notified() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    let _ = events.send(SessionEvent::Closed("connection closed by server".to_string()));
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    let _ = events.send(SessionEvent::Closed(e.to_string()));
                    break;
                }
            },
        }
    }
}

#[derive(Debug, Default)]
struct LocalState {
    controls: HashMap<Control, bool>,
    yaw: f64,
    pitch: f64,
    selected_slot: usize,
}

/// Session over a raw TCP socket
pub struct TcpSession {
    identity: String,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    local: Mutex<LocalState>,
    ended: AtomicBool,
    stop: Arc<Notify>,
}

impl TcpSession {
    fn check_open(&self) -> Result<()> {
        if self.ended.load(Ordering::SeqCst) {
            Err(SwarmError::Transport("session ended".to_string()))
        } else {
            Ok(())
        }
    }

    /// Control flags currently set
    pub fn controls(&self) -> HashMap<Control, bool> {
        lock(&self.local).controls.clone()
    }
}

#[async_trait]
impl BotSession for TcpSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn set_control_state(&self, control: Control, state: bool) -> Result<()> {
        self.check_open()?;
        lock(&self.local).controls.insert(control, state);
        Ok(())
    }

    async fn look_at(&self, _position: Vec3) -> Result<()> {
        self.check_open()
    }

    async fn navigate_to(&self, _position: Vec3) -> Result<()> {
        self.check_open()
    }

    async fn look(&self, yaw: f64, pitch: f64) -> Result<()> {
        self.check_open()?;
        let mut local = lock(&self.local);
        local.yaw = yaw;
        local.pitch = pitch;
        Ok(())
    }

    fn inventory_slots(&self) -> usize {
        INVENTORY_SLOTS
    }

    async fn select_slot(&self, slot: usize) -> Result<()> {
        self.check_open()?;
        lock(&self.local).selected_slot = slot;
        Ok(())
    }

    fn inventory_items(&self) -> Vec<Item> {
        Vec::new()
    }

    async fn toss(&self, item_type: u32, _count: u32) -> Result<()> {
        Err(SwarmError::Action(format!(
            "no item of type {} in inventory",
            item_type
        )))
    }

    async fn chat(&self, text: &str) -> Result<()> {
        self.check_open()?;
        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| SwarmError::Transport("writer closed".to_string()))?;
        writer
            .write_all(format!("{}\n", text).as_bytes())
            .await
            .map_err(|e| SwarmError::Transport(e.to_string()))?;
        Ok(())
    }

    fn find_block(&self, _max_distance: f64) -> Option<Block> {
        None
    }

    async fn dig(&self, block: &Block) -> Result<()> {
        Err(SwarmError::Action(format!("cannot dig {}", block.name)))
    }

    async fn place_block(&self, reference: &Block, _face: Vec3) -> Result<()> {
        Err(SwarmError::Action(format!(
            "cannot place against {}",
            reference.name
        )))
    }

    fn can_place_block(&self, _item: &Item, _block: &Block) -> bool {
        false
    }

    fn entities(&self) -> HashMap<u32, Entity> {
        HashMap::new()
    }

    fn end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.notify_one();
        // Dropping the write half sends FIN; if a chat holds the lock the
        // half is dropped together with the session instead.
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, ProtocolOptions};
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    fn request(port: u16) -> ConnectRequest {
        ConnectRequest {
            endpoint: Endpoint::new("127.0.0.1", Some(port)),
            identity: "TcpBot01".to_string(),
            options: ProtocolOptions::default(),
            default_port: 25565,
        }
    }

    #[tokio::test]
    async fn test_connect_chat_and_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = tokio::io::BufReader::new(socket).lines();
            let line = lines.next_line().await.unwrap();
            // Dropping the socket closes the connection
            line
        });

        let mut connection = TcpConnector::new().connect(&request(port)).await.unwrap();
        assert_eq!(connection.events.recv().await, Some(SessionEvent::Ready));

        connection.session.chat("Hello server!").await.unwrap();
        assert_eq!(server.await.unwrap(), Some("Hello server!".to_string()));

        match connection.events.recv().await {
            Some(SessionEvent::Closed(_)) => {}
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpConnector::new().connect(&request(port)).await;
        assert!(matches!(result, Err(SwarmError::Connect(_))));
    }

    #[tokio::test]
    async fn test_world_queries_are_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move { listener.accept().await });

        let connection = TcpConnector::new().connect(&request(port)).await.unwrap();
        let session = connection.session;

        assert!(session.entities().is_empty());
        assert!(session.inventory_items().is_empty());
        assert!(session.find_block(5.0).is_none());
        session.set_control_state(Control::Sprint, true).unwrap();

        session.end();
        assert!(session.chat("after end").await.is_err());
    }
}
