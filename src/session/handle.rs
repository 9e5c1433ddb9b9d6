//! Session handle and its lifecycle state machine
//!
//! ```text
//! Connecting ──ready──▶ Active ──closed──▶ Disconnected ──delay──▶ Connecting
//!      │
//!      └──error/timeout──▶ Failed ──(only if ever active)──▶ Disconnected
//! ```
//!
//! The handle owns the transport connection and tears it down before
//! entering `Disconnected` or `Failed`.

use super::transport::{BotSession, ConnectRequest, Connection, Connector, SessionEvent};
use crate::config::{Endpoint, ProtocolOptions, SwarmConfig};
use crate::{Result, SwarmError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

/// Lifecycle state of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connect attempt in flight
    Connecting,

    /// Session is live and owns one connection
    Active,

    /// Connection closed; carries the transport's reason
    Disconnected(String),

    /// Connect attempt failed or timed out
    Failed(String),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Disconnected(_) => "disconnected",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected(reason) => write!(f, "disconnected ({})", reason),
            Self::Failed(error) => write!(f, "failed ({})", error),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Per-attempt connect parameters
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub options: ProtocolOptions,
    pub default_port: u16,
    /// Deadline measured from attempt start
    pub timeout: Duration,
}

impl ConnectSettings {
    pub fn from_config(config: &SwarmConfig) -> Self {
        Self {
            options: config.protocol.clone(),
            default_port: config.default_port,
            timeout: config.connect_timeout(),
        }
    }
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self::from_config(&SwarmConfig::default())
    }
}

/// One logical session: identity, target and current state
pub struct SessionHandle {
    identity: String,
    endpoint: Endpoint,
    state: SessionState,
    connect_deadline: Option<Instant>,
    connection: Option<Connection>,
    activations: u32,
    reconnects: u32,
}

impl SessionHandle {
    /// Create a handle; every handle starts out `Connecting`
    pub fn new(identity: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            identity: identity.into(),
            endpoint,
            state: SessionState::Connecting,
            connect_deadline: None,
            connection: None,
            activations: 0,
            reconnects: 0,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Deadline of the current (or last) connect attempt
    pub fn connect_deadline(&self) -> Option<Instant> {
        self.connect_deadline
    }

    /// How many times the session has reached `Active`
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// How many times the session re-entered `Connecting` after a disconnect
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    /// Capability handle of the live connection
    pub fn session(&self) -> Option<Arc<dyn BotSession>> {
        self.connection.as_ref().map(|c| Arc::clone(&c.session))
    }

    pub(crate) fn events_mut(&mut self) -> Option<&mut mpsc::UnboundedReceiver<SessionEvent>> {
        self.connection.as_mut().map(|c| &mut c.events)
    }

    /// Run one connect attempt
    ///
    /// Resolves to `Active` on the ready signal. A transport error, a close
    /// before ready, or the deadline passing all resolve to `Failed`; in the
    /// timeout case the half-open connection is ended before returning.
    pub async fn connect(
        &mut self,
        connector: &dyn Connector,
        settings: &ConnectSettings,
    ) -> Result<()> {
        if !self.state.is_connecting() {
            return Err(self.invalid(&SessionState::Connecting));
        }

        let deadline = Instant::now() + settings.timeout;
        self.connect_deadline = Some(deadline);

        let request = ConnectRequest {
            endpoint: self.endpoint.clone(),
            identity: self.identity.clone(),
            options: settings.options.clone(),
            default_port: settings.default_port,
        };

        tracing::debug!(identity = %self.identity, endpoint = %self.endpoint, "Connecting");

        let connection = match timeout_at(deadline, connector.connect(&request)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(self.fail(into_connect_error(e))),
            Err(_) => return Err(self.fail(SwarmError::ConnectTimeout(settings.timeout))),
        };

        // Ends the connection unless it is handed over, including when this
        // future is dropped mid-wait
        let mut pending = PendingConnection(Some(connection));

        let ready = timeout_at(deadline, wait_for_ready(pending.events())).await;
        match ready {
            Ok(Ok(())) => {
                self.connection = pending.release();
                self.transition(SessionState::Active)?;
                self.activations += 1;
                tracing::debug!(identity = %self.identity, "Session active");
                Ok(())
            }
            Ok(Err(e)) => {
                drop(pending);
                Err(self.fail(e))
            }
            Err(_) => {
                // A late ready must not revive this attempt
                drop(pending);
                Err(self.fail(SwarmError::ConnectTimeout(settings.timeout)))
            }
        }
    }

    /// `Active → Disconnected(reason)`
    pub fn mark_disconnected(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SessionState::Disconnected(reason.into()))
    }

    /// `Disconnected → Connecting`, keeping identity and endpoint
    pub fn begin_reconnect(&mut self) -> Result<()> {
        self.transition(SessionState::Connecting)?;
        self.reconnects += 1;
        Ok(())
    }

    /// `Failed → Disconnected` for a session that has been active before
    ///
    /// Sessions that never reached `Active` stay `Failed`.
    pub fn requeue_after_failure(&mut self) -> Result<()> {
        let reason = match &self.state {
            SessionState::Failed(error) => error.clone(),
            _ => return Err(self.invalid(&SessionState::Disconnected(String::new()))),
        };
        self.transition(SessionState::Disconnected(reason))
    }

    /// End the connection for good (process shutdown)
    pub fn shutdown(&mut self) {
        self.teardown();
        if self.state.is_active() {
            self.state = SessionState::Disconnected("shutdown".to_string());
        }
    }

    fn can_transition(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (&self.state, next) {
            (Connecting, Active) | (Connecting, Failed(_)) => true,
            (Active, Disconnected(_)) => true,
            (Disconnected(_), Connecting) => true,
            (Failed(_), Disconnected(_)) => self.activations > 0,
            _ => false,
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.can_transition(&next) {
            return Err(self.invalid(&next));
        }

        if matches!(next, SessionState::Disconnected(_) | SessionState::Failed(_)) {
            self.teardown();
        }

        tracing::trace!(
            identity = %self.identity,
            from = self.state.name(),
            to = next.name(),
            "Session transition"
        );
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` and hand the error back
    fn fail(&mut self, error: SwarmError) -> SwarmError {
        if let Err(e) = self.transition(SessionState::Failed(error.to_string())) {
            tracing::warn!(identity = %self.identity, "{}", e);
        }
        error
    }

    fn invalid(&self, next: &SessionState) -> SwarmError {
        SwarmError::InvalidTransition {
            from: self.state.name().to_string(),
            to: next.name().to_string(),
        }
    }

    fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.session.end();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("identity", &self.identity)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("activations", &self.activations)
            .field("reconnects", &self.reconnects)
            .finish()
    }
}

/// Connection that has not reached ready yet
struct PendingConnection(Option<Connection>);

impl PendingConnection {
    fn events(&mut self) -> Option<&mut mpsc::UnboundedReceiver<SessionEvent>> {
        self.0.as_mut().map(|c| &mut c.events)
    }

    fn release(mut self) -> Option<Connection> {
        self.0.take()
    }
}

impl Drop for PendingConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.0.take() {
            connection.session.end();
        }
    }
}

async fn wait_for_ready(events: Option<&mut mpsc::UnboundedReceiver<SessionEvent>>) -> Result<()> {
    let events = match events {
        Some(events) => events,
        None => return Err(SwarmError::Connect("connection missing".to_string())),
    };
    match events.recv().await {
        Some(SessionEvent::Ready) => Ok(()),
        Some(SessionEvent::Error(error)) => Err(SwarmError::Connect(error)),
        Some(SessionEvent::Closed(reason)) => Err(SwarmError::Connect(format!(
            "closed before ready: {}",
            reason
        ))),
        None => Err(SwarmError::Connect(
            "connection dropped before ready".to_string(),
        )),
    }
}

fn into_connect_error(error: SwarmError) -> SwarmError {
    match error {
        SwarmError::Connect(_) | SwarmError::ConnectTimeout(_) => error,
        other => SwarmError::Connect(other.to_string()),
    }
}
