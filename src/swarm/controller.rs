//! Swarm controller
//!
//! Ramps up `count` sessions against one endpoint, then hands every session
//! that came up to its own supervisor task. A single semaphore with
//! `concurrency` permits covers every connect attempt, ramp-up and reconnect
//! alike, so sessions in `Connecting` never exceed the cap.

use super::reconnect::ReconnectPolicy;
use super::stats::{SwarmEvent, SwarmStats};
use super::supervisor::{supervise, LiveGuard, SupervisorContext};
use crate::actions::ActionDispatcher;
use crate::config::{Endpoint, SwarmConfig};
use crate::session::{ConnectSettings, Connector, IdentityGenerator, SessionHandle};
use crate::{Result, SwarmError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the swarm event channel; slow subscribers see `Lagged`
const EVENT_CAPACITY: usize = 1024;

/// Outcome of one initial connect attempt
type Attempt = (SessionHandle, Result<()>);

/// Starts and owns a swarm of sessions
pub struct SwarmController {
    config: SwarmConfig,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    dispatcher: Arc<ActionDispatcher>,
    events: broadcast::Sender<SwarmEvent>,
    shutdown: watch::Sender<bool>,
    sessions: JoinSet<()>,
    live: Arc<AtomicUsize>,
    connect_permits: Arc<Semaphore>,
    identities: IdentityGenerator,
}

impl SwarmController {
    pub fn new(config: SwarmConfig, connector: Arc<dyn Connector>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        let permits = config.concurrency.max(1);

        Self {
            policy: ReconnectPolicy::from_config(&config.reconnect),
            config,
            connector,
            dispatcher: Arc::new(ActionDispatcher::new()),
            events,
            shutdown,
            sessions: JoinSet::new(),
            live: Arc::new(AtomicUsize::new(0)),
            connect_permits: Arc::new(Semaphore::new(permits)),
            identities: IdentityGenerator::new(),
        }
    }

    /// Use a specific dispatcher (seeded in tests)
    pub fn with_dispatcher(mut self, dispatcher: ActionDispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Subscribe to swarm events
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.events.subscribe()
    }

    /// Number of session supervisors still running
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Run the initial ramp-up
    ///
    /// Resolves once every requested session has either become active or
    /// failed. Sessions that came up keep running (and reconnecting) in the
    /// background after this returns. A blank `one_shot` counts as none.
    pub async fn run(
        &mut self,
        endpoint: &Endpoint,
        count: usize,
        one_shot: Option<&str>,
    ) -> SwarmStats {
        let started = Instant::now();
        let mut stats = SwarmStats::new(count);

        let one_shot = one_shot
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let ctx = Arc::new(self.supervisor_context(one_shot));

        info!(
            endpoint = %endpoint,
            count,
            concurrency = self.config.concurrency,
            "Starting ramp-up"
        );

        let mut attempts: JoinSet<Attempt> = JoinSet::new();
        for index in 0..count {
            // Settle finished attempts while waiting for a free slot
            let permit = loop {
                tokio::select! {
                    biased;
                    Some(joined) = attempts.join_next(), if !attempts.is_empty() => {
                        self.settle(joined, &ctx, &mut stats);
                    }
                    permit = acquire(&ctx.connect_permits) => break permit,
                }
            };

            let identity = self.identities.next_identity();
            debug!(index, identity = %identity, "Requesting session");

            let mut handle = SessionHandle::new(identity, endpoint.clone());
            let connector = Arc::clone(&ctx.connector);
            let settings = ctx.settings.clone();
            attempts.spawn(async move {
                let result = handle.connect(connector.as_ref(), &settings).await;
                drop(permit);
                (handle, result)
            });
        }

        while let Some(joined) = attempts.join_next().await {
            self.settle(joined, &ctx, &mut stats);
        }

        stats.finish(started.elapsed());
        info!(
            succeeded = stats.succeeded_initial,
            failed = stats.failed_initial,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Ramp-up complete"
        );
        let _ = self.events.send(SwarmEvent::RampComplete(stats.clone()));

        stats
    }

    /// Ask every session supervisor to stop
    pub fn shutdown(&self) {
        info!(live = self.live_sessions(), "Shutting down swarm");
        self.shutdown.send_replace(true);
    }

    /// Wait for every session supervisor to exit
    ///
    /// Never resolves while sessions are running unless [`shutdown`] was
    /// called.
    ///
    /// [`shutdown`]: SwarmController::shutdown
    pub async fn wait(&mut self) {
        while let Some(joined) = self.sessions.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    warn!("Session supervisor panicked: {}", e);
                }
            }
        }
    }

    fn supervisor_context(&self, one_shot: Option<String>) -> SupervisorContext {
        SupervisorContext {
            connector: Arc::clone(&self.connector),
            settings: ConnectSettings::from_config(&self.config),
            policy: self.policy.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            events: self.events.clone(),
            one_shot,
            one_shot_on_reconnect: self.config.one_shot_on_reconnect,
            settle_delay: self.config.settle_delay(),
            action_interval: self.config.action_interval(),
            connect_permits: Arc::clone(&self.connect_permits),
        }
    }

    /// Book one finished attempt and start supervising it if it came up
    fn settle(
        &mut self,
        joined: std::result::Result<Attempt, JoinError>,
        ctx: &Arc<SupervisorContext>,
        stats: &mut SwarmStats,
    ) {
        let (handle, result) = match joined {
            Ok(attempt) => attempt,
            Err(e) => {
                let error = SwarmError::Connect(format!("connect task aborted: {}", e));
                warn!("{}", error);
                stats.record_failure(&error);
                return;
            }
        };

        match result {
            Ok(()) => {
                stats.record_success();
                debug!(identity = %handle.identity(), "Session active");
                ctx.emit(SwarmEvent::SessionActive {
                    identity: handle.identity().to_string(),
                });
                let live = LiveGuard::enter(&self.live);
                self.sessions.spawn(supervise(
                    handle,
                    Arc::clone(ctx),
                    self.shutdown.subscribe(),
                    live,
                ));
            }
            Err(error) => {
                stats.record_failure(&error);
                debug!(identity = %handle.identity(), "Initial connect failed: {}", error);
                ctx.emit(SwarmEvent::SessionFailed {
                    identity: handle.identity().to_string(),
                    error: error.to_string(),
                });
            }
        }
    }
}

/// Wait for a connect slot
///
/// The semaphore is never closed; if acquiring fails anyway the attempt
/// proceeds without a slot.
pub(crate) async fn acquire(permits: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
    match Arc::clone(permits).acquire_owned().await {
        Ok(permit) => Some(permit),
        Err(e) => {
            warn!("Connect slot unavailable: {}", e);
            None
        }
    }
}

impl Drop for SwarmController {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::{ConnectBehavior, MemoryConnector};
    use crate::session::BotSession;
    use std::time::Duration;

    fn controller(connector: &MemoryConnector) -> SwarmController {
        SwarmController::new(SwarmConfig::default(), Arc::new(connector.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_completes_immediately() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let mut swarm = controller(&connector);

        let stats = swarm.run(&Endpoint::new("localhost", None), 0, None).await;

        assert_eq!(stats, SwarmStats::new(0));
        assert_eq!(connector.stats().connects, 0);
        assert_eq!(swarm.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_ramp_counts() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        connector.push_behavior(ConnectBehavior::Refuse("connection refused".into()));
        connector.push_behavior(ConnectBehavior::Hang);
        let mut swarm = controller(&connector);

        let stats = swarm.run(&Endpoint::new("localhost", Some(25565)), 5, None).await;

        assert_eq!(stats.requested, 5);
        assert_eq!(stats.succeeded_initial, 3);
        assert_eq!(stats.failed_initial, 2);
        assert_eq!(stats.failed_timeout, 1);
        assert_eq!(stats.failed_error, 1);
        assert!(stats.elapsed >= Duration::from_millis(2000));

        swarm.shutdown();
        swarm.wait().await;
        assert_eq!(swarm.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identities_are_unique() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let mut swarm = controller(&connector);

        swarm.run(&Endpoint::new("localhost", None), 20, None).await;

        let mut names: Vec<String> = connector
            .sessions()
            .iter()
            .map(|s| s.identity().to_string())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 20);

        swarm.shutdown();
        swarm.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ramp_complete_event() {
        let connector = MemoryConnector::new(ConnectBehavior::Ready);
        let mut swarm = controller(&connector);
        let mut events = swarm.subscribe();

        swarm.run(&Endpoint::new("localhost", None), 2, None).await;

        let mut active = 0;
        loop {
            match events.recv().await.unwrap() {
                SwarmEvent::SessionActive { .. } => active += 1,
                SwarmEvent::RampComplete(stats) => {
                    assert_eq!(stats.succeeded_initial, 2);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(active, 2);

        swarm.shutdown();
        swarm.wait().await;
    }
}
