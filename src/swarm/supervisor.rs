//! Per-session supervisor task
//!
//! Owns one [`SessionHandle`] after it first becomes active and drives it
//! around the `Active → Disconnected → Connecting` loop until the swarm
//! shuts down.

use super::controller::acquire;
use super::reconnect::{ReconnectDecision, ReconnectPolicy};
use super::stats::SwarmEvent;
use crate::actions::{ActionDispatcher, ActionOutcome};
use crate::session::{ConnectSettings, Connector, SessionEvent, SessionHandle, SessionState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Everything a supervisor needs, shared by all sessions of one swarm
pub(crate) struct SupervisorContext {
    pub connector: Arc<dyn Connector>,
    pub settings: ConnectSettings,
    pub policy: ReconnectPolicy,
    pub dispatcher: Arc<ActionDispatcher>,
    pub events: broadcast::Sender<SwarmEvent>,
    pub one_shot: Option<String>,
    pub one_shot_on_reconnect: bool,
    pub settle_delay: Duration,
    pub action_interval: Option<Duration>,
    /// Shared with the ramp-up; bounds sessions in `Connecting`
    pub connect_permits: Arc<Semaphore>,
}

impl SupervisorContext {
    pub fn emit(&self, event: SwarmEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Counts one running supervisor until dropped
pub(crate) struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    pub fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// How an active period ended
enum ActiveExit {
    Closed(String),
    Shutdown,
}

/// Drive an active session until shutdown
pub(crate) async fn supervise(
    mut handle: SessionHandle,
    ctx: Arc<SupervisorContext>,
    mut shutdown: watch::Receiver<bool>,
    _live: LiveGuard,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match handle.state().clone() {
            SessionState::Active => match run_active(&mut handle, &ctx, &mut shutdown).await {
                ActiveExit::Closed(reason) => {
                    info!(identity = %handle.identity(), reason = %reason, "Session disconnected");
                    if let Err(e) = handle.mark_disconnected(reason.clone()) {
                        warn!(identity = %handle.identity(), "{}", e);
                        break;
                    }
                    ctx.emit(SwarmEvent::Disconnected {
                        identity: handle.identity().to_string(),
                        reason,
                    });
                }
                ActiveExit::Shutdown => break,
            },

            SessionState::Disconnected(_) => {
                let delay = match ctx.policy.decide(handle.activations() > 0) {
                    ReconnectDecision::RetryAfter(delay) => delay,
                    ReconnectDecision::Abandon => break,
                };

                debug!(identity = %handle.identity(), ?delay, "Reconnect scheduled");
                ctx.emit(SwarmEvent::Reconnecting {
                    identity: handle.identity().to_string(),
                    delay,
                });

                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown_signal(&mut shutdown) => break,
                }

                if let Err(e) = handle.begin_reconnect() {
                    warn!(identity = %handle.identity(), "{}", e);
                    break;
                }
            }

            SessionState::Connecting => {
                let attempt = handle.reconnects();
                let permit = tokio::select! {
                    permit = acquire(&ctx.connect_permits) => permit,
                    _ = shutdown_signal(&mut shutdown) => break,
                };
                let result = tokio::select! {
                    result = handle.connect(ctx.connector.as_ref(), &ctx.settings) => result,
                    _ = shutdown_signal(&mut shutdown) => break,
                };
                drop(permit);

                match result {
                    Ok(()) => {
                        info!(identity = %handle.identity(), attempt, "Session reconnected");
                        ctx.emit(SwarmEvent::Reconnected {
                            identity: handle.identity().to_string(),
                            attempt,
                        });
                    }
                    Err(e) => {
                        debug!(identity = %handle.identity(), attempt, "Reconnect failed: {}", e);
                        ctx.emit(SwarmEvent::ReconnectFailed {
                            identity: handle.identity().to_string(),
                            error: e.to_string(),
                        });
                        if let Err(e) = handle.requeue_after_failure() {
                            warn!(identity = %handle.identity(), "{}", e);
                            break;
                        }
                    }
                }
            }

            SessionState::Failed(_) => break,
        }
    }

    debug!(identity = %handle.identity(), state = %handle.state(), "Supervisor stopped");
    handle.shutdown();
}

/// Wait for the connection to close while running scheduled actions
async fn run_active(
    handle: &mut SessionHandle,
    ctx: &SupervisorContext,
    shutdown: &mut watch::Receiver<bool>,
) -> ActiveExit {
    let identity = handle.identity().to_string();
    let session = match handle.session() {
        Some(session) => session,
        None => return ActiveExit::Closed("connection missing".to_string()),
    };

    let mut one_shot = ctx
        .one_shot
        .as_deref()
        .filter(|_| handle.activations() == 1 || ctx.one_shot_on_reconnect);

    let settle = sleep(ctx.settle_delay);
    tokio::pin!(settle);

    let mut ticker = ctx.action_interval.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let events = match handle.events_mut() {
        Some(events) => events,
        None => return ActiveExit::Closed("connection missing".to_string()),
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Closed(reason)) => return ActiveExit::Closed(reason),
                Some(SessionEvent::Error(error)) => return ActiveExit::Closed(error),
                Some(SessionEvent::Ready) => {}
                None => return ActiveExit::Closed("connection dropped".to_string()),
            },

            _ = &mut settle, if one_shot.is_some() => {
                if let Some(text) = one_shot.take() {
                    let outcome = ctx.dispatcher.perform_one_shot(session.as_ref(), text).await;
                    report(ctx, &identity, outcome);
                }
            }

            _ = tick(&mut ticker), if ticker.is_some() => {
                let outcome = ctx.dispatcher.perform_random_action(session.as_ref()).await;
                report(ctx, &identity, outcome);
            }

            _ = shutdown_signal(shutdown) => return ActiveExit::Shutdown,
        }
    }
}

fn report(ctx: &SupervisorContext, identity: &str, outcome: ActionOutcome) {
    ctx.emit(SwarmEvent::ActionPerformed {
        identity: identity.to_string(),
        outcome,
    });
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Resolves once shutdown is requested or the controller is gone
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
