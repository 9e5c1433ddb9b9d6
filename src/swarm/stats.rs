//! Ramp-up statistics and swarm events

use crate::actions::ActionOutcome;
use crate::SwarmError;
use serde::Serialize;
use std::time::Duration;

/// Counts for the initial ramp
///
/// Owned and mutated by the controller alone; closed off once every
/// requested session has either become active or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwarmStats {
    /// Sessions the ramp was asked to start
    pub requested: usize,

    /// Sessions that reached active during the ramp
    pub succeeded_initial: usize,

    /// Sessions that failed or timed out during the ramp
    pub failed_initial: usize,

    /// Failures caused by the connect deadline
    pub failed_timeout: usize,

    /// Failures reported by the transport
    pub failed_error: usize,

    /// Wall-clock time from the first request to the last settle
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl SwarmStats {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded_initial += 1;
    }

    pub fn record_failure(&mut self, error: &SwarmError) {
        self.failed_initial += 1;
        if error.is_timeout() {
            self.failed_timeout += 1;
        } else {
            self.failed_error += 1;
        }
    }

    /// Attempts that have settled either way
    pub fn settled(&self) -> usize {
        self.succeeded_initial + self.failed_initial
    }

    /// Fraction of requested sessions that came up (1.0 for an empty ramp)
    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            1.0
        } else {
            self.succeeded_initial as f64 / self.requested as f64
        }
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

/// Events emitted by the swarm
#[derive(Debug, Clone)]
pub enum SwarmEvent {
    /// Initial connect succeeded
    SessionActive { identity: String },

    /// Initial connect failed; the session is abandoned
    SessionFailed { identity: String, error: String },

    /// An active session lost its connection
    Disconnected { identity: String, reason: String },

    /// Reconnect scheduled
    Reconnecting { identity: String, delay: Duration },

    /// Reconnect attempt reached active again
    Reconnected { identity: String, attempt: u32 },

    /// Reconnect attempt failed; another one will be scheduled
    ReconnectFailed { identity: String, error: String },

    /// An action ran on a session
    ActionPerformed {
        identity: String,
        outcome: ActionOutcome,
    },

    /// Every ramp-up request has settled
    RampComplete(SwarmStats),
}

impl SwarmEvent {
    /// Session the event is about, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::SessionActive { identity }
            | Self::SessionFailed { identity, .. }
            | Self::Disconnected { identity, .. }
            | Self::Reconnecting { identity, .. }
            | Self::Reconnected { identity, .. }
            | Self::ReconnectFailed { identity, .. }
            | Self::ActionPerformed { identity, .. } => Some(identity),
            Self::RampComplete(_) => None,
        }
    }
}
