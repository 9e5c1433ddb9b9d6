//! Reconnect policy
//!
//! Flat random delay before a dropped session reconnects. There is no
//! backoff and no attempt limit: every call samples the same range
//! regardless of how many reconnects came before.

use crate::config::ReconnectConfig;
use rand::Rng;
use std::time::Duration;

/// What to do with a session that is no longer connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reconnect after the given delay
    RetryAfter(Duration),
    /// Give up on the session
    Abandon,
}

/// Delay range for reconnects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Inclusive lower bound, strictly positive
    pub min_delay: Duration,

    /// Exclusive upper bound
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        }
    }
}

impl ReconnectPolicy {
    /// Build from the config section; an empty range collapses to `min`
    pub fn from_config(config: &ReconnectConfig) -> Self {
        let min_delay = Duration::from_millis(config.min_delay_ms.max(1));
        let max_delay = Duration::from_millis(config.max_delay_ms).max(min_delay);
        Self {
            min_delay,
            max_delay,
        }
    }

    /// Sample a delay uniformly from `[min_delay, max_delay)`
    pub fn next_delay(&self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }

    pub fn next_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rng.gen_range(self.min_delay..self.max_delay)
    }

    /// Sessions that were active at some point always come back; sessions
    /// that never got there are left alone
    pub fn decide(&self, was_active: bool) -> ReconnectDecision {
        if was_active {
            ReconnectDecision::RetryAfter(self.next_delay())
        } else {
            ReconnectDecision::Abandon
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_within_range() {
        let policy = ReconnectPolicy::default();
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..1000 {
            let delay = policy.next_delay_with(&mut rng);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_delay_does_not_grow() {
        let policy = ReconnectPolicy::default();
        let mut rng = StdRng::seed_from_u64(10);

        let late: Vec<Duration> = (0..500).map(|_| policy.next_delay_with(&mut rng)).collect();
        assert!(late.iter().any(|d| *d < Duration::from_millis(1500)));
        assert!(late.iter().any(|d| *d > Duration::from_millis(2500)));
    }

    #[test]
    fn test_from_config() {
        let policy = ReconnectPolicy::from_config(&ReconnectConfig {
            min_delay_ms: 200,
            max_delay_ms: 400,
        });
        assert_eq!(policy.min_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_millis(400));

        let degenerate = ReconnectPolicy::from_config(&ReconnectConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
        });
        assert_eq!(degenerate.next_delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_decide() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.decide(false), ReconnectDecision::Abandon);
        match policy.decide(true) {
            ReconnectDecision::RetryAfter(delay) => {
                assert!(delay >= policy.min_delay && delay < policy.max_delay)
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }
}
