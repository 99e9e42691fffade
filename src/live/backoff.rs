//! Reconnect bookkeeping for the push channel: unbounded retries, delay
//! doubling up to a cap, no jitter.

use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Closed; `retry_in` is the scheduled reconnect delay, `None` once stopped.
    Disconnected { retry_in: Option<Duration> },
    Error,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks the current retry delay and the permanent stop flag.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
    stopped: bool,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            current: policy.initial_delay,
            policy,
            stopped: false,
        }
    }

    #[cfg(test)]
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// A connection opened: the next failure starts from the initial delay.
    pub fn on_open(&mut self) {
        self.current = self.policy.initial_delay;
    }

    /// A connection closed or failed to open. Returns the delay to wait before
    /// the next attempt, or `None` when stopped.
    pub fn on_close(&mut self) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        let delay = self.current;
        self.current = (self.current * self.policy.multiplier).min(self.policy.max_delay);
        Some(delay)
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn delays_double_then_cap() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        let delays: Vec<Duration> = (0..8).filter_map(|_| backoff.on_close()).collect();
        assert_eq!(
            delays,
            vec![
                ms(1000),
                ms(2000),
                ms(4000),
                ms(8000),
                ms(16_000),
                ms(30_000),
                ms(30_000),
                ms(30_000)
            ]
        );
    }

    #[test]
    fn never_exceeds_cap_over_many_failures() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        for _ in 0..200 {
            let delay = backoff.on_close().unwrap();
            assert!(delay <= ms(30_000));
            assert!(delay >= ms(1000));
        }
    }

    #[test]
    fn successful_open_resets_delay() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        backoff.on_close();
        backoff.on_close();
        assert_eq!(backoff.current_delay(), ms(4000));

        backoff.on_open();
        assert_eq!(backoff.on_close(), Some(ms(1000)));
    }

    #[test]
    fn close_after_stop_schedules_nothing() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        backoff.on_close();
        backoff.stop();
        assert!(backoff.is_stopped());
        assert_eq!(backoff.on_close(), None);
        assert_eq!(backoff.on_close(), None);
    }
}
