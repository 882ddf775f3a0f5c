//! Readiness polling policy and cooperative cancellation.

use std::time::Duration;

use tokio::sync::watch;

use shipyard_core::ConfigError;
use shipyard_core::config::{BackoffKind, PollConfig};

/// How the wait between readiness polls evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same interval every time.
    Fixed,
    /// Double the interval after every pending poll, up to a ceiling.
    Exponential { max_interval: Duration },
}

/// When and how long to keep polling a revision that is not yet active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff: Backoff,
    /// Give up after this many polls.
    pub max_attempts: Option<u32>,
    /// Give up after this much time.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    /// One poll per second, forever.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: Backoff::Fixed,
            max_attempts: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_exponential_backoff(mut self, max_interval: Duration) -> Self {
        self.backoff = Backoff::Exponential { max_interval };
        self
    }

    pub fn from_config(config: &PollConfig) -> Result<Self, ConfigError> {
        let mut policy = Self::fixed(config.interval()?);
        if config.backoff == BackoffKind::Exponential {
            policy = policy.with_exponential_backoff(config.max_interval()?);
        }
        policy.timeout = config.timeout()?;
        policy.max_attempts = config.max_attempts;
        Ok(policy)
    }

    /// Delay to use after `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { max_interval } => current.saturating_mul(2).min(max_interval),
        }
    }

    /// Whether `attempts` polls over `elapsed` have used up the budget.
    pub fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return true;
        }
        self.timeout.is_some_and(|t| elapsed >= t)
    }
}

enum Wake {
    Elapsed,
    Signalled,
    Closed,
}

/// Caller-controlled cancellation, checked between readiness polls.
///
/// Backed by a `watch` channel: sending `true` cancels. A signal whose
/// sender has been dropped can never fire.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A fresh signal and the sender that fires it.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleep for `duration`. Returns `false` if cancelled before it elapsed.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            tokio::time::sleep(duration).await;
            return true;
        };
        if *rx.borrow() {
            return false;
        }

        let wake = tokio::select! {
            _ = tokio::time::sleep(duration) => Wake::Elapsed,
            changed = rx.changed() => {
                if changed.is_ok() { Wake::Signalled } else { Wake::Closed }
            }
        };

        match wake {
            Wake::Elapsed => true,
            Wake::Signalled => !*rx.borrow(),
            Wake::Closed => {
                self.rx = None;
                tokio::time::sleep(duration).await;
                true
            }
        }
    }
}
