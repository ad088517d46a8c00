//! Per-session message throttling.
//!
//! A sliding window counts accepted messages; exceeding it starts a cooldown
//! during which every send is refused. One limiter belongs to one session and
//! is never shared, so it needs no interior locking.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied {
        reason: String,
        retry_after_secs: u64,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    recent: VecDeque<Instant>,
    cooldown: Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cooldown {
    Inactive,
    Until(Instant),
    /// The configured cooldown does not fit in an `Instant`.
    Unbounded,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            recent: VecDeque::new(),
            cooldown: Cooldown::Inactive,
        }
    }

    /// Decide whether a message sent at `now` may proceed.
    ///
    /// Entering a cooldown also empties the window: once the cooldown has
    /// been served the sender starts from a clean slate.
    pub fn can_send(&mut self, now: Instant) -> Admission {
        let remaining = match self.cooldown {
            Cooldown::Inactive => None,
            Cooldown::Until(until) if now < until => Some(until - now),
            Cooldown::Until(_) => {
                self.cooldown = Cooldown::Inactive;
                None
            }
            Cooldown::Unbounded => Some(Duration::from_millis(self.settings.cooldown_ms)),
        };
        if let Some(remaining) = remaining {
            let secs = ceil_secs(remaining);
            return Admission::Denied {
                reason: format!("Too many messages. Please wait {}s", secs),
                retry_after_secs: secs,
            };
        }

        let window = Duration::from_millis(self.settings.window_ms);
        while let Some(&oldest) = self.recent.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if self.recent.len() >= self.settings.max_messages {
            let cooldown = Duration::from_millis(self.settings.cooldown_ms);
            self.cooldown = match now.checked_add(cooldown) {
                Some(until) => Cooldown::Until(until),
                None => Cooldown::Unbounded,
            };
            self.recent.clear();
            let secs = ceil_secs(cooldown);
            return Admission::Denied {
                reason: format!("Rate limit exceeded. Please wait {}s", secs),
                retry_after_secs: secs,
            };
        }

        Admission::Allowed
    }

    /// Count an accepted message. Call once, after `can_send` allowed it.
    pub fn record_message(&mut self, now: Instant) {
        self.recent.push_back(now);
    }

    pub fn in_window(&self) -> usize {
        self.recent.len()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    millis.div_ceil(1000)
}
