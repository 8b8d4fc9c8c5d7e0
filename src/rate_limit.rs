use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RelayConfig;
use crate::error::RelayError;

/// The three rate-limited actions, each with its own counter sharing one
/// window start per client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Join,
    Message,
}

#[derive(Debug, Clone)]
struct RateWindow {
    window_start: Instant,
    creates: u32,
    joins: u32,
    messages: u32,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        RateWindow {
            window_start: now,
            creates: 0,
            joins: 0,
            messages: 0,
        }
    }

    fn counter_mut(&mut self, action: Action) -> &mut u32 {
        match action {
            Action::Create => &mut self.creates,
            Action::Join => &mut self.joins,
            Action::Message => &mut self.messages,
        }
    }
}

/// Fixed-window rate limiter keyed by client address. One shared `windowStart`
/// per key governs all three action counters.
pub struct RateLimiter {
    window: Duration,
    limit_creates: u32,
    limit_joins: u32,
    limit_messages: u32,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn from_config(config: &RelayConfig) -> Self {
        RateLimiter {
            window: Duration::from_secs(config.rate_limit_window_secs),
            limit_creates: config.rate_limit_creates,
            limit_joins: config.rate_limit_joins,
            limit_messages: config.rate_limit_messages,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, action: Action) -> u32 {
        match action {
            Action::Create => self.limit_creates,
            Action::Join => self.limit_joins,
            Action::Message => self.limit_messages,
        }
    }

    /// Checks and, if admitted, consumes one unit of `action` for `key`.
    /// Returns `Ok(())` if admitted, or `RelayError::RateLimited` if not.
    pub fn check(&self, key: &str, action: Action) -> Result<(), RelayError> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        let entry = windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow::new(now));

        if now.duration_since(entry.window_start) > self.window {
            *entry = RateWindow::new(now);
        }

        let limit = self.limit_for(action);
        let counter = entry.counter_mut(action);
        if *counter >= limit {
            let elapsed = now.duration_since(entry.window_start);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(RelayError::RateLimited {
                retry_after_secs,
                limit,
            });
        }
        *counter += 1;
        Ok(())
    }

    /// Drops windows untouched for longer than twice the window duration.
    /// Invoked by the janitor's rate-limiter sweep.
    pub fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let cutoff = self.window * 2;
        let mut windows = self.windows.lock().unwrap();
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.window_start) <= cutoff);
        before - windows.len()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}
