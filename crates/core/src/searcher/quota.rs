//! Fixed-window call budget for the image search provider.
//!
//! The governor counts provider calls inside a window. Once the ceiling is
//! reached further calls are rejected (never queued) until the window ends;
//! the first check after that restarts the count and clears the history.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QuotaConfig;

/// One provider call, kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub at: DateTime<Utc>,
    pub query: String,
    pub result_count: usize,
    pub cache_key: String,
}

/// Snapshot of the governor's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub resets_at: DateTime<Utc>,
    /// Whole minutes until the window ends, rounded up.
    pub minutes_until_reset: i64,
    pub exhausted: bool,
}

/// Call budget owned by one session.
#[derive(Debug, Clone)]
pub struct QuotaGovernor {
    limit: u32,
    window: chrono::Duration,
    used: u32,
    resets_at: DateTime<Utc>,
    history: Vec<CallRecord>,
}

impl QuotaGovernor {
    /// Create a governor whose first window starts now.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::starting_at(limit, window, Utc::now())
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.max_calls, Duration::from_secs(config.window_secs))
    }

    /// Create a governor whose first window starts at `now`.
    pub fn starting_at(limit: u32, window: Duration, now: DateTime<Utc>) -> Self {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::hours(1));
        Self {
            limit,
            window,
            used: 0,
            resets_at: now + window,
            history: Vec::new(),
        }
    }

    /// Spend one call if the budget allows it.
    ///
    /// Returns `true` and counts the call when allowed; `false` leaves the
    /// state untouched.
    pub fn authorize(&mut self) -> bool {
        self.try_acquire_at(Utc::now()).is_ok()
    }

    /// Spend one call at `now`.
    ///
    /// Returns `Err(wait)` with the time left in the window when exhausted.
    pub fn try_acquire_at(&mut self, now: DateTime<Utc>) -> Result<(), Duration> {
        self.roll_window(now);

        if self.used >= self.limit {
            let wait = (self.resets_at - now).to_std().unwrap_or(Duration::ZERO);
            return Err(wait);
        }

        self.used += 1;
        Ok(())
    }

    /// Add a completed call to the history.
    pub fn record_call(&mut self, query: &str, result_count: usize, cache_key: &str) {
        self.record_call_at(Utc::now(), query, result_count, cache_key);
    }

    pub fn record_call_at(
        &mut self,
        now: DateTime<Utc>,
        query: &str,
        result_count: usize,
        cache_key: &str,
    ) {
        self.history.push(CallRecord {
            at: now,
            query: query.to_string(),
            result_count,
            cache_key: cache_key.to_string(),
        });
    }

    pub fn status(&mut self) -> QuotaStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&mut self, now: DateTime<Utc>) -> QuotaStatus {
        self.roll_window(now);

        let seconds_left = (self.resets_at - now).num_seconds().max(0);
        QuotaStatus {
            used: self.used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(self.used),
            resets_at: self.resets_at,
            minutes_until_reset: (seconds_left + 59) / 60,
            exhausted: self.used >= self.limit,
        }
    }

    /// Calls made in the current window, oldest first.
    pub fn history(&self) -> &[CallRecord] {
        &self.history
    }

    fn roll_window(&mut self, now: DateTime<Utc>) {
        if now >= self.resets_at {
            self.used = 0;
            self.history.clear();
            self.resets_at = now + self.window;
        }
    }
}
