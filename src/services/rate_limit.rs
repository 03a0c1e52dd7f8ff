// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sliding-window and daily-quota rate limiter for the backend-call gate.
//!
//! One limiter instance guards all outbound generative-AI calls in the
//! process. Admission ([`RateLimiter::admit`]) never mutates state so it can
//! be checked speculatively; consumption ([`RateLimiter::consume`]) records a
//! dispatched call. Both take `now` as a parameter so tests control the
//! clock.

use crate::config::RateLimits;
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Length of the trailing window for the per-minute limit.
const WINDOW_SECS: i64 = 60;

/// Mutable limiter bookkeeping, guarded by the limiter mutex.
struct RateLimitState {
    /// Call timestamps; only entries within the trailing window matter.
    recent: VecDeque<DateTime<Utc>>,
    /// Calls dispatched on `day`.
    daily_count: u32,
    /// Calendar day (UTC) the daily counter applies to.
    day: NaiveDate,
}

/// Shared, backend-wide rate limit gate.
pub struct RateLimiter {
    limits: RateLimits,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(RateLimitState {
                recent: VecDeque::new(),
                daily_count: 0,
                day: Utc::now().date_naive(),
            }),
        }
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    /// Check whether a call at `now` would be admitted. Never mutates state;
    /// a calendar-day rollover is only committed by [`Self::consume`].
    ///
    /// The daily check takes precedence when both limits would reject.
    pub fn admit(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let state = self.state.lock().expect("rate limiter poisoned");

        let today = now.date_naive();
        let rolled_over = today != state.day;

        let daily_used = if rolled_over { 0 } else { state.daily_count };
        if daily_used >= self.limits.per_day {
            return Err(AppError::DailyQuotaExceeded {
                used: daily_used,
                limit: self.limits.per_day,
            });
        }

        // Timestamps from a previous day never count; rollover clears both.
        let in_window: Vec<&DateTime<Utc>> = if rolled_over {
            Vec::new()
        } else {
            state
                .recent
                .iter()
                .filter(|ts| (now - **ts).num_seconds() < WINDOW_SECS)
                .collect()
        };

        if in_window.len() as u32 >= self.limits.per_minute {
            // Timestamps are appended in order, so the first in-window entry
            // is the oldest; the slot frees when it ages out.
            let oldest = in_window.first().map(|ts| **ts).unwrap_or(now);
            let elapsed_ms = (now - oldest).num_milliseconds().max(0);
            let remaining_ms = (WINDOW_SECS * 1000 - elapsed_ms).max(0);
            let retry_after_seconds = ((remaining_ms + 999) / 1000).max(1) as u64;

            return Err(AppError::MinuteQuotaExceeded {
                retry_after_seconds,
            });
        }

        Ok(())
    }

    /// Record one dispatched call at `now`, committing any day rollover and
    /// pruning timestamps that have left the window.
    pub fn consume(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().expect("rate limiter poisoned");

        let today = now.date_naive();
        if today != state.day {
            state.day = today;
            state.daily_count = 0;
            state.recent.clear();
        }

        state.recent.push_back(now);
        state.daily_count += 1;

        while state
            .recent
            .front()
            .is_some_and(|front| (now - *front).num_seconds() >= WINDOW_SECS)
        {
            state.recent.pop_front();
        }
    }
}
