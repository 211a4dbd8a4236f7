// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Clocks and cancellable single-shot timers.
//!
//! All engine timing uses `embassy_time` instants and durations. Instants are
//! produced by a [`Clock`] so that the timers can be driven by hand in tests.

use chrono::{DateTime, TimeDelta, Utc};
use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};

/// Source of monotonic and wall clock time.
pub trait Clock: Send + Sync {
    /// Monotonic time, used for every timer in the engine.
    fn now(&self) -> Instant;

    /// Wall clock time attached to weight samples for downstream consumers.
    fn wall_clock(&self) -> DateTime<Utc>;
}

/// Host monotonic clock, counting from the moment it was created.
pub struct MonotonicClock {
    epoch: std::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.epoch.elapsed().as_micros() as u64)
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Replays and tests use this to step
/// through grace periods and session timeouts without sleeping.
pub struct ManualClock {
    micros: Mutex<CriticalSectionRawMutex, Cell<u64>>,
    wall_epoch: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            micros: Mutex::new(Cell::new(0)),
            wall_epoch: DateTime::UNIX_EPOCH,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .lock(|micros| micros.set(micros.get().saturating_add(by.as_micros())));
    }

    pub fn set(&self, at: Instant) {
        self.micros.lock(|micros| micros.set(at.as_micros()));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.lock(|micros| micros.get()))
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = self.micros.lock(|micros| micros.get());
        self.wall_epoch + TimeDelta::microseconds(elapsed as i64)
    }
}

/// Converts a setting expressed in seconds into a duration. Negative and
/// non-finite values become zero.
pub fn duration_from_secs_f32(secs: f32) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::from_micros(0);
    }
    Duration::from_micros((secs as f64 * 1_000_000.0) as u64)
}

pub fn duration_as_secs_f32(duration: Duration) -> f32 {
    (duration.as_micros() as f64 / 1_000_000.0) as f32
}

/// Single-shot deadline. Nothing fires on its own; the owner checks it
/// against the clock and takes the expiry exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// A deadline past the end of the clock saturates to [`Instant::MAX`].
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now.checked_add(after).unwrap_or(Instant::MAX));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Disarms and returns true if the deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> bool {
        if self.has_expired(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
