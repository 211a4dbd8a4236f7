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

use crate::config::{
    clamp_auto_tare_debounce, clamp_touch_timeout, non_negative_or_default, ScaleConfig,
    DEFAULT_TOUCH_THRESHOLD_GRAMS,
};
use crate::time::OneShotTimer;
use core::fmt::Debug;
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

pub type SessionId = u32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionState {
    pub session_id: SessionId,
    pub started_at: Instant,
    pub last_active_at: Instant,
    pub is_active: bool,
    pub has_auto_tared: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub touch_threshold_grams: f32,
    pub touch_timeout: Duration,
    pub auto_tare_enabled: bool,
    pub auto_tare_debounce: Duration,
}

impl From<&ScaleConfig> for SessionConfig {
    fn from(config: &ScaleConfig) -> Self {
        Self {
            touch_threshold_grams: config.touch_threshold_grams,
            touch_timeout: clamp_touch_timeout(config.touch_timeout),
            auto_tare_enabled: config.auto_tare_enabled,
            auto_tare_debounce: clamp_auto_tare_debounce(config.auto_tare_debounce),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    Started(SessionId),
    Ended(SessionId),
    AutoTared(SessionId),
    AutoTareFailed(SessionId),
}

pub type SessionUpdates = heapless::Vec<SessionUpdate, 4>;

pub struct SessionMonitor {
    config: SessionConfig,
    session: Option<SessionState>,
    auto_tare_timer: OneShotTimer,
    next_session_id: SessionId,
}

fn push(updates: &mut SessionUpdates, update: SessionUpdate) {
    if updates.push(update).is_err() {
        warn!("Dropping session update {:?}", update);
    }
}

impl SessionMonitor {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            session: None,
            auto_tare_timer: OneShotTimer::new(),
            next_session_id: 1,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// The current session, or the last one once it has gone idle.
    pub fn session(&self) -> Option<SessionState> {
        self.session
    }

    pub fn auto_tare_deadline(&self) -> Option<Instant> {
        self.auto_tare_timer.deadline()
    }

    /// Feeds one calibrated sample. An idle gap longer than the touch timeout
    /// ends the old session before this sample is looked at, so a touch after
    /// a long gap starts a new one.
    pub fn on_sample(&mut self, grams: f32, now: Instant) -> SessionUpdates {
        let mut updates = SessionUpdates::new();
        self.expire(now, &mut updates);

        if grams < self.config.touch_threshold_grams {
            return updates;
        }

        match self.session.as_mut() {
            Some(session) if session.is_active => session.last_active_at = now,
            _ => {
                let session_id = self.next_session_id;
                self.next_session_id = self.next_session_id.wrapping_add(1);

                let auto_tare = self.config.auto_tare_enabled;
                if auto_tare {
                    self.auto_tare_timer.arm(now, self.config.auto_tare_debounce);
                }
                self.session = Some(SessionState {
                    session_id,
                    started_at: now,
                    last_active_at: now,
                    is_active: true,
                    has_auto_tared: auto_tare,
                });
                info!("Session {} started at {} g", session_id, grams);
                push(&mut updates, SessionUpdate::Started(session_id));
            }
        }
        updates
    }

    /// Services the auto-tare debounce and the idle timeout. `tare` runs at
    /// most once per session; if it fails the session still counts as tared.
    pub fn poll<F, E>(&mut self, now: Instant, tare: F) -> SessionUpdates
    where
        F: FnOnce() -> Result<(), E>,
        E: Debug,
    {
        let mut updates = SessionUpdates::new();

        if self.auto_tare_timer.take_expired(now) {
            if let Some(session) = self.session.filter(|s| s.is_active) {
                match tare() {
                    Ok(()) => {
                        debug!("Auto-tare applied for session {}", session.session_id);
                        push(&mut updates, SessionUpdate::AutoTared(session.session_id));
                    }
                    Err(e) => {
                        warn!("Auto-tare failed for session {}: {:?}", session.session_id, e);
                        push(&mut updates, SessionUpdate::AutoTareFailed(session.session_id));
                    }
                }
            }
        }

        self.expire(now, &mut updates);
        updates
    }

    /// Ends any active session and drops a pending auto-tare.
    pub fn cancel(&mut self) -> SessionUpdates {
        let mut updates = SessionUpdates::new();
        self.auto_tare_timer.cancel();
        if let Some(session) = self.session.as_mut().filter(|s| s.is_active) {
            session.is_active = false;
            push(&mut updates, SessionUpdate::Ended(session.session_id));
        }
        updates
    }

    fn expire(&mut self, now: Instant, updates: &mut SessionUpdates) {
        let timeout = self.config.touch_timeout;
        if let Some(session) = self.session.as_mut().filter(|s| s.is_active) {
            if now.saturating_duration_since(session.last_active_at) > timeout {
                session.is_active = false;
                self.auto_tare_timer.cancel();
                info!("Session {} ended", session.session_id);
                push(updates, SessionUpdate::Ended(session.session_id));
            }
        }
    }

    pub fn set_touch_threshold_grams(&mut self, threshold: f32) {
        self.config.touch_threshold_grams =
            non_negative_or_default("touch threshold", threshold, DEFAULT_TOUCH_THRESHOLD_GRAMS);
    }

    pub fn set_touch_timeout(&mut self, timeout: Duration) {
        self.config.touch_timeout = clamp_touch_timeout(timeout);
    }

    /// Disabling auto-tare also drops a tare that is waiting on its debounce.
    pub fn set_auto_tare_enabled(&mut self, enabled: bool) {
        self.config.auto_tare_enabled = enabled;
        if !enabled {
            self.auto_tare_timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_AUTO_TARE_DEBOUNCE, MAX_TOUCH_TIMEOUT};
    use core::cell::Cell;

    fn auto_tare_monitor() -> SessionMonitor {
        SessionMonitor::new(SessionConfig {
            touch_threshold_grams: 0.05,
            touch_timeout: Duration::from_secs(5),
            auto_tare_enabled: true,
            auto_tare_debounce: DEFAULT_AUTO_TARE_DEBOUNCE,
        })
    }

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    #[test]
    fn one_tare_per_session() {
        let mut monitor = auto_tare_monitor();
        let tares = Cell::new(0);
        let tare = || -> Result<(), ()> {
            tares.set(tares.get() + 1);
            Ok(())
        };

        assert_eq!(monitor.on_sample(20.0, at(0)).as_slice(), &[SessionUpdate::Started(1)]);
        assert!(monitor.poll(at(50), tare).is_empty());
        assert_eq!(monitor.poll(at(100), tare).as_slice(), &[SessionUpdate::AutoTared(1)]);
        assert_eq!(tares.get(), 1);

        // Same session: updates activity, no new tare.
        assert!(monitor.on_sample(20.0, at(2_000)).is_empty());
        monitor.poll(at(2_100), tare);
        assert_eq!(tares.get(), 1);

        assert_eq!(
            monitor.on_sample(20.0, at(10_000)).as_slice(),
            &[SessionUpdate::Ended(1), SessionUpdate::Started(2)]
        );
        monitor.poll(at(10_100), tare);
        assert_eq!(tares.get(), 2);
    }

    #[test]
    fn quiet_samples_do_not_end_a_session_early() {
        let mut monitor = auto_tare_monitor();
        monitor.on_sample(1.0, at(0));
        for t in (100..=5_000).step_by(100) {
            assert!(monitor.on_sample(0.0, at(t)).iter().all(|u| !matches!(u, SessionUpdate::Ended(_))));
        }
        assert!(monitor.session().unwrap().is_active);

        assert_eq!(monitor.on_sample(0.0, at(5_001)).as_slice(), &[SessionUpdate::Ended(1)]);
    }

    #[test]
    fn idle_timeout_is_noticed_by_poll() {
        let mut monitor = auto_tare_monitor();
        monitor.on_sample(1.0, at(0));
        monitor.poll(at(100), || Ok::<(), ()>(()));

        assert_eq!(monitor.poll(at(5_001), || Ok::<(), ()>(())).as_slice(), &[SessionUpdate::Ended(1)]);
        assert!(!monitor.session().unwrap().is_active);
    }

    #[test]
    fn failed_tare_is_not_retried_within_the_session() {
        let mut monitor = auto_tare_monitor();
        let attempts = Cell::new(0);
        let failing = || -> Result<(), &'static str> {
            attempts.set(attempts.get() + 1);
            Err("scale busy")
        };

        monitor.on_sample(3.0, at(0));
        assert_eq!(monitor.poll(at(100), failing).as_slice(), &[SessionUpdate::AutoTareFailed(1)]);
        monitor.on_sample(3.0, at(1_000));
        monitor.poll(at(1_200), failing);

        assert_eq!(attempts.get(), 1);
        let session = monitor.session().unwrap();
        assert!(session.is_active);
        assert!(session.has_auto_tared);
    }

    #[test]
    fn sessions_without_auto_tare_never_tare() {
        let mut monitor = auto_tare_monitor();
        monitor.set_auto_tare_enabled(false);
        monitor.on_sample(3.0, at(0));
        assert_eq!(monitor.auto_tare_deadline(), None);
        assert!(!monitor.session().unwrap().has_auto_tared);
        assert!(monitor.poll(at(1_000), || Err::<(), ()>(())).is_empty());
    }

    #[test]
    fn cancel_ends_session_and_drops_pending_tare() {
        let mut monitor = auto_tare_monitor();
        monitor.on_sample(3.0, at(0));
        assert_eq!(monitor.cancel().as_slice(), &[SessionUpdate::Ended(1)]);
        assert!(monitor.cancel().is_empty());
        assert!(monitor.poll(at(500), || Err::<(), ()>(())).is_empty());
    }

    #[test]
    fn touch_timeout_is_clamped() {
        let mut monitor = auto_tare_monitor();
        monitor.set_touch_timeout(Duration::from_secs(600));
        assert_eq!(monitor.config().touch_timeout, MAX_TOUCH_TIMEOUT);
    }
}
