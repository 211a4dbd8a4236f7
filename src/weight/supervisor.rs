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

//! Decides which pressure source is in charge.
//!
//! The supervisor itself never touches a device. The weighing manager asks it
//! what to do, performs the acquire or release outside its state lock, and
//! reports the outcome back. Every monitoring run gets a fresh [`RunId`];
//! frames stamped with any other run are refused, which is how late frames
//! from a released source are dropped.

use crate::config::clamp_grace_period;
use crate::error::TimingError;
use crate::time::OneShotTimer;
use crate::weight::interface::{FrameOrigin, SourceKind};
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};
use strum::Display;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RunId(u32);

impl RunId {
    pub fn next(self) -> Self {
        RunId(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SupervisorState {
    Unstarted,
    HighFidelityActive,
    FallbackActive,
    Stopped,
}

/// Which source is delivering frames in the current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SourceSelection {
    HighFidelityActive,
    FallbackActive,
}

impl SourceSelection {
    pub fn source(self) -> SourceKind {
        match self {
            SourceSelection::HighFidelityActive => SourceKind::HighFidelity,
            SourceSelection::FallbackActive => SourceKind::Fallback,
        }
    }
}

pub struct FallbackSupervisor {
    state: SupervisorState,
    /// Source whose acquisition is under way and not yet confirmed.
    pending: Option<SourceKind>,
    run: RunId,
    grace_period: Duration,
    grace_timer: OneShotTimer,
    high_fidelity_frames: u32,
    fallen_back: bool,
}

impl FallbackSupervisor {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            state: SupervisorState::Unstarted,
            pending: None,
            run: RunId::default(),
            grace_period: clamp_grace_period(grace_period),
            grace_timer: OneShotTimer::new(),
            high_fidelity_frames: 0,
            fallen_back: false,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn selection(&self) -> Option<SourceSelection> {
        match self.state {
            SupervisorState::HighFidelityActive => Some(SourceSelection::HighFidelityActive),
            SupervisorState::FallbackActive => Some(SourceSelection::FallbackActive),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.selection().is_some()
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Takes effect the next time the grace timer is armed.
    pub fn set_grace_period(&mut self, grace_period: Duration) {
        self.grace_period = clamp_grace_period(grace_period);
    }

    pub fn grace_deadline(&self) -> Option<Instant> {
        self.grace_timer.deadline()
    }

    pub fn high_fidelity_frames(&self) -> u32 {
        self.high_fidelity_frames
    }

    /// Opens a new run and marks the high fidelity source as being acquired.
    pub fn begin_run(&mut self) -> RunId {
        self.run = self.run.next();
        self.pending = Some(SourceKind::HighFidelity);
        self.grace_timer.cancel();
        self.high_fidelity_frames = 0;
        self.fallen_back = false;
        debug!("Supervisor run {} started", self.run.value());
        self.run
    }

    pub fn high_fidelity_acquired(&mut self, run: RunId, now: Instant) {
        if run != self.run || self.pending != Some(SourceKind::HighFidelity) {
            return;
        }
        self.pending = None;
        self.state = SupervisorState::HighFidelityActive;

        // Frames may already have arrived while the device was registering.
        if self.high_fidelity_frames == 0 {
            self.grace_timer.arm(now, self.grace_period);
        }
        info!("High fidelity source active");
    }

    /// The high fidelity source could not be acquired; the fallback is next.
    pub fn high_fidelity_failed(&mut self, run: RunId) {
        if run != self.run {
            return;
        }
        warn!("High fidelity source unavailable, falling back");
        self.fallen_back = true;
        self.pending = Some(SourceKind::Fallback);
    }

    pub fn fallback_acquired(&mut self, run: RunId) {
        if run != self.run || self.pending != Some(SourceKind::Fallback) {
            return;
        }
        self.pending = None;
        self.state = SupervisorState::FallbackActive;
        info!("Fallback source active");
    }

    /// Neither source could be held. The run ends here.
    pub fn acquisition_failed(&mut self, run: RunId) {
        if run != self.run {
            return;
        }
        self.pending = None;
        self.grace_timer.cancel();
        self.state = SupervisorState::Stopped;
        self.run = self.run.next();
    }

    /// Services the grace timer. An expiry with no high fidelity frame seen
    /// comes back as [`TimingError::GraceTimeout`] and the supervisor is then
    /// committed to the fallback: high fidelity frames are refused from here
    /// on, and the caller is expected to swap the sources.
    pub fn check_grace(&mut self, now: Instant) -> Result<(), TimingError> {
        if !self.grace_timer.take_expired(now) {
            return Ok(());
        }
        if self.state != SupervisorState::HighFidelityActive
            || self.high_fidelity_frames > 0
            || self.fallen_back
        {
            return Ok(());
        }

        self.fallen_back = true;
        self.pending = Some(SourceKind::Fallback);
        Err(TimingError::GraceTimeout(self.run))
    }

    /// Decides whether a frame should reach the aggregator and scale.
    pub fn accept_frame(&mut self, origin: FrameOrigin) -> bool {
        if origin.run != self.run {
            return false;
        }

        match origin.source {
            SourceKind::HighFidelity => {
                let live = self.state == SupervisorState::HighFidelityActive
                    || self.pending == Some(SourceKind::HighFidelity);
                if self.fallen_back || !live {
                    return false;
                }
                if self.high_fidelity_frames == 0 {
                    debug!("First high fidelity frame, grace timer cancelled");
                }
                self.high_fidelity_frames = self.high_fidelity_frames.saturating_add(1);
                self.grace_timer.cancel();
                true
            }
            SourceKind::Fallback => {
                self.state == SupervisorState::FallbackActive
                    || self.pending == Some(SourceKind::Fallback)
            }
        }
    }

    /// Ends the current run. Returns the source that was held, which the
    /// caller must release. Stopping before the first start leaves the
    /// supervisor unstarted.
    pub fn stop(&mut self) -> Option<SourceKind> {
        self.grace_timer.cancel();
        self.pending = None;

        let held = self.selection().map(SourceSelection::source);
        if self.state == SupervisorState::Unstarted {
            return held;
        }
        if self.state != SupervisorState::Stopped {
            debug!("Supervisor run {} stopped", self.run.value());
            self.run = self.run.next();
        }
        self.state = SupervisorState::Stopped;
        held
    }
}
