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

use crate::error::AcquisitionError;
use crate::session_monitor::SessionId;
use crate::weight::interface::SourceKind;
use crate::weight::supervisor::SourceSelection;
use chrono::{DateTime, Utc};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{ImmediatePublisher, PubSubChannel, Subscriber};
use embassy_time::Instant;
use std::sync::Arc;

/// One calibrated reading. `grams` is always finite and never negative.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct WeightSample {
    pub grams: f32,
    /// Monotonic time the frame was processed.
    pub timestamp: Instant,
    pub captured_at: DateTime<Utc>,
    /// Source that produced the frame, `None` for the all-zero stream emitted
    /// when no source could be acquired.
    pub source: Option<SourceKind>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightRequest {
    Calibrate,
    StartMonitoring,
    StopMonitoring,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum WeightEvents {
    WeightUpdate(WeightSample),
    SourceChanged(SourceSelection),
    SessionStarted(SessionId),
    SessionEnded(SessionId),
    AutoTareFailed(SessionId),
    RequestCompleted(WeightRequest),
    MonitoringFailed(AcquisitionError),
}

const CHANNEL_DEPTH: usize = 32;
const CHANNEL_SUBS: usize = 4;
const CHANNEL_PUBS: usize = 1;

pub type WeightChannel = PubSubChannel<CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelSubscriber<'a> = Subscriber<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelPublisher<'a> = ImmediatePublisher<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;

/// Callback alternative to a channel subscription. Called on whichever thread
/// processed the frame, with no engine lock held.
pub type WeightListener = Arc<dyn Fn(&WeightEvents) + Send + Sync>;
