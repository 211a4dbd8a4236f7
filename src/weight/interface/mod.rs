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

pub mod force_touch;
pub mod multitouch;
pub mod simulated;

use crate::error::{AcquisitionError, SignalError};
use crate::weight::supervisor::RunId;
use core::ops::RangeInclusive;
use std::sync::Weak;
use strum::{Display, EnumIter, FromRepr};

/// Most contacts a single multitouch frame is expected to carry.
pub const MAX_CONTACTS: usize = 16;

/// Phase of a single physical touch as reported by the multitouch device.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, EnumIter, Display)]
pub enum ContactState {
    NotTouching = 0,
    Starting = 1,
    Hovering = 2,
    Making = 3,
    Touching = 4,
    Breaking = 5,
    Lingering = 6,
    Leaving = 7,
}

impl ContactState {
    /// States in which a contact presses on the surface and counts towards weight.
    pub const TOUCHING_RANGE: RangeInclusive<ContactState> =
        ContactState::Making..=ContactState::Breaking;

    /// Unknown device states are treated as not touching.
    pub fn from_raw(raw: u8) -> Self {
        Self::from_repr(raw).unwrap_or(ContactState::NotTouching)
    }

    pub fn is_touching(self) -> bool {
        Self::TOUCHING_RANGE.contains(&self)
    }
}

pub type ContactId = i32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPoint {
    pub id: ContactId,
    pub pressure: f32,
    pub density: f32,
    pub state: ContactState,
    pub frame_timestamp: f64,
}

impl ContactPoint {
    /// Weight contributed by this contact. Both channels carry the same
    /// quantity on different hardware generations, so the larger one wins.
    pub fn contribution(&self) -> f32 {
        if !self.state.is_touching() {
            return 0.0;
        }
        self.pressure.max(self.density).max(0.0)
    }
}

/// Complete snapshot of the contacts known to the device at one instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactFrame {
    pub contacts: heapless::Vec<ContactPoint, MAX_CONTACTS>,
    pub timestamp: f64,
}

/// What a pressure source emits for each device update.
#[derive(Clone, Debug, PartialEq)]
pub enum PressureFrame {
    /// Multitouch snapshot with per-contact channels already in grams.
    Contacts(ContactFrame),
    /// Single scalar already converted to grams.
    Scalar(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum SourceKind {
    HighFidelity,
    Fallback,
}

/// Identifies which source and which monitoring run produced a frame, so that
/// frames from a released source or an earlier run can be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOrigin {
    pub source: SourceKind,
    pub run: RunId,
}

/// Something that consumes frames from a pressure source. Implemented by the
/// weighing manager, and by recording fakes in tests.
pub trait FrameReceiver: Send + Sync {
    fn receive_frame(&self, origin: FrameOrigin, frame: PressureFrame);
}

/// Registration handle given to a source when it is acquired. Frames are
/// pushed through it from whatever thread the device delivers on. The handle
/// does not keep the receiver alive.
#[derive(Clone)]
pub struct FrameSink {
    receiver: Weak<dyn FrameReceiver>,
    origin: FrameOrigin,
}

impl FrameSink {
    pub fn new(receiver: Weak<dyn FrameReceiver>, origin: FrameOrigin) -> Self {
        Self { receiver, origin }
    }

    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    pub fn deliver(&self, frame: PressureFrame) {
        if let Some(receiver) = self.receiver.upgrade() {
            receiver.receive_frame(self.origin, frame);
        }
    }
}

/// A hardware pressure signal that the supervisor can take and give back.
pub trait PressureSource: Send {
    fn kind(&self) -> SourceKind;

    /// Take hold of the device and start pushing frames into `sink`.
    fn acquire(&mut self, sink: FrameSink) -> Result<(), AcquisitionError>;

    /// Stop delivery and let go of the device. Releasing a source that is not
    /// held does nothing.
    fn release(&mut self);

    fn is_acquired(&self) -> bool;
}

pub(crate) fn checked_pressure(value: f32) -> Result<f32, SignalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SignalError::NonFinite(value))
    }
}

/// Replaces NaN and infinite readings with zero.
pub fn sanitize_pressure(value: f32) -> f32 {
    checked_pressure(value).unwrap_or_else(|e| {
        log::trace!("{}, using 0", e);
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn only_pressing_states_are_touching() {
        let touching: Vec<ContactState> =
            ContactState::iter().filter(|s| s.is_touching()).collect();
        assert_eq!(
            touching,
            [
                ContactState::Making,
                ContactState::Touching,
                ContactState::Breaking
            ]
        );
    }

    #[test]
    fn unknown_raw_state_is_not_touching() {
        assert_eq!(ContactState::from_raw(4), ContactState::Touching);
        assert_eq!(ContactState::from_raw(42), ContactState::NotTouching);
    }

    #[test]
    fn contribution_takes_larger_channel_and_floors_at_zero() {
        let mut contact = ContactPoint {
            id: 1,
            pressure: 2.0,
            density: 7.5,
            state: ContactState::Touching,
            frame_timestamp: 0.0,
        };
        assert_eq!(contact.contribution(), 7.5);

        contact.pressure = -4.0;
        contact.density = -1.0;
        assert_eq!(contact.contribution(), 0.0);

        contact.pressure = 9.0;
        contact.state = ContactState::Hovering;
        assert_eq!(contact.contribution(), 0.0);
    }

    #[test]
    fn non_finite_pressure_becomes_zero() {
        assert_eq!(sanitize_pressure(f32::NAN), 0.0);
        assert_eq!(sanitize_pressure(f32::INFINITY), 0.0);
        assert_eq!(sanitize_pressure(f32::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_pressure(1.25), 1.25);
    }

    struct Unreachable;

    impl FrameReceiver for Unreachable {
        fn receive_frame(&self, _origin: FrameOrigin, _frame: PressureFrame) {
            panic!("frame delivered to a dropped receiver");
        }
    }

    #[test]
    fn sink_without_receiver_drops_frames() {
        let receiver: Weak<dyn FrameReceiver> = Weak::<Unreachable>::new();
        let sink = FrameSink::new(
            receiver,
            FrameOrigin {
                source: SourceKind::Fallback,
                run: RunId::default(),
            },
        );
        sink.deliver(PressureFrame::Scalar(3.0));
    }
}
