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

//! High fidelity pressure source built on the vendor multitouch API.

use crate::config::DEFAULT_CHANNEL_MULTIPLIER;
use crate::error::AcquisitionError;
use crate::weight::interface::{
    sanitize_pressure, ContactFrame, ContactPoint, ContactState, FrameSink, PressureFrame,
    PressureSource, SourceKind, MAX_CONTACTS,
};
use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    BuiltInTrackpad,
    ExternalTrackpad,
    Mouse,
    Other,
}

/// One contact as the vendor callback reports it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawContact {
    pub identifier: i32,
    pub state: u8,
    pub pressure: f32,
    pub density: f32,
    pub timestamp: f64,
}

impl RawContact {
    pub fn touching(identifier: i32, pressure: f32) -> Self {
        Self {
            identifier,
            state: ContactState::Touching as u8,
            pressure,
            density: 0.0,
            timestamp: 0.0,
        }
    }
}

/// Callback invoked by the vendor API with every contact frame. It may run on
/// a thread owned by the vendor library.
pub type ContactHandler = Box<dyn FnMut(&[RawContact], f64) + Send>;

pub trait MultitouchDevice: Send {
    /// Class of the device behind this handle, `None` when there is no device.
    fn device_class(&self) -> Option<DeviceClass>;

    /// Start contact delivery into `handler`. Replaces any earlier handler.
    fn register_contact_handler(&mut self, handler: ContactHandler)
    -> Result<(), AcquisitionError>;

    /// Stop contact delivery. Once this returns the handler is not called again.
    fn unregister_contact_handler(&mut self);
}

pub struct MultitouchSource<D> {
    device: D,
    channel_multiplier: f32,
    acquired: bool,
}

impl<D> MultitouchSource<D>
where
    D: MultitouchDevice,
{
    pub fn new(device: D) -> Self {
        Self::with_channel_multiplier(device, DEFAULT_CHANNEL_MULTIPLIER)
    }

    pub fn with_channel_multiplier(device: D, channel_multiplier: f32) -> Self {
        Self {
            device,
            channel_multiplier,
            acquired: false,
        }
    }

    pub fn channel_multiplier(&self) -> f32 {
        self.channel_multiplier
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

/// Converts the vendor contacts of one callback into a contact frame in grams.
/// Non-finite channels are zeroed; contacts beyond the frame capacity are
/// dropped.
pub fn convert_contacts(raw: &[RawContact], timestamp: f64, channel_multiplier: f32) -> ContactFrame {
    let mut frame = ContactFrame {
        contacts: heapless::Vec::new(),
        timestamp,
    };

    for contact in raw {
        let point = ContactPoint {
            id: contact.identifier,
            pressure: sanitize_pressure(contact.pressure) * channel_multiplier,
            density: sanitize_pressure(contact.density) * channel_multiplier,
            state: ContactState::from_raw(contact.state),
            frame_timestamp: contact.timestamp,
        };
        if frame.contacts.push(point).is_err() {
            warn!(
                "Frame has {} contacts, only the first {} are used",
                raw.len(),
                MAX_CONTACTS
            );
            break;
        }
    }

    frame
}

impl<D> PressureSource for MultitouchSource<D>
where
    D: MultitouchDevice,
{
    fn kind(&self) -> SourceKind {
        SourceKind::HighFidelity
    }

    fn acquire(&mut self, sink: FrameSink) -> Result<(), AcquisitionError> {
        if self.acquired {
            self.release();
        }

        match self.device.device_class() {
            Some(DeviceClass::BuiltInTrackpad) => {}
            Some(other) => {
                debug!("Multitouch device is {:?}, not the built-in trackpad", other);
                return Err(AcquisitionError::DeviceUnavailable);
            }
            None => {
                debug!("No multitouch device present");
                return Err(AcquisitionError::DeviceUnavailable);
            }
        }

        let channel_multiplier = self.channel_multiplier;
        self.device
            .register_contact_handler(Box::new(move |contacts, timestamp| {
                let frame = convert_contacts(contacts, timestamp, channel_multiplier);
                sink.deliver(PressureFrame::Contacts(frame));
            }))?;

        self.acquired = true;
        info!("Multitouch source acquired");
        Ok(())
    }

    fn release(&mut self) {
        if self.acquired {
            self.device.unregister_contact_handler();
            self.acquired = false;
            info!("Multitouch source released");
        }
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::interface::simulated::{RecordingReceiver, SimulatedTrackpad};
    use crate::weight::interface::FrameOrigin;
    use crate::weight::supervisor::RunId;
    use std::sync::Arc;

    fn sink_for(receiver: &Arc<RecordingReceiver>) -> FrameSink {
        RecordingReceiver::sink(
            receiver,
            FrameOrigin {
                source: SourceKind::HighFidelity,
                run: RunId::default(),
            },
        )
    }

    #[test]
    fn refuses_anything_but_the_built_in_trackpad() {
        let receiver = Arc::new(RecordingReceiver::default());

        let mut external =
            MultitouchSource::new(SimulatedTrackpad::with_class(Some(DeviceClass::ExternalTrackpad)));
        assert_eq!(
            external.acquire(sink_for(&receiver)),
            Err(AcquisitionError::DeviceUnavailable)
        );
        assert!(!external.is_acquired());

        let mut missing = MultitouchSource::new(SimulatedTrackpad::with_class(None));
        assert_eq!(
            missing.acquire(sink_for(&receiver)),
            Err(AcquisitionError::DeviceUnavailable)
        );
    }

    #[test]
    fn forwards_scaled_contacts_until_released() {
        let receiver = Arc::new(RecordingReceiver::default());
        let trackpad = SimulatedTrackpad::built_in();
        let mut source = MultitouchSource::with_channel_multiplier(trackpad.clone(), 2.0);

        source.acquire(sink_for(&receiver)).unwrap();
        assert!(trackpad.emit(&[RawContact::touching(7, 1.5)], 0.5));

        let frames = receiver.frames();
        assert_eq!(frames.len(), 1);
        match &frames[0].1 {
            PressureFrame::Contacts(frame) => {
                assert_eq!(frame.timestamp, 0.5);
                assert_eq!(frame.contacts[0].id, 7);
                assert_eq!(frame.contacts[0].pressure, 3.0);
            }
            other => panic!("unexpected frame {:?}", other),
        }

        source.release();
        source.release();
        assert_eq!(trackpad.unregister_count(), 1);
        assert!(!trackpad.emit(&[RawContact::touching(7, 1.5)], 0.6));
        assert_eq!(receiver.frames().len(), 1);
    }

    #[test]
    fn conversion_zeroes_non_finite_channels_and_caps_contacts() {
        let mut raw = vec![RawContact {
            identifier: 1,
            state: ContactState::Touching as u8,
            pressure: f32::NAN,
            density: f32::INFINITY,
            timestamp: 0.0,
        }];
        for id in 2..40 {
            raw.push(RawContact::touching(id, 1.0));
        }

        let frame = convert_contacts(&raw, 0.0, 1.0);
        assert_eq!(frame.contacts.len(), MAX_CONTACTS);
        assert_eq!(frame.contacts[0].pressure, 0.0);
        assert_eq!(frame.contacts[0].density, 0.0);
    }
}
