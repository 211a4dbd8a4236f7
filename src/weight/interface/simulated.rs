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

//! In-process stand-ins for the vendor devices. Clones share state, so one
//! clone can be handed to a pressure source while another plays the part of
//! the hardware.

use crate::error::AcquisitionError;
use crate::weight::interface::force_touch::{PressureEventDevice, PressureHandler};
use crate::weight::interface::multitouch::{
    ContactHandler, DeviceClass, MultitouchDevice, RawContact,
};
use crate::weight::interface::{FrameOrigin, FrameReceiver, FrameSink, PressureFrame};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use std::sync::{Arc, Weak};

struct HandlerSlot<H> {
    handler: Option<H>,
    registration: u32,
    registered: bool,
    unregistrations: u32,
}

impl<H> HandlerSlot<H> {
    const fn new() -> Self {
        Self {
            handler: None,
            registration: 0,
            registered: false,
            unregistrations: 0,
        }
    }

    fn register(&mut self, handler: H) {
        self.registration = self.registration.wrapping_add(1);
        self.handler = Some(handler);
        self.registered = true;
    }

    fn unregister(&mut self) {
        self.registration = self.registration.wrapping_add(1);
        self.handler = None;
        if self.registered {
            self.unregistrations += 1;
        }
        self.registered = false;
    }
}

type SharedSlot<H> = Arc<Mutex<CriticalSectionRawMutex, RefCell<HandlerSlot<H>>>>;

/// Calls the registered handler without holding the slot lock, so the handler
/// is free to call back into the device.
fn invoke<H>(slot: &SharedSlot<H>, call: impl FnOnce(&mut H)) -> bool {
    let taken = slot.lock(|slot| {
        let mut slot = slot.borrow_mut();
        let registration = slot.registration;
        slot.handler.take().map(|handler| (handler, registration))
    });

    let Some((mut handler, registration)) = taken else {
        return false;
    };

    call(&mut handler);

    slot.lock(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.registered && slot.registration == registration && slot.handler.is_none() {
            slot.handler = Some(handler);
        }
    });
    true
}

#[derive(Clone)]
pub struct SimulatedTrackpad {
    class: Option<DeviceClass>,
    slot: SharedSlot<ContactHandler>,
}

impl SimulatedTrackpad {
    pub fn built_in() -> Self {
        Self::with_class(Some(DeviceClass::BuiltInTrackpad))
    }

    pub fn with_class(class: Option<DeviceClass>) -> Self {
        Self {
            class,
            slot: Arc::new(Mutex::new(RefCell::new(HandlerSlot::new()))),
        }
    }

    /// Delivers one contact frame as the vendor callback would. Returns false
    /// when nobody is registered.
    pub fn emit(&self, contacts: &[RawContact], timestamp: f64) -> bool {
        invoke(&self.slot, |handler| handler(contacts, timestamp))
    }

    pub fn is_registered(&self) -> bool {
        self.slot.lock(|slot| slot.borrow().registered)
    }

    pub fn unregister_count(&self) -> u32 {
        self.slot.lock(|slot| slot.borrow().unregistrations)
    }
}

impl MultitouchDevice for SimulatedTrackpad {
    fn device_class(&self) -> Option<DeviceClass> {
        self.class
    }

    fn register_contact_handler(
        &mut self,
        handler: ContactHandler,
    ) -> Result<(), AcquisitionError> {
        if self.class.is_none() {
            return Err(AcquisitionError::DeviceUnavailable);
        }
        self.slot.lock(|slot| slot.borrow_mut().register(handler));
        Ok(())
    }

    fn unregister_contact_handler(&mut self) {
        self.slot.lock(|slot| slot.borrow_mut().unregister());
    }
}

#[derive(Clone)]
pub struct SimulatedForceTouch {
    supported: bool,
    slot: SharedSlot<PressureHandler>,
}

impl SimulatedForceTouch {
    pub fn supported() -> Self {
        Self::new(true)
    }

    pub fn unsupported() -> Self {
        Self::new(false)
    }

    fn new(supported: bool) -> Self {
        Self {
            supported,
            slot: Arc::new(Mutex::new(RefCell::new(HandlerSlot::new()))),
        }
    }

    /// Delivers one pressure change event. Returns false when nobody is
    /// registered.
    pub fn emit(&self, pressure: f32) -> bool {
        invoke(&self.slot, |handler| handler(pressure))
    }

    pub fn is_registered(&self) -> bool {
        self.slot.lock(|slot| slot.borrow().registered)
    }

    pub fn unregister_count(&self) -> u32 {
        self.slot.lock(|slot| slot.borrow().unregistrations)
    }
}

impl PressureEventDevice for SimulatedForceTouch {
    fn supports_pressure(&self) -> bool {
        self.supported
    }

    fn register_pressure_handler(
        &mut self,
        handler: PressureHandler,
    ) -> Result<(), AcquisitionError> {
        if !self.supported {
            return Err(AcquisitionError::DeviceUnavailable);
        }
        self.slot.lock(|slot| slot.borrow_mut().register(handler));
        Ok(())
    }

    fn unregister_pressure_handler(&mut self) {
        self.slot.lock(|slot| slot.borrow_mut().unregister());
    }
}

/// Frame receiver that keeps everything it is given.
pub struct RecordingReceiver {
    frames: Mutex<CriticalSectionRawMutex, RefCell<Vec<(FrameOrigin, PressureFrame)>>>,
}

impl Default for RecordingReceiver {
    fn default() -> Self {
        Self {
            frames: Mutex::new(RefCell::new(Vec::new())),
        }
    }
}

impl RecordingReceiver {
    pub fn sink(this: &Arc<Self>, origin: FrameOrigin) -> FrameSink {
        let receiver: Weak<RecordingReceiver> = Arc::downgrade(this);
        FrameSink::new(receiver, origin)
    }

    pub fn frames(&self) -> Vec<(FrameOrigin, PressureFrame)> {
        self.frames.lock(|frames| frames.borrow().clone())
    }
}

impl FrameReceiver for RecordingReceiver {
    fn receive_frame(&self, origin: FrameOrigin, frame: PressureFrame) {
        self.frames
            .lock(|frames| frames.borrow_mut().push((origin, frame)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_may_unregister_from_inside_a_callback() {
        let mut trackpad = SimulatedTrackpad::built_in();
        let mut inner = trackpad.clone();
        trackpad
            .register_contact_handler(Box::new(move |_, _| inner.unregister_contact_handler()))
            .unwrap();

        assert!(trackpad.emit(&[], 0.0));
        assert!(!trackpad.is_registered());
        assert!(!trackpad.emit(&[], 0.1));
        assert_eq!(trackpad.unregister_count(), 1);
    }

    #[test]
    fn recording_receiver_keeps_frames_in_order() {
        use crate::weight::interface::SourceKind;
        use crate::weight::supervisor::RunId;

        let receiver = Arc::new(RecordingReceiver::default());
        assert!(receiver.frames().is_empty());

        let origin = FrameOrigin {
            source: SourceKind::Fallback,
            run: RunId::default(),
        };
        let sink = RecordingReceiver::sink(&receiver, origin);
        sink.deliver(PressureFrame::Scalar(1.0));
        sink.deliver(PressureFrame::Scalar(2.0));

        assert_eq!(
            receiver.frames(),
            vec![
                (origin, PressureFrame::Scalar(1.0)),
                (origin, PressureFrame::Scalar(2.0))
            ]
        );
    }

    #[test]
    fn unsupported_force_touch_rejects_registration() {
        let mut device = SimulatedForceTouch::unsupported();
        assert_eq!(
            device.register_pressure_handler(Box::new(|_| {})),
            Err(AcquisitionError::DeviceUnavailable)
        );
        assert!(!device.emit(1.0));
    }
}
