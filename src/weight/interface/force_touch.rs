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

//! Fallback pressure source fed by the host's force-touch pressure events.
//!
//! The host reports a single uncalibrated pressure value, nominally between 0
//! and 1 but with transient excursions up to about 3. It is converted to grams
//! with a fixed linear factor. That is an approximation only: the factor has
//! no documented derivation and readings from this path should not be treated
//! as calibrated truth.

use crate::config::{DEFAULT_FALLBACK_SCALE, FALLBACK_PRESSURE_MAX};
use crate::error::AcquisitionError;
use crate::weight::interface::{
    checked_pressure, FrameSink, PressureFrame, PressureSource, SourceKind,
};
use log::{info, trace, warn};

/// Callback for pressure change events. Runs on the host event loop thread.
pub type PressureHandler = Box<dyn FnMut(f32) + Send>;

pub trait PressureEventDevice: Send {
    /// Whether the host can deliver pressure events at all.
    fn supports_pressure(&self) -> bool;

    fn register_pressure_handler(&mut self, handler: PressureHandler)
    -> Result<(), AcquisitionError>;

    fn unregister_pressure_handler(&mut self);
}

pub struct ForceTouchSource<D> {
    device: D,
    scale: f32,
    acquired: bool,
}

impl<D> ForceTouchSource<D>
where
    D: PressureEventDevice,
{
    pub fn new(device: D) -> Self {
        Self::with_scale(device, DEFAULT_FALLBACK_SCALE)
    }

    pub fn with_scale(device: D, scale: f32) -> Self {
        Self {
            device,
            scale,
            acquired: false,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

/// Grams for one pressure event: non-finite values read as zero, the rest are
/// clamped into `[0, FALLBACK_PRESSURE_MAX]` and scaled.
pub fn pressure_to_grams(pressure: f32, scale: f32) -> f32 {
    let pressure = match checked_pressure(pressure) {
        Ok(p) => p,
        Err(e) => {
            warn!("Force touch reported {}, treating as no pressure", e);
            0.0
        }
    };
    pressure.clamp(0.0, FALLBACK_PRESSURE_MAX) * scale
}

impl<D> PressureSource for ForceTouchSource<D>
where
    D: PressureEventDevice,
{
    fn kind(&self) -> SourceKind {
        SourceKind::Fallback
    }

    fn acquire(&mut self, sink: FrameSink) -> Result<(), AcquisitionError> {
        if self.acquired {
            self.release();
        }

        if !self.device.supports_pressure() {
            return Err(AcquisitionError::DeviceUnavailable);
        }

        let scale = self.scale;
        self.device
            .register_pressure_handler(Box::new(move |pressure| {
                let grams = pressure_to_grams(pressure, scale);
                trace!("Pressure {} -> {} g", pressure, grams);
                sink.deliver(PressureFrame::Scalar(grams));
            }))?;

        self.acquired = true;
        info!("Force touch source acquired, {} g per unit pressure", self.scale);
        Ok(())
    }

    fn release(&mut self) {
        if self.acquired {
            self.device.unregister_pressure_handler();
            self.acquired = false;
            info!("Force touch source released");
        }
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::interface::simulated::{RecordingReceiver, SimulatedForceTouch};
    use crate::weight::interface::FrameOrigin;
    use crate::weight::supervisor::RunId;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    #[test]
    fn pressure_is_clamped_then_scaled() {
        assert_abs_diff_eq!(pressure_to_grams(0.5, 400.0), 200.0);
        assert_abs_diff_eq!(pressure_to_grams(2.5, 300.0), 750.0);
        assert_abs_diff_eq!(pressure_to_grams(7.0, 100.0), 300.0);
        assert_abs_diff_eq!(pressure_to_grams(-0.4, 100.0), 0.0);
    }

    #[test]
    fn non_finite_pressure_reads_as_zero() {
        assert_eq!(pressure_to_grams(f32::NAN, 400.0), 0.0);
        assert_eq!(pressure_to_grams(f32::INFINITY, 400.0), 0.0);
    }

    #[test]
    fn unsupported_host_cannot_be_acquired() {
        let receiver = Arc::new(RecordingReceiver::default());
        let mut source = ForceTouchSource::new(SimulatedForceTouch::unsupported());
        let sink = RecordingReceiver::sink(
            &receiver,
            FrameOrigin {
                source: SourceKind::Fallback,
                run: RunId::default(),
            },
        );
        assert_eq!(source.acquire(sink), Err(AcquisitionError::DeviceUnavailable));
    }

    #[test]
    fn events_become_scalar_frames() {
        let receiver = Arc::new(RecordingReceiver::default());
        let device = SimulatedForceTouch::supported();
        let mut source = ForceTouchSource::with_scale(device.clone(), 300.0);
        let sink = RecordingReceiver::sink(
            &receiver,
            FrameOrigin {
                source: SourceKind::Fallback,
                run: RunId::default(),
            },
        );

        source.acquire(sink).unwrap();
        device.emit(0.1);
        device.emit(f32::NAN);
        source.release();
        device.emit(1.0);

        let grams: Vec<f32> = receiver
            .frames()
            .into_iter()
            .map(|(_, frame)| match frame {
                PressureFrame::Scalar(g) => g,
                other => panic!("unexpected frame {:?}", other),
            })
            .collect();
        assert_eq!(grams.len(), 2);
        assert_abs_diff_eq!(grams[0], 30.0, epsilon = 1e-4);
        assert_eq!(grams[1], 0.0);
    }
}
