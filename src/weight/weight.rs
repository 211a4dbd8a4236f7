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

use crate::config::{non_negative_or_default, DEFAULT_NOISE_THRESHOLD_GRAMS};
use crate::weight::interface::sanitize_pressure;
use log::{debug, trace};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CalibrationState {
    pub offset_grams: f32,
}

/// Zero point and noise gate applied to the raw aggregate.
pub struct WeightScale {
    calibration: CalibrationState,
    noise_threshold_grams: f32,
}

impl Default for WeightScale {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_THRESHOLD_GRAMS)
    }
}

impl WeightScale {
    pub fn new(noise_threshold_grams: f32) -> Self {
        Self {
            calibration: CalibrationState::default(),
            noise_threshold_grams: non_negative_or_default(
                "noise threshold",
                noise_threshold_grams,
                DEFAULT_NOISE_THRESHOLD_GRAMS,
            ),
        }
    }

    /// Makes `raw` the new zero, replacing whatever offset was there before.
    pub fn tare(&mut self, raw: f32) -> CalibrationState {
        self.calibration = CalibrationState {
            offset_grams: sanitize_pressure(raw),
        };
        debug!("Tare offset = {} g", self.calibration.offset_grams);
        self.calibration
    }

    /// Net weight for a raw reading: never negative, and exactly zero inside
    /// the noise threshold.
    pub fn reported_weight(&self, raw: f32) -> f32 {
        let tared = (sanitize_pressure(raw) - self.calibration.offset_grams).clamp(0.0, f32::MAX);
        if tared < self.noise_threshold_grams {
            return 0.0;
        }
        trace!("Raw {} g, tared {} g", raw, tared);
        tared
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    pub fn noise_threshold_grams(&self) -> f32 {
        self.noise_threshold_grams
    }

    pub fn set_noise_threshold_grams(&mut self, threshold: f32) {
        self.noise_threshold_grams =
            non_negative_or_default("noise threshold", threshold, DEFAULT_NOISE_THRESHOLD_GRAMS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn tare_zeroes_the_current_load() {
        let mut scale = WeightScale::default();
        scale.tare(42.5);
        assert_eq!(scale.reported_weight(42.5), 0.0);
        assert_abs_diff_eq!(scale.reported_weight(142.5), 100.0);
    }

    #[test]
    fn tare_replaces_rather_than_accumulates() {
        let mut scale = WeightScale::default();
        scale.tare(10.0);
        scale.tare(4.0);
        assert_eq!(scale.calibration().offset_grams, 4.0);
        assert_abs_diff_eq!(scale.reported_weight(10.0), 6.0);
    }

    #[test]
    fn readings_below_the_offset_are_zero() {
        let mut scale = WeightScale::default();
        scale.tare(20.0);
        assert_eq!(scale.reported_weight(5.0), 0.0);
    }

    #[test]
    fn jitter_inside_noise_threshold_is_suppressed() {
        let scale = WeightScale::new(0.1);
        assert_eq!(scale.reported_weight(0.09), 0.0);
        assert_abs_diff_eq!(scale.reported_weight(0.1), 0.1);
    }

    #[test]
    fn non_finite_input_reads_zero() {
        let mut scale = WeightScale::default();
        assert_eq!(scale.reported_weight(f32::NAN), 0.0);
        assert_eq!(scale.reported_weight(f32::INFINITY), 0.0);

        scale.tare(f32::NAN);
        assert_eq!(scale.calibration().offset_grams, 0.0);
    }

    #[test]
    fn invalid_noise_threshold_keeps_default() {
        let mut scale = WeightScale::new(-3.0);
        assert_eq!(scale.noise_threshold_grams(), DEFAULT_NOISE_THRESHOLD_GRAMS);
        scale.set_noise_threshold_grams(2.0);
        assert_eq!(scale.noise_threshold_grams(), 2.0);
    }

    proptest! {
        #[test]
        fn reported_weight_is_finite_and_non_negative(
            offset in prop::num::f32::ANY,
            raw in prop::num::f32::ANY,
        ) {
            let mut scale = WeightScale::default();
            scale.tare(offset);
            let grams = scale.reported_weight(raw);
            prop_assert!(grams.is_finite());
            prop_assert!(grams >= 0.0);
        }

        #[test]
        fn calibration_law_holds(raw in -1.0e6f32..1.0e6f32) {
            let mut scale = WeightScale::default();
            scale.tare(raw);
            prop_assert_eq!(scale.reported_weight(raw), 0.0);
        }
    }
}
