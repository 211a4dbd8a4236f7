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

use crate::storage::settings::{SettingValue, SettingsAccessor, SettingsAccessorId};
use crate::time::{duration_as_secs_f32, duration_from_secs_f32};
use embassy_time::Duration;
use log::warn;
use strum::IntoEnumIterator;

/// Multiplier applied to both contact channels of the multitouch source. The
/// vendor reports these channels in grams already.
pub const DEFAULT_CHANNEL_MULTIPLIER: f32 = 1.0;

/// Grams per unit of force-touch pressure. The pressure event path is not a
/// calibrated measurement, this is a coarse linear approximation.
pub const DEFAULT_FALLBACK_SCALE: f32 = 400.0;

/// Upper clamp for force-touch pressure before scaling.
pub const FALLBACK_PRESSURE_MAX: f32 = 3.0;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);
pub const MAX_GRACE_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_NOISE_THRESHOLD_GRAMS: f32 = 0.1;
pub const DEFAULT_TOUCH_THRESHOLD_GRAMS: f32 = 0.05;
pub const DEFAULT_TOUCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const MIN_TOUCH_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TOUCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_AUTO_TARE_DEBOUNCE: Duration = Duration::from_millis(100);
pub const MAX_AUTO_TARE_DEBOUNCE: Duration = Duration::from_secs(1);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Everything the engine can be tuned with. Collaborators build this from
/// their own settings store (see [`crate::storage::settings`]) and hand it to
/// the weighing manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub channel_multiplier: f32,
    pub fallback_scale: f32,
    pub grace_period: Duration,
    pub noise_threshold_grams: f32,
    pub touch_threshold_grams: f32,
    pub auto_tare_enabled: bool,
    pub touch_timeout: Duration,
    pub auto_tare_debounce: Duration,
    /// How often the background ticker services timers. `None` leaves timer
    /// servicing to explicit `poll()` calls.
    pub tick_interval: Option<Duration>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            channel_multiplier: DEFAULT_CHANNEL_MULTIPLIER,
            fallback_scale: DEFAULT_FALLBACK_SCALE,
            grace_period: DEFAULT_GRACE_PERIOD,
            noise_threshold_grams: DEFAULT_NOISE_THRESHOLD_GRAMS,
            touch_threshold_grams: DEFAULT_TOUCH_THRESHOLD_GRAMS,
            auto_tare_enabled: false,
            touch_timeout: DEFAULT_TOUCH_TIMEOUT,
            auto_tare_debounce: DEFAULT_AUTO_TARE_DEBOUNCE,
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
        }
    }
}

impl ScaleConfig {
    /// Returns a copy with out of range values replaced. Thresholds and scale
    /// factors that are negative or non-finite fall back to their defaults;
    /// durations are clamped into their allowed ranges.
    pub fn validated(&self) -> Self {
        Self {
            channel_multiplier: positive_or_default(
                "channel multiplier",
                self.channel_multiplier,
                DEFAULT_CHANNEL_MULTIPLIER,
            ),
            fallback_scale: positive_or_default(
                "fallback scale",
                self.fallback_scale,
                DEFAULT_FALLBACK_SCALE,
            ),
            grace_period: clamp_grace_period(self.grace_period),
            noise_threshold_grams: non_negative_or_default(
                "noise threshold",
                self.noise_threshold_grams,
                DEFAULT_NOISE_THRESHOLD_GRAMS,
            ),
            touch_threshold_grams: non_negative_or_default(
                "touch threshold",
                self.touch_threshold_grams,
                DEFAULT_TOUCH_THRESHOLD_GRAMS,
            ),
            auto_tare_enabled: self.auto_tare_enabled,
            touch_timeout: clamp_touch_timeout(self.touch_timeout),
            auto_tare_debounce: clamp_auto_tare_debounce(self.auto_tare_debounce),
            tick_interval: self
                .tick_interval
                .filter(|interval| interval.as_micros() > 0),
        }
    }
}

impl ScaleConfig {
    /// Builds a config from the settings store. Anything that has not been
    /// saved, or is of the wrong kind, keeps its default.
    pub fn load_from<A: SettingsAccessor>(accessor: &A) -> Self {
        let mut config = Self::default();
        for id in SettingsAccessorId::iter() {
            if let Some(value) = accessor.get_setting(id) {
                config.apply_setting(id, value);
            }
        }
        config.validated()
    }

    pub fn save_to<A: SettingsAccessor>(&self, accessor: &A) -> Result<(), A::Error> {
        for id in SettingsAccessorId::iter() {
            accessor.save_setting(id, self.setting(id))?;
        }
        Ok(())
    }

    pub fn setting(&self, id: SettingsAccessorId) -> SettingValue {
        match id {
            SettingsAccessorId::ChannelMultiplier => SettingValue::Float(self.channel_multiplier),
            SettingsAccessorId::FallbackScale => SettingValue::Float(self.fallback_scale),
            SettingsAccessorId::GracePeriodSeconds => {
                SettingValue::Float(duration_as_secs_f32(self.grace_period))
            }
            SettingsAccessorId::NoiseThresholdGrams => {
                SettingValue::Float(self.noise_threshold_grams)
            }
            SettingsAccessorId::TouchThresholdGrams => {
                SettingValue::Float(self.touch_threshold_grams)
            }
            SettingsAccessorId::AutoTareEnabled => SettingValue::Flag(self.auto_tare_enabled),
            SettingsAccessorId::TouchTimeoutSeconds => {
                SettingValue::Float(duration_as_secs_f32(self.touch_timeout))
            }
        }
    }

    /// Sets one field from a stored value. Returns false if the value is the
    /// wrong kind for the setting.
    pub fn apply_setting(&mut self, id: SettingsAccessorId, value: SettingValue) -> bool {
        match (id, value) {
            (SettingsAccessorId::AutoTareEnabled, SettingValue::Flag(enabled)) => {
                self.auto_tare_enabled = enabled
            }
            (SettingsAccessorId::ChannelMultiplier, SettingValue::Float(v)) => {
                self.channel_multiplier = v
            }
            (SettingsAccessorId::FallbackScale, SettingValue::Float(v)) => self.fallback_scale = v,
            (SettingsAccessorId::GracePeriodSeconds, SettingValue::Float(v)) => {
                self.grace_period = duration_from_secs_f32(v)
            }
            (SettingsAccessorId::NoiseThresholdGrams, SettingValue::Float(v)) => {
                self.noise_threshold_grams = v
            }
            (SettingsAccessorId::TouchThresholdGrams, SettingValue::Float(v)) => {
                self.touch_threshold_grams = v
            }
            (SettingsAccessorId::TouchTimeoutSeconds, SettingValue::Float(v)) => {
                self.touch_timeout = duration_from_secs_f32(v)
            }
            _ => {
                warn!("Setting {} cannot hold {:?}", id, value);
                return false;
            }
        }
        true
    }
}

pub fn clamp_touch_timeout(timeout: Duration) -> Duration {
    timeout.clamp(MIN_TOUCH_TIMEOUT, MAX_TOUCH_TIMEOUT)
}

pub fn clamp_grace_period(grace_period: Duration) -> Duration {
    if grace_period > MAX_GRACE_PERIOD {
        warn!(
            "Grace period of {} ms too long, using {} ms",
            grace_period.as_millis(),
            MAX_GRACE_PERIOD.as_millis()
        );
    }
    grace_period.min(MAX_GRACE_PERIOD)
}

pub fn clamp_auto_tare_debounce(debounce: Duration) -> Duration {
    debounce.min(MAX_AUTO_TARE_DEBOUNCE)
}

fn positive_or_default(name: &str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("Ignoring {} of {}, using {}", name, value, default);
        default
    }
}

pub(crate) fn non_negative_or_default(name: &str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("Ignoring {} of {}, using {}", name, value, default);
        default
    }
}
