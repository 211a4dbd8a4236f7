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
use core::fmt::Debug;
use strum::{Display, EnumCount, EnumIter};
use thiserror::Error;

pub mod messaging;
pub mod settings_store;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SettingError {
    #[error("setting {0} does not take that kind of value")]
    WrongValueKind(SettingsAccessorId),
    #[error("value {1} is outside the range allowed for {0}")]
    OutOfRange(SettingsAccessorId, f32),
    #[error("settings store is full")]
    StoreFull,
    #[error("maximum number of settings subscribers reached")]
    MaximumSubscribersReached,
}

pub struct NumericSettingProperties<T> {
    pub minimum_value: T,
    pub maximum_value: T,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumCount, EnumIter, Display)]
pub enum SettingsAccessorId {
    ChannelMultiplier,
    FallbackScale,
    GracePeriodSeconds,
    NoiseThresholdGrams,
    TouchThresholdGrams,
    AutoTareEnabled,
    TouchTimeoutSeconds,
}

impl SettingsAccessorId {
    pub fn get_numeric_properties(&self) -> Option<NumericSettingProperties<f32>> {
        match self {
            SettingsAccessorId::TouchTimeoutSeconds => Some(NumericSettingProperties::<f32> {
                minimum_value: 1.0,
                maximum_value: 30.0,
            }),
            SettingsAccessorId::GracePeriodSeconds => Some(NumericSettingProperties::<f32> {
                minimum_value: 0.0,
                maximum_value: 60.0,
            }),
            SettingsAccessorId::AutoTareEnabled => None,
            _ => Some(NumericSettingProperties::<f32> {
                minimum_value: 0.0,
                maximum_value: f32::MAX,
            }),
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, SettingsAccessorId::AutoTareEnabled)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SettingValue {
    Float(f32),
    Flag(bool),
}

impl SettingValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            SettingValue::Float(v) => Some(*v),
            SettingValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(v) => Some(*v),
            SettingValue::Float(_) => None,
        }
    }
}

/// Checks that `value` is the right kind for `id` and inside its range.
pub fn check_setting(id: SettingsAccessorId, value: SettingValue) -> Result<(), SettingError> {
    match (id.is_flag(), value) {
        (true, SettingValue::Flag(_)) => Ok(()),
        (false, SettingValue::Float(v)) => match id.get_numeric_properties() {
            Some(range)
                if !v.is_finite() || v < range.minimum_value || v > range.maximum_value =>
            {
                Err(SettingError::OutOfRange(id, v))
            }
            _ => Ok(()),
        },
        _ => Err(SettingError::WrongValueKind(id)),
    }
}

pub trait SettingsAccessor {
    type Error: Debug;

    /// Returns the stored value, or None if the setting has never been saved.
    fn get_setting(&self, id: SettingsAccessorId) -> Option<SettingValue>;

    /// Saves a setting and notifies interested parties that it changed.
    fn save_setting(&self, id: SettingsAccessorId, value: SettingValue)
    -> Result<(), Self::Error>;
}
