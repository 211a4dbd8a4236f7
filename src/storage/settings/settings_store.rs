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

use crate::storage::settings::messaging::{
    SettingData, SettingsChannel, SettingsChannelSubscriber, SettingsMessage,
};
use crate::storage::settings::{
    check_setting, SettingError, SettingValue, SettingsAccessor, SettingsAccessorId,
};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::FnvIndexMap;
use log::{debug, warn};
use strum::EnumCount;

const SETTINGS_CAPACITY: usize = SettingsAccessorId::COUNT.next_power_of_two();

/// Process-lifetime settings cache. Whoever owns persistence loads it at
/// start up and writes it back out; every save is announced on the settings
/// channel.
pub struct SettingsStore {
    settings_cache:
        Mutex<CriticalSectionRawMutex, RefCell<FnvIndexMap<SettingsAccessorId, SettingValue, SETTINGS_CAPACITY>>>,
    channel: SettingsChannel,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            settings_cache: Mutex::new(RefCell::new(FnvIndexMap::new())),
            channel: SettingsChannel::new(),
        }
    }

    pub fn subscribe(&self) -> Result<SettingsChannelSubscriber<'_>, SettingError> {
        self.channel
            .subscriber()
            .map_err(|_| SettingError::MaximumSubscribersReached)
    }

    pub fn len(&self) -> usize {
        self.settings_cache.lock(|cache| cache.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsAccessor for SettingsStore {
    type Error = SettingError;

    fn get_setting(&self, id: SettingsAccessorId) -> Option<SettingValue> {
        self.settings_cache
            .lock(|cache| cache.borrow().get(&id).copied())
    }

    fn save_setting(&self, id: SettingsAccessorId, value: SettingValue) -> Result<(), Self::Error> {
        check_setting(id, value).inspect_err(|e| warn!("Rejected setting: {}", e))?;

        let changed = self.settings_cache.lock(|cache| {
            let mut cache = cache.borrow_mut();
            let previous = cache.get(&id).copied();
            cache
                .insert(id, value)
                .map(|_| previous != Some(value))
                .map_err(|_| SettingError::StoreFull)
        })?;

        if changed {
            debug!("Setting {} = {:?}", id, value);
            self.channel
                .immediate_publisher()
                .publish_immediate(SettingsMessage::Change(SettingData {
                    setting_id: id,
                    value,
                }));
        }
        Ok(())
    }
}
