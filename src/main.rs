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

//! Runs the weighing engine against simulated devices and replays a press,
//! hold and release on the trackpad.
//!
//! `--log-level <level>` sets verbosity, `--silent-trackpad` makes the
//! multitouch device deliver nothing so the engine falls back to force touch,
//! `--unsupported` leaves the host with no usable device at all.

use embassy_futures::block_on;
use log::LevelFilter;
use std::error::Error;
use std::thread;
use std::time::Duration as StdDuration;
use trackweight::config::DEFAULT_FALLBACK_SCALE;
use trackweight::storage::settings::settings_store::SettingsStore;
use trackweight::storage::settings::messaging::SettingsMessage;
use trackweight::storage::settings::{SettingValue, SettingsAccessor, SettingsAccessorId};
use trackweight::weight::interface::multitouch::{DeviceClass, RawContact};
use trackweight::weight::interface::simulated::{SimulatedForceTouch, SimulatedTrackpad};
use trackweight::{ScaleConfig, SourceSet, WeighingManager, WeighingSystem, WeightEvents};

const FRAME_PERIOD: StdDuration = StdDuration::from_millis(20);

/// Grams on the pad for each frame of the replay: empty, a cup placed, held,
/// topped up, then lifted off.
fn press_profile() -> Vec<f32> {
    let mut profile = vec![0.0; 10];
    profile.extend((1..=10).map(|step| step as f32 * 18.0));
    profile.extend(vec![180.0; 40]);
    profile.extend(vec![240.0; 40]);
    profile.extend(vec![0.0; 20]);
    profile
}

struct SimulatedHardware {
    trackpad: SimulatedTrackpad,
    force_touch: SimulatedForceTouch,
    silent_trackpad: bool,
    frame: u32,
}

impl SimulatedHardware {
    fn press(&mut self, grams: f32) {
        let timestamp = self.frame as f64 * FRAME_PERIOD.as_secs_f64();
        self.frame += 1;

        if !self.silent_trackpad {
            let contact = [RawContact::touching(1, grams)];
            let contacts = if grams > 0.0 { &contact[..] } else { &[] };
            self.trackpad.emit(contacts, timestamp);
        }
        self.force_touch.emit(grams / DEFAULT_FALLBACK_SCALE);
    }
}

async fn weigh<WS>(scale: &mut WS, hardware: &mut SimulatedHardware) -> Result<(), WS::Error>
where
    WS: WeighingSystem,
{
    match scale.start_monitoring().await {
        Ok(selection) => log::info!("Weighing with {}", selection),
        Err(_) => log::warn!("No pressure source, weight will read zero"),
    }

    for grams in press_profile() {
        hardware.press(grams);
        thread::sleep(FRAME_PERIOD);
    }

    let reading = scale.get_instantaneous_weight_grams().await?;
    log::info!("Reading after release: {:.1} g", reading);

    let calibration = scale.calibrate().await?;
    log::info!("Zero point now {:.1} g", calibration.offset_grams);

    scale.stop_monitoring().await;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let log_level = parse_log_level(&args);

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Trackpad weighing engine demo");

    let silent_trackpad = args.iter().any(|a| a == "--silent-trackpad");
    let unsupported = args.iter().any(|a| a == "--unsupported");

    let settings = SettingsStore::new();
    let mut setting_changes = settings.subscribe()?;
    settings.save_setting(SettingsAccessorId::AutoTareEnabled, SettingValue::Flag(true))?;
    settings.save_setting(SettingsAccessorId::GracePeriodSeconds, SettingValue::Float(0.5))?;
    let config = ScaleConfig::load_from(&settings);

    let mut hardware = SimulatedHardware {
        trackpad: if unsupported {
            SimulatedTrackpad::with_class(Some(DeviceClass::Mouse))
        } else {
            SimulatedTrackpad::built_in()
        },
        force_touch: if unsupported {
            SimulatedForceTouch::unsupported()
        } else {
            SimulatedForceTouch::supported()
        },
        silent_trackpad,
        frame: 0,
    };

    let sources = SourceSet::from_devices(
        Some(hardware.trackpad.clone()),
        Some(hardware.force_touch.clone()),
        &config,
    );
    let mut manager = WeighingManager::new(config, sources);

    manager.add_listener(|event| match event {
        WeightEvents::WeightUpdate(sample) => {
            log::debug!("{:.1} g at {}", sample.grams, sample.captured_at.format("%H:%M:%S%.3f"))
        }
        other => log::info!("{:?}", other),
    });

    // A collaborator changing a setting while the engine runs.
    settings.save_setting(SettingsAccessorId::NoiseThresholdGrams, SettingValue::Float(0.5))?;
    while let Some(SettingsMessage::Change(change)) = setting_changes.try_next_message_pure() {
        manager.apply_setting(change.setting_id, change.value);
    }

    block_on(weigh(&mut manager, &mut hardware))?;

    if let Some(session) = manager.session() {
        log::info!(
            "Last session {} lasted {} ms",
            session.session_id,
            session
                .last_active_at
                .saturating_duration_since(session.started_at)
                .as_millis()
        );
    }
    Ok(())
}

fn parse_log_level(args: &[String]) -> LevelFilter {
    let Some(level) = args
        .windows(2)
        .find(|pair| pair[0] == "--log-level")
        .map(|pair| &pair[1])
    else {
        return LevelFilter::Info;
    };

    level.parse().unwrap_or_else(|_| {
        eprintln!("Unknown log level: {}. Using INFO", level);
        LevelFilter::Info
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn log_level_flag_is_case_insensitive() {
        assert_eq!(
            parse_log_level(&args(&["trackweight", "--log-level", "debug"])),
            LevelFilter::Debug
        );
        assert_eq!(
            parse_log_level(&args(&["trackweight", "--log-level", "WARN"])),
            LevelFilter::Warn
        );
    }

    #[test]
    fn missing_or_unknown_log_level_is_info() {
        assert_eq!(parse_log_level(&args(&["trackweight"])), LevelFilter::Info);
        assert_eq!(
            parse_log_level(&args(&["trackweight", "--log-level", "loud"])),
            LevelFilter::Info
        );
        assert_eq!(
            parse_log_level(&args(&["trackweight", "--log-level"])),
            LevelFilter::Info
        );
    }
}
