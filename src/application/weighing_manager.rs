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

use crate::application::ticker::Ticker;
use crate::config::ScaleConfig;
use crate::error::{AcquisitionError, TimingError, WeighingError};
use crate::session_monitor::{SessionConfig, SessionMonitor, SessionState, SessionUpdate, SessionUpdates};
use crate::storage::settings::{SettingValue, SettingsAccessorId};
use crate::time::{duration_from_secs_f32, Clock, MonotonicClock};
use crate::weight::interface::force_touch::{ForceTouchSource, PressureEventDevice};
use crate::weight::interface::multitouch::{MultitouchDevice, MultitouchSource};
use crate::weight::interface::{
    sanitize_pressure, FrameOrigin, FrameReceiver, FrameSink, PressureFrame, PressureSource,
    SourceKind,
};
use crate::weight::messaging::{
    WeightChannel, WeightChannelPublisher, WeightChannelSubscriber, WeightEvents, WeightListener,
    WeightRequest, WeightSample,
};
use crate::weight::supervisor::{FallbackSupervisor, RunId, SourceSelection, SupervisorState};
use crate::weight::touch_aggregator::TouchAggregator;
use crate::weight::weight::{CalibrationState, WeightScale};
use crate::weight::WeighingSystem;
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, MutexGuard, PoisonError, Weak};

/// The two pressure sources the engine may use. Either may be missing on a
/// host that lacks the hardware.
#[derive(Default)]
pub struct SourceSet {
    pub high_fidelity: Option<Box<dyn PressureSource>>,
    pub fallback: Option<Box<dyn PressureSource>>,
}

impl SourceSet {
    /// Wraps the vendor devices in their pressure sources, using the channel
    /// multiplier and fallback scale from `config`.
    pub fn from_devices<M, P>(multitouch: Option<M>, pressure: Option<P>, config: &ScaleConfig) -> Self
    where
        M: MultitouchDevice + 'static,
        P: PressureEventDevice + 'static,
    {
        let config = config.validated();
        Self {
            high_fidelity: multitouch.map(|device| {
                Box::new(MultitouchSource::with_channel_multiplier(device, config.channel_multiplier))
                    as Box<dyn PressureSource>
            }),
            fallback: pressure.map(|device| {
                Box::new(ForceTouchSource::with_scale(device, config.fallback_scale))
                    as Box<dyn PressureSource>
            }),
        }
    }
}

/// Everything the frame path touches. Held only for short local updates,
/// never across a call into a device or a listener.
struct EngineState {
    supervisor: FallbackSupervisor,
    aggregator: TouchAggregator,
    scale: WeightScale,
    sessions: SessionMonitor,
    last_raw: f32,
    latest: Option<WeightSample>,
    /// No source could be acquired; poll emits zero samples instead.
    degraded: bool,
}

/// Parts that are only used while starting, stopping or switching sources.
struct Lifecycle {
    sources: SourceSet,
    ticker: Option<Ticker>,
}

impl Lifecycle {
    fn source(&mut self, kind: SourceKind) -> Option<&mut Box<dyn PressureSource>> {
        match kind {
            SourceKind::HighFidelity => self.sources.high_fidelity.as_mut(),
            SourceKind::Fallback => self.sources.fallback.as_mut(),
        }
    }
}

type StateMutex = Mutex<CriticalSectionRawMutex, RefCell<EngineState>>;

struct EngineShared {
    me: Weak<EngineShared>,
    clock: Arc<dyn Clock>,
    tick_interval: Option<Duration>,
    // Lock order: lifecycle, then state.
    lifecycle: std::sync::Mutex<Lifecycle>,
    state: StateMutex,
    channel: WeightChannel,
    listeners: Mutex<CriticalSectionRawMutex, RefCell<Vec<WeightListener>>>,
}

fn session_events(updates: &SessionUpdates) -> impl Iterator<Item = WeightEvents> + '_ {
    updates.iter().map(|update| match *update {
        SessionUpdate::Started(id) => WeightEvents::SessionStarted(id),
        SessionUpdate::Ended(id) => WeightEvents::SessionEnded(id),
        SessionUpdate::AutoTared(_) => WeightEvents::RequestCompleted(WeightRequest::Calibrate),
        SessionUpdate::AutoTareFailed(id) => WeightEvents::AutoTareFailed(id),
    })
}

impl EngineShared {
    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        self.state.lock(|state| f(&mut *state.borrow_mut()))
    }

    fn sink(&self, source: SourceKind, run: RunId) -> FrameSink {
        FrameSink::new(self.me.clone(), FrameOrigin { source, run })
    }

    fn publisher(&self) -> WeightChannelPublisher<'_> {
        self.channel.immediate_publisher()
    }

    fn publish(&self, event: WeightEvents) {
        self.publisher().publish_immediate(event);
        let listeners = self.listeners.lock(|listeners| listeners.borrow().clone());
        for listener in listeners {
            listener(&event);
        }
    }

    fn publish_all(&self, events: impl IntoIterator<Item = WeightEvents>) {
        for event in events {
            self.publish(event);
        }
    }

    fn zero_sample(&self, now: Instant) -> WeightSample {
        WeightSample {
            grams: 0.0,
            timestamp: now,
            captured_at: self.clock.wall_clock(),
            source: None,
        }
    }

    fn acquire(&self, lifecycle: &mut Lifecycle, kind: SourceKind, run: RunId) -> Result<(), AcquisitionError> {
        let sink = self.sink(kind, run);
        match lifecycle.source(kind) {
            Some(source) => source.acquire(sink),
            None => Err(AcquisitionError::DeviceUnavailable),
        }
    }

    fn ensure_ticker(&self, lifecycle: &mut Lifecycle) {
        let Some(interval) = self.tick_interval else {
            return;
        };
        if lifecycle.ticker.is_some() {
            return;
        }

        let engine = self.me.clone();
        match Ticker::every(interval, move || match engine.upgrade() {
            Some(engine) => {
                engine.poll();
                true
            }
            None => false,
        }) {
            Ok(ticker) => lifecycle.ticker = Some(ticker),
            Err(e) => error!("Could not start timer thread, timers need poll(): {}", e),
        }
    }

    /// Marks the run as failed with no usable source.
    fn enter_degraded(&self, run: RunId) -> SessionUpdates {
        self.with_state(|state| {
            state.supervisor.acquisition_failed(run);
            state.aggregator.clear();
            state.last_raw = 0.0;
            state.degraded = true;
            state.sessions.cancel()
        })
    }

    fn start(&self) -> Result<SourceSelection, AcquisitionError> {
        let mut lifecycle = self.lock_lifecycle();

        if let Some(selection) = self.with_state(|state| state.supervisor.selection()) {
            debug!("Already monitoring with {}", selection);
            return Ok(selection);
        }

        let run = self.with_state(|state| {
            state.degraded = false;
            state.aggregator.clear();
            state.last_raw = 0.0;
            state.supervisor.begin_run()
        });

        let selection = match self.acquire(&mut lifecycle, SourceKind::HighFidelity, run) {
            Ok(()) => {
                let now = self.clock.now();
                self.with_state(|state| state.supervisor.high_fidelity_acquired(run, now));
                SourceSelection::HighFidelityActive
            }
            Err(e) => {
                debug!("High fidelity source: {}", e);
                self.with_state(|state| state.supervisor.high_fidelity_failed(run));

                match self.acquire(&mut lifecycle, SourceKind::Fallback, run) {
                    Ok(()) => {
                        self.with_state(|state| state.supervisor.fallback_acquired(run));
                        SourceSelection::FallbackActive
                    }
                    Err(e) => {
                        error!("Fallback source: {}, no pressure source available", e);
                        let updates = self.enter_degraded(run);
                        self.ensure_ticker(&mut lifecycle);
                        drop(lifecycle);

                        self.publish_all(session_events(&updates));
                        self.publish(WeightEvents::MonitoringFailed(
                            AcquisitionError::PlatformUnsupported,
                        ));
                        return Err(AcquisitionError::PlatformUnsupported);
                    }
                }
            }
        };

        self.ensure_ticker(&mut lifecycle);
        drop(lifecycle);

        info!("Monitoring started with {}", selection);
        self.publish(WeightEvents::SourceChanged(selection));
        self.publish(WeightEvents::RequestCompleted(WeightRequest::StartMonitoring));
        Ok(selection)
    }

    fn stop(&self) {
        let mut guard = self.lock_lifecycle();
        let lifecycle = &mut *guard;

        let (held, was_running, updates) = self.with_state(|state| {
            let was_running = state.supervisor.is_active() || state.degraded;
            let held = state.supervisor.stop();
            state.aggregator.clear();
            state.degraded = false;
            (held, was_running, state.sessions.cancel())
        });

        if let Some(source) = held.and_then(|kind| lifecycle.source(kind)) {
            source.release();
        }
        for source in [
            lifecycle.sources.high_fidelity.as_mut(),
            lifecycle.sources.fallback.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            if source.is_acquired() {
                warn!("{} source still held at stop, releasing", source.kind());
                source.release();
            }
        }

        let ticker = lifecycle.ticker.take();
        drop(guard);
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        self.publish_all(session_events(&updates));
        if was_running {
            info!("Monitoring stopped");
            self.publish(WeightEvents::RequestCompleted(WeightRequest::StopMonitoring));
        }
    }

    /// Swaps a silent high fidelity source for the fallback.
    fn switch_to_fallback(&self, lifecycle: &mut Lifecycle, run: RunId) -> Vec<WeightEvents> {
        warn!("No high fidelity frames within the grace period, switching to fallback");
        if let Some(source) = lifecycle.source(SourceKind::HighFidelity) {
            source.release();
        }

        match self.acquire(lifecycle, SourceKind::Fallback, run) {
            Ok(()) => {
                self.with_state(|state| {
                    state.aggregator.clear();
                    state.supervisor.fallback_acquired(run)
                });
                vec![WeightEvents::SourceChanged(SourceSelection::FallbackActive)]
            }
            Err(e) => {
                error!("Fallback source: {}, no pressure source available", e);
                let updates = self.enter_degraded(run);
                let mut events: Vec<WeightEvents> = session_events(&updates).collect();
                events.push(WeightEvents::MonitoringFailed(AcquisitionError::PlatformUnsupported));
                events
            }
        }
    }

    /// Services the grace timer, the auto-tare debounce and the session
    /// timeout, and keeps the zero stream going when degraded.
    fn poll(&self) {
        let mut lifecycle = self.lock_lifecycle();
        let now = self.clock.now();

        let (grace, updates, zero) = self.with_state(|state| {
            let EngineState {
                supervisor,
                scale,
                sessions,
                last_raw,
                latest,
                degraded,
                ..
            } = state;

            let grace = supervisor.check_grace(now);
            let updates = sessions.poll(now, || {
                if supervisor.is_active() {
                    scale.tare(*last_raw);
                    Ok(())
                } else {
                    Err(WeighingError::AutoTareFailed)
                }
            });

            let zero = if *degraded {
                let sample = self.zero_sample(now);
                *latest = Some(sample);
                Some(sample)
            } else {
                None
            };
            (grace, updates, zero)
        });

        let mut events = Vec::new();
        if let Err(TimingError::GraceTimeout(run)) = grace {
            events = self.switch_to_fallback(&mut lifecycle, run);
        }
        drop(lifecycle);

        self.publish_all(session_events(&updates));
        self.publish_all(events);
        if let Some(sample) = zero {
            self.publish(WeightEvents::WeightUpdate(sample));
        }
    }

    fn calibrate(&self) -> CalibrationState {
        let (calibration, applied) = self.with_state(|state| {
            if state.degraded || !state.supervisor.is_active() {
                (state.scale.calibration(), false)
            } else {
                let raw = state.last_raw;
                (state.scale.tare(raw), true)
            }
        });

        if applied {
            info!("Calibrated, offset {} g", calibration.offset_grams);
            self.publish(WeightEvents::RequestCompleted(WeightRequest::Calibrate));
        } else {
            debug!("Calibrate ignored, no source is active");
        }
        calibration
    }
}

impl FrameReceiver for EngineShared {
    fn receive_frame(&self, origin: FrameOrigin, frame: PressureFrame) {
        let now = self.clock.now();
        let captured_at = self.clock.wall_clock();

        let processed = self.with_state(|state| {
            if state.degraded || !state.supervisor.accept_frame(origin) {
                return None;
            }

            let raw = match &frame {
                PressureFrame::Contacts(contacts) => state.aggregator.process_frame(contacts),
                PressureFrame::Scalar(grams) => sanitize_pressure(*grams),
            };
            state.last_raw = raw;

            let sample = WeightSample {
                grams: state.scale.reported_weight(raw),
                timestamp: now,
                captured_at,
                source: Some(origin.source),
            };
            state.latest = Some(sample);
            Some((sample, state.sessions.on_sample(sample.grams, now)))
        });

        match processed {
            Some((sample, updates)) => {
                trace!("Sample {} g from {}", sample.grams, origin.source);
                self.publish(WeightEvents::WeightUpdate(sample));
                self.publish_all(session_events(&updates));
            }
            None => trace!("Dropped frame from {} (run {})", origin.source, origin.run.value()),
        }
    }
}

/// Public face of the engine. Safe to share between threads; every method
/// takes `&self`.
pub struct WeighingManager {
    engine: Arc<EngineShared>,
}

impl WeighingManager {
    pub fn new(config: ScaleConfig, sources: SourceSet) -> Self {
        Self::with_clock(config, sources, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: ScaleConfig, sources: SourceSet, clock: Arc<dyn Clock>) -> Self {
        let config = config.validated();
        let state = EngineState {
            supervisor: FallbackSupervisor::new(config.grace_period),
            aggregator: TouchAggregator::new(),
            scale: WeightScale::new(config.noise_threshold_grams),
            sessions: SessionMonitor::new(SessionConfig::from(&config)),
            last_raw: 0.0,
            latest: None,
            degraded: false,
        };

        let engine = Arc::new_cyclic(|me| EngineShared {
            me: me.clone(),
            clock,
            tick_interval: config.tick_interval,
            lifecycle: std::sync::Mutex::new(Lifecycle {
                sources,
                ticker: None,
            }),
            state: Mutex::new(RefCell::new(state)),
            channel: WeightChannel::new(),
            listeners: Mutex::new(RefCell::new(Vec::new())),
        });
        Self { engine }
    }

    /// Starts delivering samples. Calling it while already monitoring returns
    /// the current selection. Fails with
    /// [`AcquisitionError::PlatformUnsupported`] when neither source can be
    /// acquired; the manager then emits zero samples until stopped.
    pub fn start_monitoring(&self) -> Result<SourceSelection, AcquisitionError> {
        self.engine.start()
    }

    /// Releases the active source and cancels every pending timer. Safe to
    /// call in any state, any number of times.
    pub fn stop_monitoring(&self) {
        self.engine.stop()
    }

    /// Makes the current raw reading the zero point. Does nothing unless a
    /// source is active. Returns the calibration in force afterwards.
    pub fn calibrate(&self) -> CalibrationState {
        self.engine.calibrate()
    }

    /// Runs any timer that is due. Called by the ticker thread, or by hand
    /// when the tick interval is disabled.
    pub fn poll(&self) {
        self.engine.poll()
    }

    pub fn current_weight(&self) -> Option<WeightSample> {
        self.engine.with_state(|state| state.latest)
    }

    pub fn calibration(&self) -> CalibrationState {
        self.engine.with_state(|state| state.scale.calibration())
    }

    pub fn source_selection(&self) -> Option<SourceSelection> {
        self.engine.with_state(|state| state.supervisor.selection())
    }

    pub fn supervisor_state(&self) -> SupervisorState {
        self.engine.with_state(|state| state.supervisor.state())
    }

    pub fn session(&self) -> Option<SessionState> {
        self.engine.with_state(|state| state.sessions.session())
    }

    pub fn is_degraded(&self) -> bool {
        self.engine.with_state(|state| state.degraded)
    }

    pub fn subscribe(&self) -> Result<WeightChannelSubscriber<'_>, WeighingError> {
        self.engine
            .channel
            .subscriber()
            .map_err(|_| WeighingError::MaximumSubscribersReached)
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&WeightEvents) + Send + Sync + 'static,
    {
        let listener: WeightListener = Arc::new(listener);
        self.engine
            .listeners
            .lock(|listeners| listeners.borrow_mut().push(listener));
    }

    pub fn set_noise_threshold_grams(&self, threshold: f32) {
        self.engine
            .with_state(|state| state.scale.set_noise_threshold_grams(threshold));
    }

    pub fn set_touch_threshold_grams(&self, threshold: f32) {
        self.engine
            .with_state(|state| state.sessions.set_touch_threshold_grams(threshold));
    }

    /// Clamped into the allowed touch timeout range.
    pub fn set_touch_timeout(&self, timeout: Duration) {
        self.engine
            .with_state(|state| state.sessions.set_touch_timeout(timeout));
    }

    pub fn set_auto_tare_enabled(&self, enabled: bool) {
        self.engine
            .with_state(|state| state.sessions.set_auto_tare_enabled(enabled));
    }

    /// Used from the next start.
    pub fn set_grace_period(&self, grace_period: Duration) {
        self.engine
            .with_state(|state| state.supervisor.set_grace_period(grace_period));
    }

    /// Applies a changed setting from the settings channel. Settings that
    /// belong to source construction are not applied at runtime; returns
    /// false for those and for values of the wrong kind.
    pub fn apply_setting(&self, id: SettingsAccessorId, value: SettingValue) -> bool {
        match (id, value) {
            (SettingsAccessorId::NoiseThresholdGrams, SettingValue::Float(v)) => {
                self.set_noise_threshold_grams(v)
            }
            (SettingsAccessorId::TouchThresholdGrams, SettingValue::Float(v)) => {
                self.set_touch_threshold_grams(v)
            }
            (SettingsAccessorId::TouchTimeoutSeconds, SettingValue::Float(v)) => {
                self.set_touch_timeout(duration_from_secs_f32(v))
            }
            (SettingsAccessorId::GracePeriodSeconds, SettingValue::Float(v)) => {
                self.set_grace_period(duration_from_secs_f32(v))
            }
            (SettingsAccessorId::AutoTareEnabled, SettingValue::Flag(enabled)) => {
                self.set_auto_tare_enabled(enabled)
            }
            _ => {
                debug!("Setting {} not applied at runtime", id);
                return false;
            }
        }
        true
    }
}

impl Drop for WeighingManager {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

impl WeighingSystem for WeighingManager {
    type Error = WeighingError;

    async fn start_monitoring(&mut self) -> Result<SourceSelection, Self::Error> {
        Ok(WeighingManager::start_monitoring(self)?)
    }

    async fn stop_monitoring(&mut self) {
        WeighingManager::stop_monitoring(self)
    }

    async fn calibrate(&mut self) -> Result<CalibrationState, Self::Error> {
        Ok(WeighingManager::calibrate(self))
    }

    async fn get_instantaneous_weight_grams(&mut self) -> Result<f32, Self::Error> {
        Ok(self.current_weight().map_or(0.0, |sample| sample.grams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use crate::weight::interface::multitouch::RawContact;
    use crate::weight::interface::simulated::{SimulatedForceTouch, SimulatedTrackpad};
    use approx::assert_abs_diff_eq;

    fn manual_config() -> ScaleConfig {
        ScaleConfig {
            tick_interval: None,
            ..Default::default()
        }
    }

    fn simulated(
        trackpad: &SimulatedTrackpad,
        force_touch: &SimulatedForceTouch,
    ) -> SourceSet {
        SourceSet::from_devices(
            Some(trackpad.clone()),
            Some(force_touch.clone()),
            &manual_config(),
        )
    }

    #[test]
    fn trackpad_frames_become_samples() {
        let trackpad = SimulatedTrackpad::built_in();
        let force_touch = SimulatedForceTouch::supported();
        let clock = Arc::new(ManualClock::new());
        let manager =
            WeighingManager::with_clock(manual_config(), simulated(&trackpad, &force_touch), clock);

        assert_eq!(
            manager.start_monitoring(),
            Ok(SourceSelection::HighFidelityActive)
        );
        trackpad.emit(
            &[RawContact::touching(1, 5.0), RawContact::touching(2, 3.0)],
            0.0,
        );
        let sample = manager.current_weight().unwrap();
        assert_abs_diff_eq!(sample.grams, 8.0);
        assert_eq!(sample.source, Some(SourceKind::HighFidelity));
    }

    #[test]
    fn calibrate_zeroes_current_load() {
        let trackpad = SimulatedTrackpad::built_in();
        let force_touch = SimulatedForceTouch::supported();
        let manager = WeighingManager::with_clock(
            manual_config(),
            simulated(&trackpad, &force_touch),
            Arc::new(ManualClock::new()),
        );
        manager.start_monitoring().unwrap();

        trackpad.emit(&[RawContact::touching(1, 12.0)], 0.0);
        assert_eq!(manager.calibrate().offset_grams, 12.0);

        trackpad.emit(&[RawContact::touching(1, 12.0)], 0.1);
        assert_eq!(manager.current_weight().unwrap().grams, 0.0);

        trackpad.emit(&[RawContact::touching(1, 62.0)], 0.2);
        assert_abs_diff_eq!(manager.current_weight().unwrap().grams, 50.0);
    }

    #[test]
    fn calibrate_with_nothing_touching_captures_zero() {
        let trackpad = SimulatedTrackpad::built_in();
        let force_touch = SimulatedForceTouch::supported();
        let manager = WeighingManager::with_clock(
            manual_config(),
            simulated(&trackpad, &force_touch),
            Arc::new(ManualClock::new()),
        );
        manager.start_monitoring().unwrap();
        trackpad.emit(&[RawContact::touching(1, 12.0)], 0.0);
        trackpad.emit(&[], 0.1);

        assert_eq!(manager.calibrate().offset_grams, 0.0);
    }

    #[test]
    fn calibrate_before_start_is_a_no_op() {
        let manager = WeighingManager::with_clock(
            manual_config(),
            SourceSet::default(),
            Arc::new(ManualClock::new()),
        );
        assert_eq!(manager.calibrate(), CalibrationState::default());
        assert_eq!(manager.supervisor_state(), SupervisorState::Unstarted);
    }

    #[test]
    fn settings_changes_apply_at_runtime() {
        let manager = WeighingManager::with_clock(
            manual_config(),
            SourceSet::default(),
            Arc::new(ManualClock::new()),
        );
        assert!(manager.apply_setting(
            SettingsAccessorId::AutoTareEnabled,
            SettingValue::Flag(true)
        ));
        assert!(!manager.apply_setting(
            SettingsAccessorId::FallbackScale,
            SettingValue::Float(300.0)
        ));
        assert!(!manager.apply_setting(
            SettingsAccessorId::AutoTareEnabled,
            SettingValue::Float(1.0)
        ));
    }

    #[test]
    fn listeners_see_samples() {
        let trackpad = SimulatedTrackpad::built_in();
        let force_touch = SimulatedForceTouch::supported();
        let manager = WeighingManager::with_clock(
            manual_config(),
            simulated(&trackpad, &force_touch),
            Arc::new(ManualClock::new()),
        );
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        manager.add_listener(move |event| {
            if let WeightEvents::WeightUpdate(sample) = event {
                sink.lock().unwrap().push(sample.grams);
            }
        });

        manager.start_monitoring().unwrap();
        trackpad.emit(&[RawContact::touching(1, 2.0)], 0.0);
        trackpad.emit(&[RawContact::touching(1, 2.0)], 0.1);

        assert_eq!(*seen.lock().unwrap(), vec![2.0, 2.0]);
    }
}
