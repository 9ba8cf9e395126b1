//! Interpolation control loop
//!
//! Owns one [`DeviceInterpolator`] per input device and, once per display
//! frame, emits the events interpolated at a latency-adjusted point in time.
//!
//! # State machine
//!
//! ```text
//!            first routed event
//!  INACTIVE ───────────────────────> ACTIVE
//!     ^    subscribe + begin_updating   │
//!     │                                 │ tick: every device Done or Timeout
//!     └─────────────────────────────────┘
//!          end_updating + unsubscribe
//! ```
//!
//! # Latency offset
//!
//! The interpolation point trails the frame time by a single global offset.
//! It starts at whatever the first tick needs, then only grows: by at most
//! half a frame per tick, up to a soft limit derived from the display and
//! input rates, and never past `max_offset_ms`. A constant offset keeps the
//! interpolation point advancing at the display rate, which is what makes
//! the output look smooth. It resets when the control goes inactive.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::clock::{EventSink, FrameClock, TickSubscription};
use super::device::{DeviceInterpolator, DeviceStatus, FrameContext};
use super::stats::InterpolationStats;
use crate::config::InterpolationConfig;
use crate::event::{DeviceId, Event};
use crate::interpolation::{ExtrapolationStrategy, HoldLastValue, Result};

/// Per-window input event interpolation control
#[derive(Debug)]
pub struct InterpolationControl {
    config: InterpolationConfig,
    strategy: Arc<dyn ExtrapolationStrategy>,
    devices: HashMap<DeviceId, DeviceInterpolator>,

    /// Current latency offset (ms), `None` until the first tick computes one
    offset_ms: Option<i64>,
    offset_target_ms: Option<i64>,

    /// 0 until the first tick of a session
    previous_frame_time: i64,
    previous_wall_time: i64,
    previous_interpolation_point: i64,

    subscription: Option<TickSubscription>,
    stats: InterpolationStats,
}

impl Default for InterpolationControl {
    fn default() -> Self {
        Self::new(InterpolationConfig::default())
    }
}

impl InterpolationControl {
    /// Create an inactive control that holds the last value past the newest
    /// sample
    pub fn new(config: InterpolationConfig) -> Self {
        Self::with_strategy(config, Arc::new(HoldLastValue))
    }

    /// Create an inactive control with a custom extrapolation strategy
    pub fn with_strategy(
        config: InterpolationConfig,
        strategy: Arc<dyn ExtrapolationStrategy>,
    ) -> Self {
        debug!(
            "Interpolation control created (max offset {}ms, extrapolation: {})",
            config.max_offset_ms,
            strategy.name()
        );

        Self {
            config,
            strategy,
            devices: HashMap::new(),
            offset_ms: None,
            offset_target_ms: None,
            previous_frame_time: 0,
            previous_wall_time: 0,
            previous_interpolation_point: 0,
            subscription: None,
            stats: InterpolationStats::default(),
        }
    }

    /// Ingest a raw event from the platform
    ///
    /// Activates the control if needed, then routes the event to its
    /// device's newest gesture.
    pub fn add_event(&mut self, event: &Event, clock: &mut dyn FrameClock) -> Result<()> {
        if self.subscription.is_none() {
            self.start_ticking(clock);
        }

        let frame_counter = clock.frame_counter();
        let wall_time = clock.monotonic_time();
        let device = event.device();

        let config = &self.config;
        let strategy = &self.strategy;
        let result = self
            .devices
            .entry(device)
            .or_insert_with(|| {
                debug!("Tracking new input device {}", device);
                DeviceInterpolator::new(device, config.clone(), Arc::clone(strategy))
            })
            .route_event(event, frame_counter, wall_time);

        match result {
            Ok(()) => self.stats.events_routed += 1,
            Err(_) => self.stats.contract_violations += 1,
        }
        result
    }

    /// Per-frame callback, run by the frame clock owner before painting
    ///
    /// Does nothing while inactive.
    pub fn tick(&mut self, clock: &mut dyn FrameClock, sink: &mut dyn EventSink) {
        if self.subscription.is_none() {
            trace!("Tick while inactive ignored");
            return;
        }
        self.stats.ticks += 1;

        let frame_counter = clock.frame_counter();
        let frame_time = clock.frame_time();
        let wall_time = clock.monotonic_time();
        let refresh_interval = clock.refresh_interval(self.previous_frame_time);

        self.update_offset(frame_counter, frame_time, wall_time, refresh_interval);

        let interpolation_point = frame_time - self.offset_ms.unwrap_or(0) * 1000;
        if self.previous_frame_time != 0 && interpolation_point < self.previous_interpolation_point {
            warn!(
                "Interpolation point went backwards: {}us -> {}us",
                self.previous_interpolation_point, interpolation_point
            );
        }

        let frame = FrameContext {
            interpolation_point,
            previous_interpolation_point: self.previous_interpolation_point,
            frame_counter,
            frame_time,
            wall_time,
            refresh_interval,
            first_tick: self.previous_frame_time == 0,
        };

        let mut ongoing = false;
        let stats = &mut self.stats;
        self.devices.retain(|device, interpolator| {
            match interpolator.drain_one_frame(&frame, sink, stats) {
                DeviceStatus::Done => {
                    debug!("{} finished all gestures", device);
                    false
                }
                DeviceStatus::Ongoing => {
                    ongoing = true;
                    true
                }
                DeviceStatus::Timeout => true,
            }
        });

        if !ongoing {
            self.stop_ticking(clock);
        }

        self.previous_frame_time = frame_time;
        self.previous_wall_time = wall_time;
        self.previous_interpolation_point = interpolation_point;
    }

    /// Detach from the frame clock and discard all device state
    ///
    /// Queued samples are not drained. Safe to call repeatedly.
    pub fn teardown(&mut self, clock: &mut dyn FrameClock) {
        self.stop_ticking(clock);
        if !self.devices.is_empty() {
            debug!("Discarding {} device interpolators", self.devices.len());
        }
        self.devices.clear();
    }

    /// Whether the control is subscribed to frame ticks
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Current latency offset (ms), `None` before the first tick of a session
    pub fn global_offset_ms(&self) -> Option<i64> {
        self.offset_ms
    }

    /// Latency offset the control is easing towards (ms)
    pub fn global_offset_target_ms(&self) -> Option<i64> {
        self.offset_target_ms
    }

    /// Wall time (µs) of the previous tick in this session
    pub fn last_tick_wall_time(&self) -> Option<i64> {
        (self.previous_frame_time != 0).then_some(self.previous_wall_time)
    }

    /// Number of devices with queued gestures or idle state
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Interpolator of a device, if tracked
    pub fn device(&self, device: DeviceId) -> Option<&DeviceInterpolator> {
        self.devices.get(&device)
    }

    /// Counters since creation or the last [`reset_stats`](Self::reset_stats)
    pub fn stats(&self) -> &InterpolationStats {
        &self.stats
    }

    /// Zero all counters
    pub fn reset_stats(&mut self) {
        self.stats = InterpolationStats::default();
    }

    /// Active configuration
    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    fn start_ticking(&mut self, clock: &mut dyn FrameClock) {
        // Input resumed after an idle period or all gestures finished, so the
        // latency estimate starts over
        self.offset_ms = None;
        self.offset_target_ms = None;
        self.previous_frame_time = 0;
        self.previous_wall_time = 0;
        self.previous_interpolation_point = 0;

        self.subscription = Some(clock.subscribe_before_paint());
        clock.begin_updating();
        self.stats.sessions_started += 1;

        debug!("Interpolation activated");
    }

    fn stop_ticking(&mut self, clock: &mut dyn FrameClock) {
        if let Some(subscription) = self.subscription.take() {
            clock.end_updating();
            clock.unsubscribe(subscription);
            debug!(
                "Interpolation deactivated (offset {:?}ms)",
                self.offset_ms
            );
        }
    }

    fn update_offset(
        &mut self,
        frame_counter: i64,
        frame_time: i64,
        wall_time: i64,
        refresh_interval: i64,
    ) {
        let mut max_event_interval_us = 0;
        for interpolator in self.devices.values_mut() {
            interpolator.update_target_offset(frame_counter, frame_time, wall_time);
            max_event_interval_us = max_event_interval_us.max(interpolator.event_interval_us());

            if let Some(device_target) = interpolator.target_offset_ms() {
                let global = self.offset_target_ms.map_or(device_target, |t| t.max(device_target));
                self.offset_target_ms = Some(global);
            }
        }

        let Some(mut target) = self.offset_target_ms else {
            return;
        };
        target = target.min(i64::from(self.config.max_offset_ms));

        let current = match self.offset_ms {
            Some(current) if current >= target => {
                self.offset_target_ms = Some(target);
                return;
            }
            Some(current) if self.previous_frame_time != 0 => current,
            _ => {
                // Nothing on screen yet that could jump back
                self.offset_ms = Some(target);
                self.offset_target_ms = Some(target);
                debug!("Latency offset set to {}ms", target);
                return;
            }
        };

        let frame_ms = (refresh_interval / 1000).max(1);
        let soft_limit = (i64::from(self.config.offset_max_display_frames) * frame_ms).max(
            i64::from(self.config.offset_max_event_frames) * (max_event_interval_us / 1000),
        );
        target = target.min(soft_limit);
        self.offset_target_ms = Some(target);

        // At most half a frame per tick, so already painted motion never
        // appears to jump back
        let delta = target - current;
        let step = delta.signum() * delta.abs().min((frame_ms / 2).max(1));
        if step != 0 {
            self.offset_ms = Some(current + step);
            debug!(
                "Latency offset {}ms -> {}ms (target {}ms)",
                current,
                current + step,
                target
            );
        }
    }
}
