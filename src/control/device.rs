//! Per-device gesture queue
//!
//! Each input device gets a queue of gesture histories. Events from the
//! platform are pushed to the newest gesture; interpolated events are drained
//! from the oldest. Usually both are the same gesture, but a new gesture can
//! start while the previous one is still draining, e.g. when the latency
//! offset is large and the user flicks twice in quick succession.
//!
//! ```text
//!  drain <── [gesture 0 (stopped)] [gesture 1 (stopped)] [gesture 2 (open)] <── route
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use super::clock::EventSink;
use super::stats::InterpolationStats;
use crate::config::InterpolationConfig;
use crate::event::{DeviceId, Event, GestureRole};
use crate::interpolation::{EventHistory, ExtrapolationStrategy, InterpolationError, Result};

/// Outcome of draining a device for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Samples or markers remain to be emitted
    Ongoing,
    /// The device went idle; its history was reset
    Timeout,
    /// Every gesture finished; the device can be dropped
    Done,
}

/// Timing of the frame being drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// Latency-adjusted interpolation point (µs)
    pub interpolation_point: i64,
    /// Interpolation point of the previous tick (µs), 0 on the first tick
    pub previous_interpolation_point: i64,
    /// Consecutive id of the frame
    pub frame_counter: i64,
    /// Presentation time of the frame (µs)
    pub frame_time: i64,
    /// Wall time when the tick started (µs)
    pub wall_time: i64,
    /// Display refresh interval (µs)
    pub refresh_interval: i64,
    /// First tick since the control became active
    pub first_tick: bool,
}

/// Convert a microsecond time to fractional milliseconds
pub(crate) fn us_to_ms(micros: i64) -> f64 {
    micros as f64 / 1000.0
}

/// Gesture queue and arrival statistics of one input device
#[derive(Debug)]
pub struct DeviceInterpolator {
    device: DeviceId,
    gestures: VecDeque<EventHistory>,
    last_frame_with_event: i64,
    last_wall_time_with_event: i64,
    event_interval_us: i64,
    target_offset_ms: Option<i64>,
    /// Set by an idle timeout, cleared by the next update
    idle: bool,
    config: InterpolationConfig,
    strategy: Arc<dyn ExtrapolationStrategy>,
}

impl DeviceInterpolator {
    /// Create an interpolator with an empty gesture queue
    pub fn new(
        device: DeviceId,
        config: InterpolationConfig,
        strategy: Arc<dyn ExtrapolationStrategy>,
    ) -> Self {
        Self {
            device,
            gestures: VecDeque::new(),
            last_frame_with_event: 0,
            last_wall_time_with_event: 0,
            event_interval_us: 0,
            target_offset_ms: None,
            idle: false,
            config,
            strategy,
        }
    }

    /// Device this interpolator belongs to
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Number of queued gestures
    pub fn gesture_count(&self) -> usize {
        self.gestures.len()
    }

    /// Oldest (draining) gesture
    pub fn draining_gesture(&self) -> Option<&EventHistory> {
        self.gestures.front()
    }

    /// Newest (accumulating) gesture
    pub fn accumulating_gesture(&self) -> Option<&EventHistory> {
        self.gestures.back()
    }

    /// Estimated input event interval (µs), 0 until known
    pub fn event_interval_us(&self) -> i64 {
        self.event_interval_us
    }

    /// Latency offset this device needs (ms), `None` until known
    pub fn target_offset_ms(&self) -> Option<i64> {
        self.target_offset_ms
    }

    /// Whether the device timed out and has not received an update since
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Forget arrival statistics and the offset target
    pub fn reset_stats(&mut self) {
        self.last_frame_with_event = 0;
        self.last_wall_time_with_event = 0;
        self.event_interval_us = 0;
        self.target_offset_ms = None;
    }

    fn open_gesture(&mut self) -> &mut EventHistory {
        if self.gestures.back().map_or(true, EventHistory::is_closed) {
            debug!(
                "{}: starting gesture #{}",
                self.device,
                self.gestures.len() + 1
            );
            self.gestures
                .push_back(EventHistory::new(&self.config, Arc::clone(&self.strategy)));
        }

        let newest = self.gestures.len() - 1;
        &mut self.gestures[newest]
    }

    /// Route a raw event into the newest open gesture
    ///
    /// `frame_counter` and `wall_time` (µs) are recorded for update events;
    /// they drive the latency and idle heuristics.
    pub fn route_event(&mut self, event: &Event, frame_counter: i64, wall_time: i64) -> Result<()> {
        let device = self.device;
        let gesture = self.open_gesture();

        match event.gesture_role() {
            GestureRole::Start => {
                trace!("{}: start marker at {}ms", device, event.time());
                gesture.set_start_event(event);
            }
            GestureRole::Stop => {
                trace!("{}: stop marker at {}ms", device, event.time());
                gesture.set_stop_event(event);
            }
            GestureRole::Update => {
                gesture.push(event)?;
                let updates = gesture.update_count();
                let average_ms = gesture.average_interval();

                self.idle = false;
                // Wall time, not event time: an event can stall before it gets here
                self.last_frame_with_event = frame_counter;
                self.last_wall_time_with_event = wall_time;

                // +1ms covers timestamp rounding, and keeps ~1000Hz devices from
                // reporting a zero interval
                if self.event_interval_us == 0 && updates == 2 {
                    self.event_interval_us = 1000 * (i64::from(average_ms) + 1);
                    debug!(
                        "{}: estimated event interval {}us",
                        device, self.event_interval_us
                    );
                }
            }
        }

        Ok(())
    }

    /// Raise the device's offset target if the newest sample is too recent
    ///
    /// The target is only refreshed when the arrival statistics are fresh:
    /// an event arrived in this or the previous frame, the gesture has just
    /// its first sample, or less than 1.5 event intervals passed since the
    /// last sample. The latter two cover devices slower than the display.
    pub fn update_target_offset(&mut self, frame_counter: i64, frame_time: i64, wall_time: i64) {
        let Some(gesture) = self.gestures.back() else {
            return;
        };

        let updates = gesture.update_count();
        let refresh = frame_counter - self.last_frame_with_event <= 1
            || (updates == 1 && self.event_interval_us == 0)
            || (updates > 1
                && ((wall_time - self.last_wall_time_with_event) as f64)
                    < 1.5 * self.event_interval_us as f64);

        let candidate = if refresh && !gesture.is_empty() {
            gesture
                .newest_time()
                .map_or(0, |newest| frame_time / 1000 - i64::from(newest))
        } else {
            0
        };

        let target = self
            .target_offset_ms
            .map_or(candidate, |current| current.max(candidate));
        if self.target_offset_ms != Some(target) {
            trace!("{}: offset target {}ms", self.device, target);
        }
        self.target_offset_ms = Some(target);
    }

    /// Whether the device has been idle longer than its grace period
    ///
    /// The grace period is the longer of `display_grace_frames` refresh
    /// intervals and `event_grace_frames` event intervals. Never true on the
    /// first tick after activation.
    pub fn is_timed_out(&self, frame: &FrameContext) -> bool {
        if frame.first_tick {
            return false;
        }

        let grace = (frame.refresh_interval * i64::from(self.config.display_grace_frames))
            .max(self.event_interval_us * i64::from(self.config.event_grace_frames));

        frame.wall_time - self.last_wall_time_with_event > grace
    }

    /// Emit this frame's events for the device
    ///
    /// Loops because several queued gestures can finish in one frame after
    /// an idle period.
    pub fn drain_one_frame(
        &mut self,
        frame: &FrameContext,
        sink: &mut dyn EventSink,
        stats: &mut InterpolationStats,
    ) -> DeviceStatus {
        let timed_out = self.is_timed_out(frame);
        let point = us_to_ms(frame.interpolation_point);
        let previous_point = us_to_ms(frame.previous_interpolation_point);

        loop {
            let queued = self.gestures.len();
            let Some(head) = self.gestures.front_mut() else {
                return DeviceStatus::Done;
            };

            let has_pending = head.has_pending(previous_point);
            let has_stop = head.is_closed();

            if queued == 1 && timed_out && !has_stop && !has_pending {
                // Restart from scratch when input resumes, instead of
                // interpolating across the idle gap
                if !self.idle {
                    head.reset();
                    self.reset_stats();
                    self.idle = true;
                    stats.timeouts += 1;
                    debug!("{}: idle timeout", self.device);
                }
                return DeviceStatus::Timeout;
            }

            if has_pending {
                match head.interpolate(point) {
                    Ok(event) => {
                        let start = head.take_start_event();
                        emit(sink, stats, start, event, false);
                    }
                    Err(InterpolationError::TooEarly { .. }) => {
                        stats.too_early_skips += 1;
                    }
                    Err(err) => {
                        stats.contract_violations += 1;
                        debug!("{}: interpolation failed: {}", self.device, err);
                    }
                }
            }

            if has_stop && head.all_emitted(point) {
                if let Some(mut gesture) = self.gestures.pop_front() {
                    let start = gesture.take_start_event();
                    if let Some(mut stop) = gesture.take_stop_event() {
                        // 1ms after the last interpolated event
                        let stop_ms = frame.interpolation_point / 1000 + 1;
                        stop.set_time(stop_ms.clamp(0, i64::from(u32::MAX)) as u32);
                        emit(sink, stats, start, stop, true);
                    }
                }
                debug!(
                    "{}: gesture finished, {} queued",
                    self.device,
                    self.gestures.len()
                );

                if self.gestures.is_empty() {
                    return DeviceStatus::Done;
                }
                continue;
            }

            break;
        }

        DeviceStatus::Ongoing
    }
}

fn emit(
    sink: &mut dyn EventSink,
    stats: &mut InterpolationStats,
    start: Option<Event>,
    event: Event,
    is_stop: bool,
) {
    if let Some(mut start) = start {
        start.set_time(event.time());
        trace!("emit start {} at {}ms", start.kind(), start.time());
        sink.emit(start);
        stats.starts_emitted += 1;
    }

    trace!(
        "emit {} {} at {}ms",
        if is_stop { "stop" } else { "update" },
        event.kind(),
        event.time()
    );
    sink.emit(event);

    if is_stop {
        stats.stops_emitted += 1;
    } else {
        stats.updates_emitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Category, GesturePhase};
    use crate::interpolation::HoldLastValue;

    const DEVICE: DeviceId = DeviceId(9);
    const FRAME_US: i64 = 16_000;

    fn interpolator() -> DeviceInterpolator {
        DeviceInterpolator::new(DEVICE, InterpolationConfig::default(), Arc::new(HoldLastValue))
    }

    fn frame(point_ms: i64, previous_ms: i64, wall_ms: i64, first_tick: bool) -> FrameContext {
        FrameContext {
            interpolation_point: point_ms * 1000,
            previous_interpolation_point: previous_ms * 1000,
            frame_counter: 0,
            frame_time: wall_ms * 1000,
            wall_time: wall_ms * 1000,
            refresh_interval: FRAME_US,
            first_tick,
        }
    }

    #[test]
    fn test_new_gesture_after_stop() {
        let mut device = interpolator();
        device
            .route_event(&Event::swipe(DEVICE, 100, GesturePhase::Begin), 1, 100_000)
            .unwrap();
        device
            .route_event(&Event::swipe(DEVICE, 110, GesturePhase::Update), 1, 110_000)
            .unwrap();
        device
            .route_event(&Event::swipe(DEVICE, 120, GesturePhase::End), 2, 120_000)
            .unwrap();
        assert_eq!(device.gesture_count(), 1);

        device
            .route_event(&Event::swipe(DEVICE, 130, GesturePhase::Begin), 2, 130_000)
            .unwrap();
        assert_eq!(device.gesture_count(), 2);
        assert!(device.draining_gesture().unwrap().is_closed());
        assert!(!device.accumulating_gesture().unwrap().is_closed());
    }

    #[test]
    fn test_interval_estimated_on_second_update() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();
        assert_eq!(device.event_interval_us(), 0);

        device
            .route_event(&Event::scroll(DEVICE, 1008), 1, 1_008_000)
            .unwrap();
        // anchor 988, 1000, 1008 -> (1008 - 988) / 2 = 10ms, plus 1ms
        assert_eq!(device.event_interval_us(), 11_000);

        device
            .route_event(&Event::scroll(DEVICE, 1100), 2, 1_100_000)
            .unwrap();
        assert_eq!(device.event_interval_us(), 11_000);
    }

    #[test]
    fn test_target_offset_is_running_max() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 5, 1_000_000)
            .unwrap();

        device.update_target_offset(5, 1_020_000, 1_020_000);
        assert_eq!(device.target_offset_ms(), Some(20));

        device
            .route_event(&Event::scroll(DEVICE, 1030), 6, 1_030_000)
            .unwrap();
        device.update_target_offset(6, 1_035_000, 1_035_000);
        assert_eq!(device.target_offset_ms(), Some(20));

        device.update_target_offset(7, 1_070_000, 1_070_000);
        assert_eq!(device.target_offset_ms(), Some(40));
    }

    #[test]
    fn test_stale_statistics_do_not_raise_target() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();
        device
            .route_event(&Event::scroll(DEVICE, 1010), 1, 1_010_000)
            .unwrap();

        // Ten frames later and long past 1.5 event intervals
        device.update_target_offset(11, 1_200_000, 1_200_000);
        assert_eq!(device.target_offset_ms(), Some(0));
    }

    #[test]
    fn test_timeout_never_on_first_tick() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();

        assert!(!device.is_timed_out(&frame(0, 0, 5_000, true)));
        assert!(device.is_timed_out(&frame(0, 0, 5_000, false)));
        // 5 frames of 16ms = 80ms grace
        assert!(!device.is_timed_out(&frame(0, 0, 1_080, false)));
        assert!(device.is_timed_out(&frame(0, 0, 1_081, false)));
    }

    #[test]
    fn test_drain_emits_start_before_update() {
        let mut device = interpolator();
        device
            .route_event(&Event::pinch(DEVICE, 995, GesturePhase::Begin), 1, 995_000)
            .unwrap();
        for i in 0..3u32 {
            let event = Event::pinch(DEVICE, 1000 + i * 10, GesturePhase::Update)
                .with_delta(1.0, 0.0);
            device.route_event(&event, 1, 1_000_000).unwrap();
        }

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        let status = device.drain_one_frame(&frame(1005, 0, 1030, true), &mut sink, &mut stats);

        assert_eq!(status, DeviceStatus::Ongoing);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].phase(), Some(GesturePhase::Begin));
        assert_eq!(sink[0].time(), 1005);
        assert_eq!(sink[1].phase(), Some(GesturePhase::Update));
        assert_eq!(stats.starts_emitted, 1);
        assert_eq!(stats.updates_emitted, 1);
    }

    #[test]
    fn test_too_early_skips_frame() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        let status = device.drain_one_frame(&frame(900, 0, 1000, true), &mut sink, &mut stats);

        assert_eq!(status, DeviceStatus::Ongoing);
        assert!(sink.is_empty());
        assert_eq!(stats.too_early_skips, 1);
    }

    #[test]
    fn test_stop_waits_for_drain_then_done() {
        let mut device = interpolator();
        for i in 0..3u32 {
            let event = Event::scroll(DEVICE, 1000 + i * 10).with_delta(0.0, 1.0);
            device.route_event(&event, 1, 1_000_000).unwrap();
        }
        device
            .route_event(&Event::scroll_stop(DEVICE, 1025), 1, 1_025_000)
            .unwrap();

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();

        let status = device.drain_one_frame(&frame(1010, 0, 1030, true), &mut sink, &mut stats);
        assert_eq!(status, DeviceStatus::Ongoing);
        assert_eq!(sink.len(), 1);

        let status =
            device.drain_one_frame(&frame(1026, 1010, 1046, false), &mut sink, &mut stats);
        assert_eq!(status, DeviceStatus::Done);
        assert_eq!(sink.len(), 3);
        assert!(sink[2].is_scroll_stop());
        assert_eq!(sink[2].time(), 1027);
        assert_eq!(device.gesture_count(), 0);

        let total: f64 = sink
            .iter()
            .map(|event| event.values(Category::Relative)[1])
            .sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_several_gestures_finish_in_one_frame() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000).with_delta(0.0, 1.0), 1, 0)
            .unwrap();
        device
            .route_event(&Event::scroll_stop(DEVICE, 1001), 1, 0)
            .unwrap();
        device
            .route_event(&Event::scroll(DEVICE, 1002).with_delta(0.0, 1.0), 1, 0)
            .unwrap();
        device
            .route_event(&Event::scroll_stop(DEVICE, 1003), 1, 0)
            .unwrap();
        assert_eq!(device.gesture_count(), 2);

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        let status = device.drain_one_frame(&frame(1500, 0, 1500, true), &mut sink, &mut stats);

        assert_eq!(status, DeviceStatus::Done);
        assert_eq!(stats.stops_emitted, 2);
        assert_eq!(stats.updates_emitted, 2);
    }

    #[test]
    fn test_idle_device_times_out_and_resets() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        // Everything up to 1000ms was emitted on the previous tick
        let status =
            device.drain_one_frame(&frame(1200, 1000, 1200, false), &mut sink, &mut stats);

        assert_eq!(status, DeviceStatus::Timeout);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(device.gesture_count(), 1);
        assert!(device.draining_gesture().unwrap().is_empty());
        assert_eq!(device.target_offset_ms(), None);
    }

    #[test]
    fn test_recent_sample_from_slow_device_raises_target() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();
        device
            .route_event(&Event::scroll(DEVICE, 1040), 3, 1_040_000)
            .unwrap();
        // anchor 988, 1000, 1040 -> 26ms average, 27ms estimate
        assert_eq!(device.event_interval_us(), 27_000);

        // Three frames since the last event, but only 30ms of a 40.5ms window
        device.update_target_offset(6, 1_070_000, 1_070_000);
        assert_eq!(device.target_offset_ms(), Some(30));
    }

    #[test]
    fn test_slow_device_gets_event_grace_period() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();
        device
            .route_event(&Event::scroll(DEVICE, 1100), 7, 1_100_000)
            .unwrap();
        // anchor 988, 1000, 1100 -> 56ms average, 57ms estimate
        assert_eq!(device.event_interval_us(), 57_000);

        // 200ms idle is past 5 display frames but within 10 event intervals
        assert!(!device.is_timed_out(&frame(0, 0, 1_300, false)));
        assert!(!device.is_timed_out(&frame(0, 0, 1_670, false)));
        assert!(device.is_timed_out(&frame(0, 0, 1_671, false)));
    }

    #[test]
    fn test_idle_timeout_counted_once() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll(DEVICE, 1000), 1, 1_000_000)
            .unwrap();

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        for tick in 0..10 {
            let wall_ms = 1200 + tick * 16;
            let status =
                device.drain_one_frame(&frame(wall_ms, wall_ms - 16, wall_ms, false), &mut sink, &mut stats);
            assert_eq!(status, DeviceStatus::Timeout);
        }
        assert_eq!(stats.timeouts, 1);
        assert!(device.is_idle());

        device
            .route_event(&Event::scroll(DEVICE, 1400), 30, 1_400_000)
            .unwrap();
        assert!(!device.is_idle());
        device.drain_one_frame(&frame(1400, 1384, 1400, false), &mut sink, &mut stats);
        device.drain_one_frame(&frame(1600, 1400, 1600, false), &mut sink, &mut stats);
        assert_eq!(stats.timeouts, 2);
    }

    #[test]
    fn test_stop_time_saturates_before_epoch() {
        let mut device = interpolator();
        device
            .route_event(&Event::scroll_stop(DEVICE, 0), 0, 0)
            .unwrap();

        let mut sink: Vec<Event> = Vec::new();
        let mut stats = InterpolationStats::default();
        let status = device.drain_one_frame(&frame(-5, 0, 0, true), &mut sink, &mut stats);

        assert_eq!(status, DeviceStatus::Done);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].time(), 0);
    }
}
