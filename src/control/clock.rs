//! Frame clock and event sink seams
//!
//! The interpolation control does not own a frame clock or an event queue.
//! The toolkit hands both in: [`FrameClock`] for timing and the before-paint
//! subscription, [`EventSink`] for delivering synthesized events.
//!
//! All times are in microseconds on the clock's monotonic time base.

use crate::event::Event;

/// Token for an active before-paint subscription
///
/// Returned by [`FrameClock::subscribe_before_paint`] and handed back to
/// [`FrameClock::unsubscribe`]. While it is held, the clock owner calls
/// `InterpolationControl::tick` once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickSubscription(u64);

impl TickSubscription {
    /// Wrap a clock-specific subscription id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Clock-specific subscription id
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Display frame clock driving the interpolation
#[cfg_attr(test, mockall::automock)]
pub trait FrameClock {
    /// Consecutive id of the upcoming frame
    fn frame_counter(&self) -> i64;

    /// Time the upcoming frame is expected to be presented (µs)
    fn frame_time(&self) -> i64;

    /// Refresh interval estimate as of `base_time` (µs), 0 if unknown
    fn refresh_interval(&self, base_time: i64) -> i64;

    /// Current monotonic wall time (µs)
    fn monotonic_time(&self) -> i64;

    /// Start receiving before-paint ticks
    fn subscribe_before_paint(&mut self) -> TickSubscription;

    /// Stop receiving before-paint ticks
    fn unsubscribe(&mut self, subscription: TickSubscription);

    /// Ask the clock to keep producing frames
    fn begin_updating(&mut self);

    /// Release a previous [`begin_updating`](Self::begin_updating)
    fn end_updating(&mut self);
}

/// Destination for synthesized and boundary events, in emission order
pub trait EventSink {
    /// Deliver one event
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Hand-driven frame clock
///
/// Useful for replaying recorded input and for tests: frames advance only
/// when [`advance_frame`](Self::advance_frame) is called, and wall time
/// follows frame time unless moved explicitly.
#[derive(Debug, Clone)]
pub struct ManualFrameClock {
    frame_counter: i64,
    frame_time: i64,
    refresh_interval: i64,
    wall_time: i64,
    next_subscription: u64,
    subscription: Option<TickSubscription>,
    updating: u32,
}

impl ManualFrameClock {
    /// Create a clock at `start_time` (µs) with a fixed refresh interval (µs)
    pub fn new(start_time: i64, refresh_interval: i64) -> Self {
        Self {
            frame_counter: 0,
            frame_time: start_time,
            refresh_interval,
            wall_time: start_time,
            next_subscription: 1,
            subscription: None,
            updating: 0,
        }
    }

    /// Move to the next frame; wall time jumps to the new frame time
    pub fn advance_frame(&mut self) {
        self.frame_counter += 1;
        self.frame_time += self.refresh_interval;
        self.wall_time = self.frame_time;
    }

    /// Move wall time forward without starting a new frame
    pub fn advance_wall_time(&mut self, micros: i64) {
        self.wall_time += micros;
    }

    /// Set wall time
    pub fn set_wall_time(&mut self, micros: i64) {
        self.wall_time = micros;
    }

    /// Change the refresh interval (µs)
    pub fn set_refresh_interval(&mut self, micros: i64) {
        self.refresh_interval = micros;
    }

    /// Whether a before-paint subscription is active
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether at least one `begin_updating` is outstanding
    pub fn is_updating(&self) -> bool {
        self.updating > 0
    }
}

impl FrameClock for ManualFrameClock {
    fn frame_counter(&self) -> i64 {
        self.frame_counter
    }

    fn frame_time(&self) -> i64 {
        self.frame_time
    }

    fn refresh_interval(&self, _base_time: i64) -> i64 {
        self.refresh_interval
    }

    fn monotonic_time(&self) -> i64 {
        self.wall_time
    }

    fn subscribe_before_paint(&mut self) -> TickSubscription {
        let subscription = TickSubscription::new(self.next_subscription);
        self.next_subscription += 1;
        self.subscription = Some(subscription);
        subscription
    }

    fn unsubscribe(&mut self, subscription: TickSubscription) {
        if self.subscription == Some(subscription) {
            self.subscription = None;
        }
    }

    fn begin_updating(&mut self) {
        self.updating += 1;
    }

    fn end_updating(&mut self) {
        self.updating = self.updating.saturating_sub(1);
    }
}
