//! Extrapolation strategies
//!
//! Decide what to synthesize when the interpolation point lies past the
//! newest sample in the history. The latency offset keeps this rare, but it
//! happens whenever input pauses without a stop event.

use crate::event::Event;

/// Policy for interpolation points beyond the newest sample
pub trait ExtrapolationStrategy: std::fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build the event for `point` (ms) given the newest sample and the one
    /// before it, if any
    fn beyond_newest(&self, newest: &Event, previous: Option<&Event>, point: f64) -> Event;
}

/// Repeat the newest sample unchanged, including its timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldLastValue;

impl ExtrapolationStrategy for HoldLastValue {
    fn name(&self) -> &'static str {
        "hold-last-value"
    }

    fn beyond_newest(&self, newest: &Event, _previous: Option<&Event>, _point: f64) -> Event {
        newest.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceId;

    #[test]
    fn test_hold_last_value_is_identity() {
        let newest = Event::scroll(DeviceId(1), 40)
            .with_position(3.0, 4.0)
            .with_delta(1.0, 1.0);
        let previous = Event::scroll(DeviceId(1), 30);

        let held = HoldLastValue.beyond_newest(&newest, Some(&previous), 55.5);
        assert_eq!(held, newest);
        assert_eq!(HoldLastValue.name(), "hold-last-value");
    }
}
