//! Bounded sample history with linear interpolation
//!
//! Samples are stored oldest first. Every numeric field is treated as an
//! absolute reading here; [`super::EventHistory`] converts relative deltas
//! to running totals before they reach this buffer.
//!
//! # Interpolation
//!
//! ```text
//! t0 <= point < t1
//! ratio = (point - t0) / (t1 - t0)
//! value = v0 * (1 - ratio) + v1 * ratio
//! ```
//!
//! Discrete fields (modifier state, phase, finger count) are taken from the
//! nearer of the two samples.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{trace, warn};

use super::error::{InterpolationError, Result};
use super::strategy::{ExtrapolationStrategy, HoldLastValue};
use crate::event::{Category, Event};

/// Default maximum number of stored samples
pub const DEFAULT_HISTORY_CAPACITY: usize = 66;

/// Default number of newest samples used by [`AbsoluteEventHistory::average_interval`]
pub const DEFAULT_AVERAGE_WINDOW: usize = 6;

/// Time-ordered, bounded buffer of samples for a single gesture
#[derive(Debug, Clone)]
pub struct AbsoluteEventHistory {
    samples: VecDeque<Event>,
    capacity: usize,
    average_window: usize,
    strategy: Arc<dyn ExtrapolationStrategy>,
}

impl Default for AbsoluteEventHistory {
    fn default() -> Self {
        Self::new(
            DEFAULT_HISTORY_CAPACITY,
            DEFAULT_AVERAGE_WINDOW,
            Arc::new(HoldLastValue),
        )
    }
}

impl AbsoluteEventHistory {
    /// Create an empty history
    pub fn new(
        capacity: usize,
        average_window: usize,
        strategy: Arc<dyn ExtrapolationStrategy>,
    ) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            average_window: average_window.max(2),
            strategy,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: Event) {
        if let Some(newest) = self.samples.back() {
            if sample.time() < newest.time() {
                warn!(
                    "Out of order sample: {}ms pushed after {}ms",
                    sample.time(),
                    newest.time()
                );
            }
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the history holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of stored samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.samples.iter()
    }

    /// Newest stored sample
    pub fn newest_sample(&self) -> Result<&Event> {
        self.samples.back().ok_or_else(|| {
            warn!("Newest sample requested from an empty history");
            InterpolationError::EmptyHistory
        })
    }

    /// Time of the newest stored sample (ms)
    pub fn newest_time(&self) -> Result<u32> {
        self.newest_sample().map(Event::time)
    }

    /// Time of the oldest stored sample (ms)
    pub fn oldest_time(&self) -> Result<u32> {
        self.samples.front().map(Event::time).ok_or_else(|| {
            warn!("Oldest sample requested from an empty history");
            InterpolationError::EmptyHistory
        })
    }

    /// Index of the most recent sample with time <= `point` (ms)
    ///
    /// Returns `None` if every sample is newer than `point`.
    pub fn newest_index_at_or_before(&self, point: f64) -> Option<usize> {
        self.samples
            .iter()
            .rposition(|sample| f64::from(sample.time()) <= point)
    }

    /// Average interval between the newest samples (ms)
    ///
    /// Only the endpoints of the window are used, so a single late sample
    /// inside the window does not skew the result.
    pub fn average_interval(&self) -> u32 {
        let len = self.samples.len();
        if len < 2 {
            return 0;
        }

        let window = len.min(self.average_window);
        let newest = self.samples[len - 1].time();
        let oldest = self.samples[len - window].time();
        newest.saturating_sub(oldest) / (window as u32 - 1)
    }

    /// Drop every sample
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Synthesize an event at `point` (ms)
    ///
    /// Fails with [`InterpolationError::TooEarly`] if `point` precedes the
    /// oldest sample. Points past the newest sample are handed to the
    /// configured [`ExtrapolationStrategy`].
    pub fn interpolate(&self, point: f64) -> Result<Event> {
        let newest_index = match self.samples.len().checked_sub(1) {
            Some(index) => index,
            None => {
                warn!("Interpolation requested from an empty history");
                return Err(InterpolationError::EmptyHistory);
            }
        };

        let index = match self.newest_index_at_or_before(point) {
            Some(index) => index,
            None => {
                let oldest = self.samples[0].time();
                trace!("Point {:.3}ms precedes oldest sample {}ms", point, oldest);
                return Err(InterpolationError::TooEarly { point, oldest });
            }
        };

        let before = &self.samples[index];
        if f64::from(before.time()) == point {
            return Ok(before.clone());
        }

        if index == newest_index {
            let previous = index.checked_sub(1).map(|i| &self.samples[i]);
            return Ok(self.strategy.beyond_newest(before, previous, point));
        }

        let after = &self.samples[index + 1];
        let t0 = f64::from(before.time());
        let t1 = f64::from(after.time());
        let ratio = (point - t0) / (t1 - t0);

        let absolute = blend(
            &before.values(Category::Absolute),
            &after.values(Category::Absolute),
            ratio,
        )?;
        let relative = blend(
            &before.values(Category::Relative),
            &after.values(Category::Relative),
            ratio,
        )?;

        let mut event = if ratio < 0.5 {
            before.clone()
        } else {
            after.clone()
        };
        event.set_time(point.floor() as u32);
        event.set_values(Category::Absolute, &absolute)?;
        event.set_values(Category::Relative, &relative)?;

        Ok(event)
    }
}

fn blend(v0: &[f64], v1: &[f64], ratio: f64) -> Result<Vec<f64>> {
    if v0.len() != v1.len() {
        warn!(
            "Cannot interpolate between samples with {} and {} properties",
            v0.len(),
            v1.len()
        );
        return Err(InterpolationError::LengthMismatch {
            expected: v0.len(),
            found: v1.len(),
        });
    }

    Ok(v0
        .iter()
        .zip(v1)
        .map(|(a, b)| a * (1.0 - ratio) + b * ratio)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceId, GesturePhase};

    const DEVICE: DeviceId = DeviceId(7);

    fn sample(time: u32, x: f64) -> Event {
        Event::scroll(DEVICE, time)
            .with_position(x, x * 2.0)
            .with_delta(x, -x)
    }

    fn history_of(times: &[u32]) -> AbsoluteEventHistory {
        let mut history = AbsoluteEventHistory::default();
        for &t in times {
            history.push(sample(t, f64::from(t)));
        }
        history
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let mut history = AbsoluteEventHistory::default();
        for i in 0..100u32 {
            history.push(sample(i * 10, f64::from(i)));
        }

        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(history.oldest_time().unwrap(), (100 - 66) * 10);
        assert_eq!(history.newest_time().unwrap(), 990);
    }

    #[test]
    fn test_empty_history_accessors_fail() {
        let history = AbsoluteEventHistory::default();
        assert_eq!(
            history.newest_time(),
            Err(InterpolationError::EmptyHistory)
        );
        assert!(history.newest_sample().is_err());
        assert_eq!(
            history.interpolate(10.0),
            Err(InterpolationError::EmptyHistory)
        );
    }

    #[test]
    fn test_newest_index_at_or_before() {
        let history = history_of(&[100, 110, 120]);
        assert_eq!(history.newest_index_at_or_before(99.9), None);
        assert_eq!(history.newest_index_at_or_before(100.0), Some(0));
        assert_eq!(history.newest_index_at_or_before(115.0), Some(1));
        assert_eq!(history.newest_index_at_or_before(500.0), Some(2));
    }

    #[test]
    fn test_average_interval() {
        assert_eq!(history_of(&[]).average_interval(), 0);
        assert_eq!(history_of(&[100]).average_interval(), 0);
        assert_eq!(history_of(&[100, 108]).average_interval(), 8);
        // Window of 6 ignores the early 50ms gap
        assert_eq!(
            history_of(&[0, 50, 60, 70, 80, 90, 100]).average_interval(),
            10
        );
    }

    #[test]
    fn test_average_interval_tolerates_gap_inside_window() {
        // Endpoints only: (100 - 50) / 5
        assert_eq!(
            history_of(&[50, 52, 54, 56, 58, 100]).average_interval(),
            10
        );
    }

    #[test]
    fn test_exact_point_returns_copy() {
        let history = history_of(&[100, 110, 120]);
        let event = history.interpolate(110.0).unwrap();
        assert_eq!(event, sample(110, 110.0));
    }

    #[test]
    fn test_too_early() {
        let history = history_of(&[100, 110]);
        let result = history.interpolate(99.5);
        assert!(matches!(
            result,
            Err(InterpolationError::TooEarly { oldest: 100, .. })
        ));
    }

    #[test]
    fn test_after_newest_holds_last_value() {
        let history = history_of(&[100, 110, 120]);
        let event = history.interpolate(250.0).unwrap();
        assert_eq!(event, sample(120, 120.0));
    }

    #[test]
    fn test_linear_blend() {
        let history = history_of(&[100, 110]);
        let event = history.interpolate(102.5).unwrap();

        assert_eq!(event.time(), 102);
        let absolute = event.values(Category::Absolute);
        assert!((absolute[0] - 102.5).abs() < 1e-9);
        assert!((absolute[1] - 205.0).abs() < 1e-9);
        let relative = event.values(Category::Relative);
        assert!((relative[0] - 102.5).abs() < 1e-9);
        assert!((relative[1] + 102.5).abs() < 1e-9);
    }

    #[test]
    fn test_discrete_state_nearest_neighbour() {
        let mut history = AbsoluteEventHistory::default();
        history.push(sample(100, 0.0).with_state(1));
        history.push(sample(110, 10.0).with_state(2));

        assert_eq!(history.interpolate(104.0).unwrap().state(), 1);
        assert_eq!(history.interpolate(105.0).unwrap().state(), 2);
        assert_eq!(history.interpolate(109.0).unwrap().state(), 2);
    }

    #[test]
    fn test_mismatched_samples_fail_whole_call() {
        let mut history = AbsoluteEventHistory::default();
        history.push(sample(100, 0.0));
        history.push(
            Event::pinch(DEVICE, 110, GesturePhase::Update)
                .with_position(10.0, 10.0)
                .with_delta(1.0, 1.0),
        );

        let result = history.interpolate(105.0);
        assert!(matches!(
            result,
            Err(InterpolationError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_reset_clears_samples() {
        let mut history = history_of(&[100, 110]);
        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.average_interval(), 0);
    }
}
