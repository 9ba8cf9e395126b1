//! Gesture event history
//!
//! Wraps an [`AbsoluteEventHistory`] for one gesture. Relative properties
//! are stored as running totals so they can be interpolated like absolute
//! ones, then turned back into deltas against what was already emitted.
//!
//! ```text
//! pushed deltas:   (1,2) (1,2) (1,2)
//! stored totals:   (0,0) (1,2) (2,4) (3,6)      <- leading zero anchor
//! emitted delta:   interpolated total - emitted total
//! ```
//!
//! Because of the emitted-total bookkeeping, [`EventHistory::interpolate`] is
//! not a pure function of the interpolation point.

use std::sync::Arc;

use tracing::{debug, warn};

use super::absolute_history::AbsoluteEventHistory;
use super::error::{InterpolationError, Result};
use super::strategy::{ExtrapolationStrategy, HoldLastValue};
use crate::config::InterpolationConfig;
use crate::event::{Category, Event};

/// Event history of a single gesture, with its start and stop markers
#[derive(Debug, Clone)]
pub struct EventHistory {
    history: AbsoluteEventHistory,
    start_event: Option<Event>,
    stop_event: Option<Event>,
    /// Relative totals already handed out by `interpolate`
    emitted: Vec<f64>,
    previous_point: Option<f64>,
    update_count: usize,
    anchor_lead_ms: u32,
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(&InterpolationConfig::default(), Arc::new(HoldLastValue))
    }
}

impl EventHistory {
    /// Create an empty gesture history
    pub fn new(config: &InterpolationConfig, strategy: Arc<dyn ExtrapolationStrategy>) -> Self {
        Self {
            history: AbsoluteEventHistory::new(
                config.history_capacity,
                config.average_window,
                strategy,
            ),
            start_event: None,
            stop_event: None,
            emitted: Vec::new(),
            previous_point: None,
            update_count: 0,
            anchor_lead_ms: config.anchor_lead_ms,
        }
    }

    /// Add a gesture update
    ///
    /// The first update after creation or [`reset`](Self::reset) is preceded
    /// by a zero-delta anchor `anchor_lead_ms` earlier, so interpolation has
    /// two samples to work with right away.
    pub fn push(&mut self, event: &Event) -> Result<()> {
        if self.stop_event.is_some() {
            warn!(
                "Dropping {} update at {}ms: gesture already stopped",
                event.kind(),
                event.time()
            );
            return Err(InterpolationError::GestureClosed);
        }

        let increment = event.values(Category::Relative);

        if self.history.is_empty() {
            let mut anchor = event.clone();
            anchor.set_time(event.time().saturating_sub(self.anchor_lead_ms));
            anchor.set_values(Category::Relative, &vec![0.0; increment.len()])?;
            self.history.push(anchor);
            self.emitted = vec![0.0; increment.len()];
        }

        if increment.len() != self.emitted.len() {
            warn!(
                "Dropping {} update at {}ms: {} relative values, gesture has {}",
                event.kind(),
                event.time(),
                increment.len(),
                self.emitted.len()
            );
            return Err(InterpolationError::LengthMismatch {
                expected: self.emitted.len(),
                found: increment.len(),
            });
        }

        let totals: Vec<f64> = self
            .history
            .newest_sample()?
            .values(Category::Relative)
            .iter()
            .zip(&increment)
            .map(|(total, delta)| total + delta)
            .collect();

        let mut sample = event.clone();
        sample.set_values(Category::Relative, &totals)?;
        self.history.push(sample);
        self.update_count += 1;

        Ok(())
    }

    /// Synthesize the event at `point` (ms) with deltas relative to the
    /// previous call
    pub fn interpolate(&mut self, point: f64) -> Result<Event> {
        if let Some(previous) = self.previous_point {
            if point < previous {
                warn!(
                    "Interpolation point went backwards: {:.3}ms -> {:.3}ms",
                    previous, point
                );
            }
        }
        self.previous_point = Some(point);

        let mut event = self.history.interpolate(point)?;

        let totals = event.values(Category::Relative);
        if totals.len() != self.emitted.len() {
            warn!(
                "Interpolated {} relative values, gesture has emitted {}",
                totals.len(),
                self.emitted.len()
            );
            return Err(InterpolationError::LengthMismatch {
                expected: self.emitted.len(),
                found: totals.len(),
            });
        }

        let deltas: Vec<f64> = totals
            .iter()
            .zip(&self.emitted)
            .map(|(total, emitted)| total - emitted)
            .collect();
        for (emitted, delta) in self.emitted.iter_mut().zip(&deltas) {
            *emitted += delta;
        }

        event.set_values(Category::Relative, &deltas)?;
        Ok(event)
    }

    /// Drop all samples and emission bookkeeping, keeping start/stop markers
    pub fn reset(&mut self) {
        debug!(
            "Resetting gesture history ({} samples, start pending: {}, stopped: {})",
            self.history.len(),
            self.start_event.is_some(),
            self.stop_event.is_some()
        );
        self.history.reset();
        self.emitted.clear();
        self.previous_point = None;
        self.update_count = 0;
    }

    /// Whether every stored sample lies at or before `point` (ms)
    ///
    /// An empty history counts as fully emitted.
    pub fn all_emitted(&self, point: f64) -> bool {
        if self.history.is_empty() {
            return true;
        }
        self.history
            .newest_time()
            .map_or(true, |newest| point >= f64::from(newest))
    }

    /// Whether some stored samples lie after `point` (ms)
    pub fn has_pending(&self, point: f64) -> bool {
        !self.history.is_empty() && !self.all_emitted(point)
    }

    /// Number of stored samples, including the anchor
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no samples are stored
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Updates pushed since creation or the last reset
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Time of the newest stored sample (ms)
    pub fn newest_time(&self) -> Result<u32> {
        self.history.newest_time()
    }

    /// Average interval between the newest samples (ms)
    pub fn average_interval(&self) -> u32 {
        self.history.average_interval()
    }

    /// Underlying absolute history
    pub fn samples(&self) -> &AbsoluteEventHistory {
        &self.history
    }

    /// Record the gesture start event
    pub fn set_start_event(&mut self, event: &Event) {
        self.start_event = Some(event.clone());
    }

    /// Pending start event, if not emitted yet
    pub fn start_event(&self) -> Option<&Event> {
        self.start_event.as_ref()
    }

    /// Remove and return the pending start event
    pub fn take_start_event(&mut self) -> Option<Event> {
        self.start_event.take()
    }

    /// Record the gesture stop event, closing the gesture
    pub fn set_stop_event(&mut self, event: &Event) {
        self.stop_event = Some(event.clone());
    }

    /// Recorded stop event
    pub fn stop_event(&self) -> Option<&Event> {
        self.stop_event.as_ref()
    }

    /// Remove and return the recorded stop event
    pub fn take_stop_event(&mut self) -> Option<Event> {
        self.stop_event.take()
    }

    /// Whether a stop event has been recorded
    pub fn is_closed(&self) -> bool {
        self.stop_event.is_some()
    }
}
