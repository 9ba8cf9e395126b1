//! Sample History and Interpolation
//!
//! The numeric core of the engine: a bounded per-gesture sample buffer that
//! linearly interpolates between the two samples bracketing a point in time,
//! and the gesture wrapper that makes relative deltas interpolatable.
//!
//! # Architecture
//!
//! ```text
//! EventHistory (one gesture)
//!   ├─> start / stop markers
//!   ├─> emitted relative totals
//!   └─> AbsoluteEventHistory
//!       ├─> up to 66 samples, oldest evicted first
//!       ├─> linear blend between bracketing samples
//!       └─> ExtrapolationStrategy past the newest sample
//! ```
//!
//! # Limitations
//!
//! No extrapolation: with the default [`HoldLastValue`] strategy an
//! interpolation point past the newest sample repeats that sample. The
//! latency offset chosen by the control loop exists to keep the point inside
//! the history.

mod absolute_history;
pub mod error;
mod history;
mod strategy;

pub use absolute_history::{AbsoluteEventHistory, DEFAULT_AVERAGE_WINDOW, DEFAULT_HISTORY_CAPACITY};
pub use error::{InterpolationError, Result};
pub use history::EventHistory;
pub use strategy::{ExtrapolationStrategy, HoldLastValue};
