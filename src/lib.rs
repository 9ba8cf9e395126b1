//! # lamco-input-interpolation
//!
//! Frame-synchronized interpolation of high-frequency input events.
//!
//! Touchpads and smooth-scroll devices report at their own rate, which
//! rarely matches the display refresh rate. Applying each event as it
//! arrives makes motion stutter: some frames get two events, some none.
//! This crate buffers the events per gesture and, once per display frame,
//! synthesizes the event that would have occurred at a slightly delayed
//! point in time.
//!
//! # Architecture
//!
//! ```text
//! lamco-input-interpolation
//!   ├─> event          (Scroll / TouchpadSwipe / TouchpadPinch value types)
//!   ├─> interpolation  (bounded sample history, linear blending)
//!   ├─> control        (per-device gesture queues, latency offset, frame loop)
//!   └─> config         (TOML-loadable tuning constants)
//! ```
//!
//! # Data Flow
//!
//! **Input Path:** Platform → `InterpolationControl::add_event` → per-device gesture history
//!
//! **Output Path:** Frame clock tick → latency-adjusted point → interpolation → `EventSink`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Engine configuration
pub mod config;

/// Frame-driven interpolation control loop
///
/// Owns the per-device gesture queues, computes the global latency offset
/// and emits synthesized events once per display frame.
pub mod control;

/// Input event model and interpolation field registry
pub mod event;

/// Sample history and linear interpolation
pub mod interpolation;

pub use config::InterpolationConfig;
pub use control::{EventSink, FrameClock, InterpolationControl, InterpolationStats};
pub use event::{DeviceId, Event, EventKind};
pub use interpolation::{InterpolationError, Result};
