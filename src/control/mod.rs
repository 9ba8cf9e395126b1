//! Frame-Driven Interpolation Control
//!
//! Turns irregular input events into one synthesized event per display frame
//! and input device.
//!
//! # Architecture
//!
//! ```text
//! platform events ──> InterpolationControl::add_event
//!                        └─> DeviceInterpolator (per device)
//!                              └─> gesture queue of EventHistory
//!
//! FrameClock before-paint ──> InterpolationControl::tick
//!                        ├─> latency offset update
//!                        ├─> drain_one_frame per device
//!                        └─> EventSink (start, updates, stop)
//! ```
//!
//! # Timing
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Event timestamps | ms |
//! | Frame time, wall time, refresh interval | µs |
//! | Latency offset | ms |
//! | Interpolation point | µs in the control, ms in the history |
//!
//! # Example
//!
//! ```
//! use lamco_input_interpolation::control::{InterpolationControl, ManualFrameClock};
//! use lamco_input_interpolation::event::{DeviceId, Event};
//!
//! let mut clock = ManualFrameClock::new(1_000_000, 16_000);
//! let mut control = InterpolationControl::default();
//!
//! control.add_event(&Event::scroll(DeviceId(1), 1000).with_delta(0.0, 2.0), &mut clock)?;
//! control.add_event(&Event::scroll_stop(DeviceId(1), 1001), &mut clock)?;
//!
//! let mut emitted: Vec<Event> = Vec::new();
//! clock.advance_frame();
//! control.tick(&mut clock, &mut emitted);
//!
//! assert!(emitted.last().is_some_and(Event::is_scroll_stop));
//! assert!(!control.is_active());
//! # Ok::<(), lamco_input_interpolation::interpolation::InterpolationError>(())
//! ```

pub mod clock;
mod controller;
mod device;
pub mod stats;

pub use clock::{EventSink, FrameClock, ManualFrameClock, TickSubscription};
pub use controller::InterpolationControl;
pub use device::{DeviceInterpolator, DeviceStatus, FrameContext};
pub use stats::InterpolationStats;
