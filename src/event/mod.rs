//! Input Event Model
//!
//! Value types for the input events that flow through the interpolation
//! engine: smooth scroll, touchpad swipe and touchpad pinch.
//!
//! Every event carries a millisecond timestamp, the id of the physical
//! device that produced it, a modifier state and a kind-specific payload.
//! The numeric payload fields are addressed through the closed registry in
//! [`layout`], which splits them into absolute readings and relative deltas.
//!
//! # Gesture roles
//!
//! | Kind | Start | Stop | Update |
//! |------|-------|------|--------|
//! | Scroll | never | `is_stop` set | everything else |
//! | TouchpadSwipe / TouchpadPinch | phase `Begin` | phase `End` or `Cancel` | phase `Update` |
//!
//! # Example
//!
//! ```
//! use lamco_input_interpolation::event::{Category, DeviceId, Event};
//!
//! let event = Event::scroll(DeviceId(3), 1000)
//!     .with_position(10.0, 20.0)
//!     .with_delta(0.0, 1.5);
//!
//! assert_eq!(event.values(Category::Relative), vec![0.0, 1.5]);
//! ```

pub mod layout;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interpolation::error::{InterpolationError, Result};

pub use layout::{layout_for, Category, Field, FieldLayout};

/// Identifier of the physical (slave) input device that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Kind of an interpolatable input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Smooth scroll (wheel with high-resolution deltas, two-finger scroll)
    Scroll,
    /// Multi-finger touchpad swipe
    TouchpadSwipe,
    /// Two-finger touchpad pinch/rotate
    TouchpadPinch,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scroll => write!(f, "Scroll"),
            Self::TouchpadSwipe => write!(f, "TouchpadSwipe"),
            Self::TouchpadPinch => write!(f, "TouchpadPinch"),
        }
    }
}

/// Phase of a touchpad gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GesturePhase {
    /// Gesture recognized
    Begin,
    /// Gesture in progress
    #[default]
    Update,
    /// Gesture finished normally
    End,
    /// Gesture aborted
    Cancel,
}

/// Discrete scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Discrete step up
    Up,
    /// Discrete step down
    Down,
    /// Discrete step left
    Left,
    /// Discrete step right
    Right,
    /// Continuous deltas in `delta_x`/`delta_y`
    #[default]
    Smooth,
}

/// Role an event plays inside its gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureRole {
    /// Opens a gesture, stored as a pending marker
    Start,
    /// Carries new readings, pushed into the history
    Update,
    /// Closes a gesture, emitted after the history drains
    Stop,
}

/// Kind-specific payload of an [`Event`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    /// Smooth scroll payload
    Scroll {
        /// Scroll direction
        direction: ScrollDirection,
        /// Delta along X
        delta_x: f64,
        /// Delta along Y
        delta_y: f64,
        /// Set on the zero-delta event sent when the user lifts the fingers
        is_stop: bool,
    },
    /// Touchpad swipe payload
    TouchpadSwipe {
        /// Gesture phase
        phase: GesturePhase,
        /// Number of fingers on the touchpad
        n_fingers: u8,
        /// Focal point delta along X
        dx: f64,
        /// Focal point delta along Y
        dy: f64,
    },
    /// Touchpad pinch payload
    TouchpadPinch {
        /// Gesture phase
        phase: GesturePhase,
        /// Number of fingers on the touchpad
        n_fingers: u8,
        /// Focal point delta along X
        dx: f64,
        /// Focal point delta along Y
        dy: f64,
        /// Rotation delta in degrees
        angle_delta: f64,
        /// Scale relative to the gesture start
        scale: f64,
    },
}

/// Input event as delivered by the platform event source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event time in milliseconds
    pub time: u32,
    /// Source device
    pub device: DeviceId,
    /// Modifier and button state mask
    pub state: u32,
    /// Pointer X relative to the surface
    pub x: f64,
    /// Pointer Y relative to the surface
    pub y: f64,
    /// Pointer X relative to the root window
    pub x_root: f64,
    /// Pointer Y relative to the root window
    pub y_root: f64,
    /// Kind-specific payload
    pub details: EventDetails,
}

impl Event {
    fn with_details(device: DeviceId, time: u32, details: EventDetails) -> Self {
        Self {
            time,
            device,
            state: 0,
            x: 0.0,
            y: 0.0,
            x_root: 0.0,
            y_root: 0.0,
            details,
        }
    }

    /// Create a smooth scroll update with zero deltas
    pub fn scroll(device: DeviceId, time: u32) -> Self {
        Self::with_details(
            device,
            time,
            EventDetails::Scroll {
                direction: ScrollDirection::Smooth,
                delta_x: 0.0,
                delta_y: 0.0,
                is_stop: false,
            },
        )
    }

    /// Create the zero-delta scroll event that ends a scroll sequence
    pub fn scroll_stop(device: DeviceId, time: u32) -> Self {
        Self::with_details(
            device,
            time,
            EventDetails::Scroll {
                direction: ScrollDirection::Smooth,
                delta_x: 0.0,
                delta_y: 0.0,
                is_stop: true,
            },
        )
    }

    /// Create a touchpad swipe event in the given phase
    pub fn swipe(device: DeviceId, time: u32, phase: GesturePhase) -> Self {
        Self::with_details(
            device,
            time,
            EventDetails::TouchpadSwipe {
                phase,
                n_fingers: 3,
                dx: 0.0,
                dy: 0.0,
            },
        )
    }

    /// Create a touchpad pinch event in the given phase
    pub fn pinch(device: DeviceId, time: u32, phase: GesturePhase) -> Self {
        Self::with_details(
            device,
            time,
            EventDetails::TouchpadPinch {
                phase,
                n_fingers: 2,
                dx: 0.0,
                dy: 0.0,
                angle_delta: 0.0,
                scale: 1.0,
            },
        )
    }

    /// Set surface and root coordinates to the same point
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self.x_root = x;
        self.y_root = y;
        self
    }

    /// Set root coordinates independently of the surface coordinates
    pub fn with_root_position(mut self, x_root: f64, y_root: f64) -> Self {
        self.x_root = x_root;
        self.y_root = y_root;
        self
    }

    /// Set the movement delta (`delta_x`/`delta_y` for scroll, `dx`/`dy` otherwise)
    pub fn with_delta(mut self, delta_x: f64, delta_y: f64) -> Self {
        match &mut self.details {
            EventDetails::Scroll {
                delta_x: sx,
                delta_y: sy,
                ..
            } => {
                *sx = delta_x;
                *sy = delta_y;
            }
            EventDetails::TouchpadSwipe { dx, dy, .. }
            | EventDetails::TouchpadPinch { dx, dy, .. } => {
                *dx = delta_x;
                *dy = delta_y;
            }
        }
        self
    }

    /// Set rotation delta and scale (pinch only, ignored otherwise)
    pub fn with_pinch(mut self, angle_delta: f64, scale: f64) -> Self {
        if let EventDetails::TouchpadPinch {
            angle_delta: a,
            scale: s,
            ..
        } = &mut self.details
        {
            *a = angle_delta;
            *s = scale;
        }
        self
    }

    /// Set the finger count (touchpad gestures only, ignored otherwise)
    pub fn with_fingers(mut self, fingers: u8) -> Self {
        match &mut self.details {
            EventDetails::TouchpadSwipe { n_fingers, .. }
            | EventDetails::TouchpadPinch { n_fingers, .. } => *n_fingers = fingers,
            EventDetails::Scroll { .. } => {}
        }
        self
    }

    /// Set the modifier state mask
    pub fn with_state(mut self, state: u32) -> Self {
        self.state = state;
        self
    }

    /// Event kind
    pub fn kind(&self) -> EventKind {
        match self.details {
            EventDetails::Scroll { .. } => EventKind::Scroll,
            EventDetails::TouchpadSwipe { .. } => EventKind::TouchpadSwipe,
            EventDetails::TouchpadPinch { .. } => EventKind::TouchpadPinch,
        }
    }

    /// Event time in milliseconds
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Replace the event time
    pub fn set_time(&mut self, time: u32) {
        self.time = time;
    }

    /// Source device
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Modifier state mask
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Replace the modifier state mask
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }

    /// Gesture phase for touchpad events, `None` for scroll
    pub fn phase(&self) -> Option<GesturePhase> {
        match self.details {
            EventDetails::TouchpadSwipe { phase, .. } | EventDetails::TouchpadPinch { phase, .. } => {
                Some(phase)
            }
            EventDetails::Scroll { .. } => None,
        }
    }

    /// Whether this is the scroll event that ends a scroll sequence
    pub fn is_scroll_stop(&self) -> bool {
        matches!(self.details, EventDetails::Scroll { is_stop: true, .. })
    }

    /// Classify the event as gesture start, update or stop
    pub fn gesture_role(&self) -> GestureRole {
        match self.phase() {
            Some(GesturePhase::Begin) => GestureRole::Start,
            Some(GesturePhase::End | GesturePhase::Cancel) => GestureRole::Stop,
            Some(GesturePhase::Update) => GestureRole::Update,
            None if self.is_scroll_stop() => GestureRole::Stop,
            None => GestureRole::Update,
        }
    }

    /// Interpolation layout of this event's kind
    pub fn layout(&self) -> &'static FieldLayout {
        layout_for(self.kind())
    }

    /// Read a numeric field, `None` if this kind has no such field
    pub fn field(&self, field: Field) -> Option<f64> {
        match (field, &self.details) {
            (Field::X, _) => Some(self.x),
            (Field::Y, _) => Some(self.y),
            (Field::XRoot, _) => Some(self.x_root),
            (Field::YRoot, _) => Some(self.y_root),
            (Field::DeltaX, EventDetails::Scroll { delta_x, .. }) => Some(*delta_x),
            (Field::DeltaY, EventDetails::Scroll { delta_y, .. }) => Some(*delta_y),
            (Field::Dx, EventDetails::TouchpadSwipe { dx, .. })
            | (Field::Dx, EventDetails::TouchpadPinch { dx, .. }) => Some(*dx),
            (Field::Dy, EventDetails::TouchpadSwipe { dy, .. })
            | (Field::Dy, EventDetails::TouchpadPinch { dy, .. }) => Some(*dy),
            (Field::AngleDelta, EventDetails::TouchpadPinch { angle_delta, .. }) => {
                Some(*angle_delta)
            }
            (Field::Scale, EventDetails::TouchpadPinch { scale, .. }) => Some(*scale),
            _ => None,
        }
    }

    /// Write a numeric field, returns `false` if this kind has no such field
    pub fn set_field(&mut self, field: Field, value: f64) -> bool {
        let slot = match (field, &mut self.details) {
            (Field::X, _) => &mut self.x,
            (Field::Y, _) => &mut self.y,
            (Field::XRoot, _) => &mut self.x_root,
            (Field::YRoot, _) => &mut self.y_root,
            (Field::DeltaX, EventDetails::Scroll { delta_x, .. }) => delta_x,
            (Field::DeltaY, EventDetails::Scroll { delta_y, .. }) => delta_y,
            (Field::Dx, EventDetails::TouchpadSwipe { dx, .. })
            | (Field::Dx, EventDetails::TouchpadPinch { dx, .. }) => dx,
            (Field::Dy, EventDetails::TouchpadSwipe { dy, .. })
            | (Field::Dy, EventDetails::TouchpadPinch { dy, .. }) => dy,
            (Field::AngleDelta, EventDetails::TouchpadPinch { angle_delta, .. }) => angle_delta,
            (Field::Scale, EventDetails::TouchpadPinch { scale, .. }) => scale,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Values of all fields in a category, in layout order
    pub fn values(&self, category: Category) -> Vec<f64> {
        self.layout()
            .fields(category)
            .iter()
            .filter_map(|field| self.field(*field))
            .collect()
    }

    /// Overwrite all fields in a category, in layout order
    ///
    /// Fails without touching the event if `values` does not match the
    /// layout length.
    pub fn set_values(&mut self, category: Category, values: &[f64]) -> Result<()> {
        let fields = self.layout().fields(category);
        if fields.len() != values.len() {
            warn!(
                "Cannot set {} values of {} event: expected {}, got {}",
                category,
                self.kind(),
                fields.len(),
                values.len()
            );
            return Err(InterpolationError::LengthMismatch {
                expected: fields.len(),
                found: values.len(),
            });
        }

        for (field, value) in fields.iter().zip(values) {
            self.set_field(*field, *value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_roles() {
        let device = DeviceId(1);
        assert_eq!(
            Event::pinch(device, 0, GesturePhase::Begin).gesture_role(),
            GestureRole::Start
        );
        assert_eq!(
            Event::swipe(device, 0, GesturePhase::Update).gesture_role(),
            GestureRole::Update
        );
        assert_eq!(
            Event::swipe(device, 0, GesturePhase::Cancel).gesture_role(),
            GestureRole::Stop
        );
        assert_eq!(
            Event::pinch(device, 0, GesturePhase::End).gesture_role(),
            GestureRole::Stop
        );
        assert_eq!(Event::scroll(device, 0).gesture_role(), GestureRole::Update);
        assert_eq!(
            Event::scroll_stop(device, 0).gesture_role(),
            GestureRole::Stop
        );
    }

    #[test]
    fn test_values_follow_layout() {
        let event = Event::pinch(DeviceId(1), 10, GesturePhase::Update)
            .with_position(1.0, 2.0)
            .with_root_position(11.0, 12.0)
            .with_delta(0.5, -0.5)
            .with_pinch(3.0, 1.25);

        assert_eq!(
            event.values(Category::Absolute),
            vec![1.0, 2.0, 11.0, 12.0, 1.25]
        );
        assert_eq!(event.values(Category::Relative), vec![0.5, -0.5, 3.0]);
    }

    #[test]
    fn test_set_values_roundtrip() {
        let mut event = Event::scroll(DeviceId(1), 10);
        event.set_values(Category::Relative, &[4.0, 5.0]).unwrap();
        assert_eq!(event.field(Field::DeltaX), Some(4.0));
        assert_eq!(event.field(Field::DeltaY), Some(5.0));
    }

    #[test]
    fn test_set_values_length_mismatch() {
        let mut event = Event::scroll(DeviceId(1), 10).with_delta(1.0, 2.0);
        let result = event.set_values(Category::Relative, &[4.0, 5.0, 6.0]);
        assert!(matches!(
            result,
            Err(InterpolationError::LengthMismatch {
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(event.values(Category::Relative), vec![1.0, 2.0]);
    }

    #[test]
    fn test_field_absent_for_kind() {
        let mut event = Event::scroll(DeviceId(1), 10);
        assert_eq!(event.field(Field::Scale), None);
        assert!(!event.set_field(Field::AngleDelta, 1.0));
    }
}
