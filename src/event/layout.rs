//! Field layout registry
//!
//! Maps each [`EventKind`] to the ordered list of fields that take part in
//! interpolation, split into absolute readings and relative deltas. Keeping
//! this table closed and in one place means the history code never has to
//! branch on the event kind.
//!
//! | Kind | Absolute | Relative |
//! |------|----------|----------|
//! | Scroll | x, y, x_root, y_root | delta_x, delta_y |
//! | TouchpadSwipe | x, y, x_root, y_root | dx, dy |
//! | TouchpadPinch | x, y, x_root, y_root, scale | dx, dy, angle_delta |

use serde::{Deserialize, Serialize};

use super::EventKind;

/// Interpolation category of a numeric event field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The field holds the true current reading (position, scale)
    Absolute,
    /// The field holds a delta since the previous event
    Relative,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

/// Numeric event field addressable through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Pointer X relative to the surface
    X,
    /// Pointer Y relative to the surface
    Y,
    /// Pointer X relative to the root window
    XRoot,
    /// Pointer Y relative to the root window
    YRoot,
    /// Smooth scroll delta along X
    DeltaX,
    /// Smooth scroll delta along Y
    DeltaY,
    /// Gesture focal point delta along X
    Dx,
    /// Gesture focal point delta along Y
    Dy,
    /// Pinch rotation delta in degrees
    AngleDelta,
    /// Pinch scale relative to the gesture start
    Scale,
}

/// Ordered absolute and relative fields for one event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Fields holding absolute readings
    pub absolute: &'static [Field],
    /// Fields holding deltas
    pub relative: &'static [Field],
}

impl FieldLayout {
    /// Fields of the given category, in interpolation order
    pub fn fields(&self, category: Category) -> &'static [Field] {
        match category {
            Category::Absolute => self.absolute,
            Category::Relative => self.relative,
        }
    }

    /// Number of fields in the given category
    pub fn len(&self, category: Category) -> usize {
        self.fields(category).len()
    }
}

const POSITION: &[Field] = &[Field::X, Field::Y, Field::XRoot, Field::YRoot];

const SCROLL_LAYOUT: FieldLayout = FieldLayout {
    absolute: POSITION,
    relative: &[Field::DeltaX, Field::DeltaY],
};

const SWIPE_LAYOUT: FieldLayout = FieldLayout {
    absolute: POSITION,
    relative: &[Field::Dx, Field::Dy],
};

const PINCH_LAYOUT: FieldLayout = FieldLayout {
    absolute: &[Field::X, Field::Y, Field::XRoot, Field::YRoot, Field::Scale],
    relative: &[Field::Dx, Field::Dy, Field::AngleDelta],
};

/// Look up the interpolation layout of an event kind
pub fn layout_for(kind: EventKind) -> &'static FieldLayout {
    match kind {
        EventKind::Scroll => &SCROLL_LAYOUT,
        EventKind::TouchpadSwipe => &SWIPE_LAYOUT,
        EventKind::TouchpadPinch => &PINCH_LAYOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_do_not_overlap() {
        for kind in [
            EventKind::Scroll,
            EventKind::TouchpadSwipe,
            EventKind::TouchpadPinch,
        ] {
            let layout = layout_for(kind);
            for field in layout.absolute {
                assert!(
                    !layout.relative.contains(field),
                    "{:?} listed twice for {:?}",
                    field,
                    kind
                );
            }
        }
    }

    #[test]
    fn test_pinch_layout() {
        let layout = layout_for(EventKind::TouchpadPinch);
        assert_eq!(layout.len(Category::Absolute), 5);
        assert_eq!(layout.len(Category::Relative), 3);
        assert_eq!(layout.fields(Category::Relative)[2], Field::AngleDelta);
    }
}
