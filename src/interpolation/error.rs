//! Interpolation Error Types

use thiserror::Error;

/// Result type for interpolation operations
pub type Result<T> = std::result::Result<T, InterpolationError>;

/// Interpolation error types
///
/// Only [`InterpolationError::TooEarly`] is expected during normal operation.
/// The remaining variants indicate a caller bug and are logged where they
/// are raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// The history holds no samples
    #[error("Event history is empty")]
    EmptyHistory,

    /// The interpolation point precedes the oldest sample
    #[error("Interpolation point {point:.3}ms is earlier than the oldest sample ({oldest}ms)")]
    TooEarly {
        /// Requested point in milliseconds
        point: f64,
        /// Oldest sample time in milliseconds
        oldest: u32,
    },

    /// Property vectors of different lengths were combined
    #[error("Property vector length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Length already stored
        expected: usize,
        /// Length supplied
        found: usize,
    },

    /// An update was pushed into a gesture that already has a stop event
    #[error("Gesture already received a stop event")]
    GestureClosed,
}

impl InterpolationError {
    /// Whether this error is part of normal control flow rather than a caller bug
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::TooEarly { .. })
    }
}
