//! Interpolation statistics

use serde::{Deserialize, Serialize};

/// Counters for monitoring the interpolation control
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolationStats {
    /// Frame ticks processed while active
    pub ticks: u64,
    /// Times the control went from inactive to active
    pub sessions_started: u64,
    /// Raw events accepted from the platform
    pub events_routed: u64,
    /// Synthesized update events emitted
    pub updates_emitted: u64,
    /// Gesture start events emitted
    pub starts_emitted: u64,
    /// Gesture stop events emitted (one per completed gesture)
    pub stops_emitted: u64,
    /// Frames skipped because the point preceded the oldest sample
    pub too_early_skips: u64,
    /// Device idle timeouts
    pub timeouts: u64,
    /// Rejected calls that indicate a caller bug
    pub contract_violations: u64,
}

impl InterpolationStats {
    /// Total events delivered to the sink
    pub fn events_emitted(&self) -> u64 {
        self.updates_emitted + self.starts_emitted + self.stops_emitted
    }

    /// Export as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
