use serde::{Deserialize, Serialize};

/// Flow direction handed to the layout function.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
pub enum Direction {
    /// Top to bottom.
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Left to right.
    #[serde(rename = "LR")]
    LeftRight,
}

/// Tunables for projection and drag interaction. Every field falls back to
/// its default when missing from `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Fraction of the smaller rectangle that must be covered before a node
    /// counts as a drop target.
    pub overlap_threshold: f64,
    /// How long a drop target must stay the same before it is shown.
    pub debounce_ms: u64,
    /// Minimum spacing between geometry samples, one display refresh.
    pub frame_interval_ms: u64,
    /// Blended colors darker than this luma are brightened.
    pub min_luma: f64,
    pub direction: Direction,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.15,
            debounce_ms: 50,
            frame_interval_ms: 16,
            min_luma: 80.0,
            direction: Direction::TopBottom,
        }
    }
}
