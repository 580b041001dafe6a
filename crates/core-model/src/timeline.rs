use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Seconds, invariant-checked to be strictly positive.
    pub duration: f64,
    /// Frames per second, invariant-checked to be strictly positive.
    pub fps: f64,
    /// Invariant-checked to lie in [0, duration].
    pub playhead_time: f64,
    pub scrubbing: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            duration: 10.0,
            fps: 30.0,
            playhead_time: 0.0,
            scrubbing: false,
        }
    }
}
