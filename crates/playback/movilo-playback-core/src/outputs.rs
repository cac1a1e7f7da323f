//! Output contracts from the timeline: per-tick reports, semantic events and
//! a read-only snapshot for display collaborators.

use serde::{Deserialize, Serialize};

/// What a single `tick` did.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    /// Frame advances performed, wraps included.
    pub steps: usize,
    /// Playback wrapped from the crop end back to the crop start.
    pub wrapped: bool,
    /// Playback reached the crop end with looping off and stopped.
    pub ended: bool,
}

/// Discrete signals emitted by commands and ticks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub enum TimelineEvent {
    Started { frame: usize },
    Paused { frame: usize },
    Wrapped { from: usize, to: usize },
    Ended { frame: usize },
    FrameChanged { from: usize, to: usize },
}

/// Serializable view of the timeline state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TimelineSnapshot {
    pub current_frame: usize,
    pub crop_start: usize,
    pub crop_end: usize,
    pub sequence_end: usize,
    pub frame_count: usize,
    pub playing: bool,
    pub looping: bool,
    /// Milliseconds per frame; `None` disables playback.
    pub step_millis: Option<f64>,
    /// Sample times (seconds) at crop start, current frame and crop end.
    pub crop_start_time: Option<f64>,
    pub current_time: Option<f64>,
    pub crop_end_time: Option<f64>,
}
