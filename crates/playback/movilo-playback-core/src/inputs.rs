//! Commands accepted by the timeline.
//!
//! UI adapters translate button presses, slider drags and number cells into
//! these and hand them to [`Timeline::apply`](crate::Timeline::apply).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimelineCommand {
    Play,
    Pause,
    TogglePlay,
    /// Slider-style seek: jumps inside the crop window, nudges one frame
    /// toward an out-of-window target.
    Seek {
        frame: usize,
    },
    /// Number-cell seek: only targets inside the crop window are accepted.
    SeekExact {
        frame: usize,
    },
    SetLooping {
        looping: bool,
    },
    SetCropStart {
        frame: usize,
    },
    SetCropEnd {
        frame: usize,
    },
    ResetCrop,
}
