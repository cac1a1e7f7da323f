//! Movilo playback core
//!
//! A fixed-timestep timeline that turns irregular wall-clock callbacks into
//! discrete frame advances over a loaded dataset, with a crop window, loop
//! flag and boundary-aware seeking. Single-threaded and free of I/O: the host
//! drives it with commands and `tick(timestamp_ms)` calls.

pub mod config;
pub mod inputs;
pub mod outputs;
pub mod timeline;

pub use config::TimelineConfig;
pub use inputs::TimelineCommand;
pub use outputs::{TickReport, TimelineEvent, TimelineSnapshot};
pub use timeline::Timeline;
