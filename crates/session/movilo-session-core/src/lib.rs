//! Movilo session core
//!
//! Glue between the parsers and the playback timeline: one slot per dataset
//! kind with last-requested-wins publishing, a thread-per-request parse
//! worker, and the error-retention policy hosts display (a failed load keeps
//! the previous dataset and reports the error).

pub mod error;
pub mod session;
pub mod slot;
pub mod worker;

pub use error::SessionError;
pub use session::{Session, SessionConfig, SessionEvent};
pub use slot::{DatasetSlot, Generation, Publish};
pub use worker::{parse_kind, ParseOutcome, ParseWorker, ParsedDataset};
