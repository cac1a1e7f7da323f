//! Errors raised by the session layer itself. Parse failures are not errors
//! here: they are recorded on the session (see `Session::last_error`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionError {
    #[error("Invalid session config: {reason}")]
    Config { reason: String },

    #[error("Failed to start parse worker: {reason}")]
    Worker { reason: String },
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Config {
            reason: err.to_string(),
        }
    }
}
