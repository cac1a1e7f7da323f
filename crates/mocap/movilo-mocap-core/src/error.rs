//! Error taxonomy shared by the marker and force parsers.
//!
//! Rows are 1-based source line numbers and columns are 1-based field
//! positions, so every message can point the user at the offending cell.

use serde::{Deserialize, Serialize};

/// Terminal failure of a single parse call. No partial dataset accompanies it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ParseError {
    /// The input had no non-blank line.
    #[error("File is empty")]
    EmptyInput,

    /// The marker label header could not be recovered.
    #[error("Invalid marker header at line {row}: {reason}")]
    HeaderShape { row: usize, reason: String },

    /// A row's field count disagrees with the header.
    #[error("Line {row} has {actual} fields, expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A required numeric field could not be read.
    #[error("Line {row}, column {column}: '{value}' is not a number")]
    NumericField {
        row: usize,
        column: usize,
        value: String,
    },

    /// A sample time went backwards.
    #[error("Line {row}: time {time} is earlier than the previous sample ({previous})")]
    NonMonotonicTime { row: usize, previous: f64, time: f64 },

    /// The force metadata block never reached its terminating line.
    #[error("Force file header is missing its 'endheader' line")]
    MissingHeaderSentinel,

    /// A declared metadata count is absent or not a number.
    #[error("Force file header field '{key}' has invalid value '{value}'")]
    MetadataField { key: String, value: String },

    /// Force columns could not be mapped onto plates.
    #[error("Unrecognized force column layout, missing: {}", .missing.join(", "))]
    UnknownColumnLayout { missing: Vec<String> },

    /// The delimited-text reader rejected a record.
    #[error("Line {row}: {reason}")]
    Tokenize { row: usize, reason: String },

    /// The file could not be read from disk.
    #[error("IO error: {reason}")]
    Io { reason: String },
}

impl ParseError {
    /// Source line the error points at, when it has one.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::HeaderShape { row, .. }
            | Self::RowLengthMismatch { row, .. }
            | Self::NumericField { row, .. }
            | Self::NonMonotonicTime { row, .. }
            | Self::Tokenize { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyInput | Self::Io { .. } => "input",
            Self::HeaderShape { .. }
            | Self::MissingHeaderSentinel
            | Self::MetadataField { .. }
            | Self::UnknownColumnLayout { .. } => "header",
            Self::RowLengthMismatch { .. } | Self::Tokenize { .. } => "layout",
            Self::NumericField { .. } | Self::NonMonotonicTime { .. } => "data",
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_location() {
        let err = ParseError::RowLengthMismatch {
            row: 7,
            expected: 10,
            actual: 9,
        };
        assert_eq!(err.to_string(), "Line 7 has 9 fields, expected 10");
        assert_eq!(err.row(), Some(7));

        let err = ParseError::UnknownColumnLayout {
            missing: vec!["ground_force_vy".into(), "ground_force_pz".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized force column layout, missing: ground_force_vy, ground_force_pz"
        );
        assert_eq!(err.row(), None);
    }

    #[test]
    fn categories() {
        assert_eq!(ParseError::EmptyInput.category(), "input");
        assert_eq!(ParseError::MissingHeaderSentinel.category(), "header");
        assert_eq!(
            ParseError::NonMonotonicTime {
                row: 3,
                previous: 0.2,
                time: 0.1
            }
            .category(),
            "data"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ParseError = io.into();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn serde_roundtrip() {
        let error = ParseError::NumericField {
            row: 4,
            column: 1,
            value: "abc".into(),
        };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: ParseError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
