//! Movilo mocap core
//!
//! Parsers for lab-exported motion-capture tables: marker trajectories and
//! force-plate recordings in loosely standardized delimited text. Each parse
//! call is pure and all-or-nothing: it returns a complete, validated dataset
//! or a [`ParseError`] that points at the offending line.

pub mod config;
pub mod data;
pub mod error;
pub mod force;
pub mod marker;
pub mod source;
pub mod tokenizer;

// Re-exports for consumers (session, UI adapters)
pub use config::ParseConfig;
pub use data::{
    ForceDataset, ForceFrame, ForceMetadata, ForcePlateSample, Marker, MarkerDataset,
    MarkerFrame, Point3D,
};
pub use error::ParseError;
pub use force::{parse_force_file, parse_force_file_with_config, parse_force_path};
pub use marker::{parse_marker_file, parse_marker_file_with_config, parse_marker_path};
pub use source::FileKind;
pub use tokenizer::{tokenize, Delimiter, Row, Table};

/// Parse result type
pub type Result<T> = core::result::Result<T, ParseError>;
