//! File kinds and the extensions the file pickers offer for them.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileKind {
    Markers,
    Forces,
}

const MARKER_EXTENSIONS: &[&str] = &["txt", "tsv", "csv"];
const FORCE_EXTENSIONS: &[&str] = &["txt", "tsv", "csv", "mot"];

impl FileKind {
    #[inline]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Markers => MARKER_EXTENSIONS,
            Self::Forces => FORCE_EXTENSIONS,
        }
    }

    /// Whether `filename` carries one of this kind's extensions (case-insensitive).
    pub fn accepts(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Markers => "marker",
            Self::Forces => "force",
        }
    }
}

/// Parsing is content-based; an odd extension only earns a warning.
pub(crate) fn note_extension(kind: FileKind, filename: &str) {
    if !kind.accepts(filename) {
        log::warn!(
            "{} file '{}' has an unrecognized extension (expected one of {:?}); parsing anyway",
            kind.name(),
            filename,
            kind.extensions()
        );
    }
}
