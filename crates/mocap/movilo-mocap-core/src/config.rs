//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Value the lab exporter writes into every component of an unsampled marker.
pub const DEFAULT_MISSING_SENTINEL: &str = "0.000000";

/// Line that closes the metadata block of a force file.
pub const DEFAULT_HEADER_SENTINEL: &str = "endheader";

/// Knobs shared by the marker and force parsers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseConfig {
    /// Field texts that mark a marker component as "no sample", compared
    /// after trimming.
    pub missing_sentinels: Vec<String>,
    /// Force header terminator, compared case-insensitively.
    pub header_sentinel: String,
}

impl ParseConfig {
    #[inline]
    pub fn is_missing_sentinel(&self, field: &str) -> bool {
        self.missing_sentinels.iter().any(|s| s == field)
    }

    #[inline]
    pub fn is_header_sentinel(&self, line: &str) -> bool {
        line.trim().eq_ignore_ascii_case(&self.header_sentinel)
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            missing_sentinels: vec![DEFAULT_MISSING_SENTINEL.to_string()],
            header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
        }
    }
}
