//! Timeline configuration.

use serde::{Deserialize, Serialize};

/// Initial flags and limits for a [`Timeline`](crate::Timeline).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Loop flag a fresh timeline starts with.
    pub looping: bool,
    /// Events retained between `drain_events` calls; oldest are dropped first.
    pub max_pending_events: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            looping: true,
            max_pending_events: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: TimelineConfig = serde_json::from_str(r#"{ "looping": false }"#).unwrap();
        assert!(!cfg.looping);
        assert_eq!(cfg.max_pending_events, 1024);
    }
}
