//! Shared types for BLEnd discovery.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform a discovered node advertises from.
///
/// Apple identifiers are connection-scoped UUID strings; Android identifiers
/// are extracted from the advertisement payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apple,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Apple => "apple",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single classified discovery, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub node_id: String,
    pub platform: Platform,
}

/// Unique-neighbor counts for one discovery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCount {
    pub window_start: DateTime<Utc>,
    pub apple_count: usize,
    pub android_count: usize,
}

impl WindowCount {
    pub fn total(&self) -> usize {
        self.apple_count + self.android_count
    }
}
