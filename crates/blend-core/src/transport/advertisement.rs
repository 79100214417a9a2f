//! Advertisement classification.
//!
//! Apple nodes are identified by the peripheral identifier the host stack
//! assigns them. Android nodes put a random token in the service data, since
//! their service UUID alone is shared by every Android node.

use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::service::ServiceId;
use crate::types::{Discovery, Platform};

/// Regex for peripheral identifiers: a hyphenated 128-bit UUID
const PERIPHERAL_ID_PATTERN: &str =
    r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$";

/// Longest Android token accepted from service data
const MAX_SERVICE_DATA_LEN: usize = 27;

fn peripheral_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(PERIPHERAL_ID_PATTERN).unwrap())
}

/// An advertisement as the radio stack reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiscovery {
    /// Service UUID the advertisement matched.
    pub service: String,
    /// Identifier the host assigned to the advertising peripheral.
    pub peripheral_id: String,
    /// Service data payload, if any.
    #[serde(default)]
    pub service_data: Vec<u8>,
}

/// Turn a raw advertisement into a node id and platform.
///
/// Returns `None` for unknown services, malformed peripheral identifiers and
/// Android advertisements without an embedded token.
pub fn classify(raw: &RawDiscovery) -> Option<Discovery> {
    let service = ServiceId::from_uuid(&raw.service)?;

    match service.platform() {
        Platform::Apple => {
            let id = raw.peripheral_id.trim();
            if !peripheral_id_regex().is_match(id) {
                return None;
            }
            Some(Discovery {
                node_id: id.to_ascii_uppercase(),
                platform: Platform::Apple,
            })
        }
        Platform::Android => {
            if raw.service_data.is_empty() || raw.service_data.len() > MAX_SERVICE_DATA_LEN {
                return None;
            }
            Some(Discovery {
                node_id: hex_token(&raw.service_data),
                platform: Platform::Android,
            })
        }
    }
}

fn hex_token(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
