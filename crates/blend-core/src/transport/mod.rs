//! Radio transport seam.
//!
//! The scheduler is the only caller of a transport's start/stop methods.
//! Transports report back through an [`EventSink`]: discoveries are classified
//! there, so malformed payloads never reach the aggregator.

pub mod advertisement;
pub mod recording;
pub mod service;
pub mod udp;

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TransportError;
use crate::types::{Discovery, Platform};

pub use advertisement::{classify, RawDiscovery};
pub use recording::{CallLog, RadioOp, RecordingTransport};
pub use service::{ServiceFilter, ServiceId};
pub use udp::{LocalIdentity, UdpBeaconOptions, UdpBeaconTransport};

/// A duty-cycled radio that can scan and advertise.
///
/// Calls are made from the scheduler task only and must not block.
pub trait RadioTransport: Send + 'static {
    fn start_scan(&mut self, filter: &ServiceFilter) -> Result<(), TransportError>;

    fn stop_scan(&mut self) -> Result<(), TransportError>;

    fn start_advertise(&mut self, service: ServiceId) -> Result<(), TransportError>;

    fn stop_advertise(&mut self) -> Result<(), TransportError>;
}

/// Power/authorization state reported by the host radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RadioState {
    Unknown,
    Unsupported,
    Unauthorized,
    Resetting,
    PoweredOff,
    PoweredOn,
}

impl RadioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioState::Unknown => "unknown",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::Resetting => "resetting",
            RadioState::PoweredOff => "powered off",
            RadioState::PoweredOn => "powered on",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RadioState::PoweredOn)
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered from a transport to its scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Discovered(Discovery),
    StateChanged(RadioState),
}

/// Sending half handed to a transport at construction.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

/// Receiving half consumed by the scheduler.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Create a connected sink/stream pair.
pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}

impl EventSink {
    /// Deliver an already-parsed discovery.
    pub fn discovered(&self, node_id: impl Into<String>, platform: Platform) {
        let node_id = node_id.into();
        if node_id.is_empty() {
            debug!(%platform, "Dropping discovery with empty node id");
            return;
        }
        self.send(TransportEvent::Discovered(Discovery { node_id, platform }));
    }

    /// Classify a raw advertisement and deliver it if it carries a usable id.
    pub fn raw_discovery(&self, raw: &RawDiscovery) {
        match classify(raw) {
            Some(discovery) => self.send(TransportEvent::Discovered(discovery)),
            None => debug!(service = %raw.service, "Dropping malformed advertisement"),
        }
    }

    pub fn state_changed(&self, state: RadioState) {
        self.send(TransportEvent::StateChanged(state));
    }

    fn send(&self, event: TransportEvent) {
        // The scheduler is gone; there is nobody left to tell.
        let _ = self.tx.send(event);
    }
}
