//! In-memory transport that records every radio call.

use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use super::service::{ServiceFilter, ServiceId};
use super::{RadioState, RadioTransport};
use crate::error::TransportError;

/// A radio operation issued by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOp {
    StartScan,
    StopScan,
    StartAdvertise,
    StopAdvertise,
}

/// A recorded call and when it happened on the tokio clock.
#[derive(Debug, Clone, Copy)]
pub struct RecordedCall {
    pub op: RadioOp,
    pub at: Instant,
}

#[derive(Debug)]
struct Shared {
    calls: Vec<RecordedCall>,
    state: RadioState,
}

/// Transport that records calls instead of touching a radio.
///
/// Calls still get recorded while the radio is unavailable, but return
/// [`TransportError::Unavailable`].
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    shared: Arc<Mutex<Shared>>,
}

/// Read side of a [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct CallLog {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingTransport {
    pub fn new() -> (Self, CallLog) {
        let shared = Arc::new(Mutex::new(Shared {
            calls: Vec::new(),
            state: RadioState::PoweredOn,
        }));
        (
            Self {
                shared: shared.clone(),
            },
            CallLog { shared },
        )
    }

    fn record(&mut self, op: RadioOp) -> Result<(), TransportError> {
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        shared.calls.push(RecordedCall {
            op,
            at: Instant::now(),
        });

        if shared.state.is_available() {
            Ok(())
        } else {
            Err(TransportError::Unavailable(shared.state))
        }
    }
}

impl RadioTransport for RecordingTransport {
    fn start_scan(&mut self, _filter: &ServiceFilter) -> Result<(), TransportError> {
        self.record(RadioOp::StartScan)
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.record(RadioOp::StopScan)
    }

    fn start_advertise(&mut self, _service: ServiceId) -> Result<(), TransportError> {
        self.record(RadioOp::StartAdvertise)
    }

    fn stop_advertise(&mut self) -> Result<(), TransportError> {
        self.record(RadioOp::StopAdvertise)
    }
}

impl CallLog {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    pub fn ops(&self) -> Vec<RadioOp> {
        self.calls().into_iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: RadioOp) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    pub fn clear(&self) {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clear();
    }

    /// Simulate the host radio changing state.
    pub fn set_state(&self, state: RadioState) {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).state = state;
    }
}
