//! Epoch scheduler.
//!
//! Alternates scan and advertise phases on a timer and forwards discoveries
//! made while scanning into the windowed aggregator. All control calls are
//! non-blocking and never fail; illegal calls are no-ops.
//!
//! A stop request is deferred: the schedule keeps its current phase until the
//! phase timer fires, and only that firing stops the radio.

mod controller;
pub mod state;
pub mod timer;

pub use state::{Phase, SchedulerStatus};

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::aggregator::{DiscoveryQueue, SharedQueue};
use crate::clock::{Clock, SystemClock};
use crate::config::EpochParameters;
use crate::transport::{EventStream, RadioTransport, ServiceFilter, ServiceId};
use crate::types::WindowCount;

use controller::{Command, Controller};

/// Builder for [`EpochScheduler`].
pub struct SchedulerBuilder {
    params: EpochParameters,
    filter: ServiceFilter,
    advertise_service: ServiceId,
    clock: Arc<dyn Clock>,
}

impl SchedulerBuilder {
    /// Services to report while scanning. Defaults to all BLEnd services.
    pub fn scan_filter(mut self, filter: ServiceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Service to advertise. Defaults to the Apple service.
    pub fn advertise_service(mut self, service: ServiceId) -> Self {
        self.advertise_service = service;
        self
    }

    /// Wall clock used for window keys. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the controller task. Must be called within a tokio runtime.
    pub fn spawn<T: RadioTransport>(self, transport: T, events: EventStream) -> EpochScheduler {
        let queue = DiscoveryQueue::shared(self.params.window_size());
        let (tx, rx) = mpsc::unbounded_channel();

        let controller = Controller::new(
            self.params,
            transport,
            self.filter,
            self.advertise_service,
            queue.clone(),
            self.clock.clone(),
        );
        let task = tokio::spawn(controller.run(rx, events));

        EpochScheduler {
            handle: SchedulerHandle {
                commands: tx,
                queue,
                clock: self.clock,
                params: self.params,
            },
            task,
        }
    }
}

/// Cloneable control surface of a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    queue: SharedQueue,
    clock: Arc<dyn Clock>,
    params: EpochParameters,
}

impl SchedulerHandle {
    /// Begin the duty-cycled schedule, starting with a scan phase.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Request a stop at the next phase boundary.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Suspend the schedule and scan and advertise continuously.
    pub fn enter_background(&self) {
        self.send(Command::EnterBackground);
    }

    /// Leave continuous mode and resume the schedule if it is still running.
    pub fn exit_background(&self) {
        self.send(Command::ExitBackground);
    }

    /// Read the oldest queued window, retiring it if it has closed.
    ///
    /// Poll this periodically: an open window is returned on every call with
    /// its running counts, a closed window exactly once.
    pub async fn read_latest_window(&self) -> Option<WindowCount> {
        let now = self.clock.now();
        self.queue
            .lock()
            .await
            .read_latest_window(now, self.params.retirement_grace())
    }

    /// Retire and return every closed window, oldest first.
    pub async fn drain_closed_windows(&self) -> Vec<WindowCount> {
        let now = self.clock.now();
        self.queue
            .lock()
            .await
            .drain_closed(now, self.params.retirement_grace())
    }

    /// Snapshot of the scheduler, or `None` if its task has exited.
    pub async fn status(&self) -> Option<SchedulerStatus> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Status(tx)).is_err() {
            return None;
        }
        rx.await.ok()
    }

    pub fn parameters(&self) -> &EpochParameters {
        &self.params
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Scheduler task has exited; command ignored");
        }
    }
}

/// A running epoch scheduler and its controller task.
pub struct EpochScheduler {
    handle: SchedulerHandle,
    task: JoinHandle<()>,
}

impl EpochScheduler {
    pub fn builder(params: EpochParameters) -> SchedulerBuilder {
        SchedulerBuilder {
            params,
            filter: ServiceFilter::default(),
            advertise_service: ServiceId::Apple,
            clock: Arc::new(SystemClock),
        }
    }

    /// Spawn with default options.
    pub fn spawn<T: RadioTransport>(
        params: EpochParameters,
        transport: T,
        events: EventStream,
    ) -> Self {
        Self::builder(params).spawn(transport, events)
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn start(&self) {
        self.handle.start();
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn enter_background(&self) {
        self.handle.enter_background();
    }

    pub fn exit_background(&self) {
        self.handle.exit_background();
    }

    pub async fn read_latest_window(&self) -> Option<WindowCount> {
        self.handle.read_latest_window().await
    }

    pub async fn status(&self) -> Option<SchedulerStatus> {
        self.handle.status().await
    }

    /// Stop the radio immediately, end the controller task and return every
    /// window still queued, open or closed.
    ///
    /// Unlike [`stop`](Self::stop) this does not wait for a phase boundary.
    pub async fn shutdown(self) -> Vec<WindowCount> {
        let (tx, rx) = oneshot::channel();
        if self.handle.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }

        self.handle.queue.lock().await.drain_all()
    }
}

#[cfg(test)]
mod tests;
