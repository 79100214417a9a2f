//! Epoch controller.
//!
//! Owns the transport, the phase timer and the phase itself. Commands, timer
//! firings and transport events are all handled on one task, so every phase
//! transition and every aggregator write happens in a single, serialized
//! order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use super::state::{Phase, SchedulerStatus};
use super::timer::PhaseTimer;
use crate::aggregator::SharedQueue;
use crate::clock::Clock;
use crate::config::EpochParameters;
use crate::error::TransportError;
use crate::transport::{EventStream, RadioState, RadioTransport, ServiceFilter, ServiceId, TransportEvent};
use crate::types::Discovery;

/// Requests from scheduler handles.
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Stop,
    EnterBackground,
    ExitBackground,
    Status(oneshot::Sender<SchedulerStatus>),
    Shutdown(oneshot::Sender<()>),
}

pub(crate) struct Controller<T> {
    params: EpochParameters,
    transport: T,
    filter: ServiceFilter,
    advertise_service: ServiceId,
    queue: SharedQueue,
    clock: Arc<dyn Clock>,
    timer: PhaseTimer,
    phase: Phase,
    schedule_running: bool,
    epochs_completed: u64,
    radio_state: RadioState,
}

impl<T: RadioTransport> Controller<T> {
    pub(crate) fn new(
        params: EpochParameters,
        transport: T,
        filter: ServiceFilter,
        advertise_service: ServiceId,
        queue: SharedQueue,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            params,
            transport,
            filter,
            advertise_service,
            queue,
            clock,
            timer: PhaseTimer::new(),
            phase: Phase::Stopped,
            schedule_running: false,
            epochs_completed: 0,
            radio_state: RadioState::Unknown,
        }
    }

    /// Run until every handle is dropped or a shutdown is requested.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: EventStream,
    ) {
        let mut events_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.timer.fired() => self.on_timer(),

                event = events.recv(), if events_open => match event {
                    Some(event) => self.on_event(event).await,
                    None => {
                        debug!("Transport event stream closed");
                        events_open = false;
                    }
                },

                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.on_command(command) {
                            return;
                        }
                    }
                    None => {
                        self.halt();
                        return;
                    }
                },
            }
        }
    }

    /// Apply one command. Returns `false` once the controller should exit.
    fn on_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::EnterBackground => self.enter_background(),
            Command::ExitBackground => self.exit_background(),
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown(done) => {
                self.halt();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn start(&mut self) {
        self.schedule_running = true;

        if self.phase != Phase::Stopped {
            trace!(phase = %self.phase, "Start while running; pending stop revoked");
            return;
        }

        info!(
            scan_ms = self.params.scan_duration().as_millis() as u64,
            epoch_ms = self.params.epoch_duration().as_millis() as u64,
            "Starting BLEnd schedule"
        );
        self.enter_scan();
    }

    fn stop(&mut self) {
        if !self.schedule_running {
            return;
        }

        self.schedule_running = false;
        info!(phase = %self.phase, "Stop requested; takes effect at next phase boundary");
    }

    fn enter_background(&mut self) {
        match self.phase {
            Phase::Stopped | Phase::Background => {
                trace!(phase = %self.phase, "Enter background ignored");
                return;
            }
            Phase::Scanning | Phase::Advertising => {}
        }

        self.timer.cancel();

        // Leaving the timed schedule is a phase boundary: honor a pending stop.
        if !self.schedule_running {
            self.halt();
            info!("Pending stop honored on entering background");
            return;
        }

        if !self.phase.is_scanning() {
            self.radio_start_scan();
        }
        if !self.phase.is_advertising() {
            self.radio_start_advertise();
        }

        self.phase = Phase::Background;
        info!("Entered background: continuous scan and advertise");
    }

    fn exit_background(&mut self) {
        if self.phase != Phase::Background {
            trace!(phase = %self.phase, "Exit background ignored");
            return;
        }

        self.radio_stop_scan();
        self.radio_stop_advertise();
        self.phase = Phase::Stopped;

        if self.schedule_running {
            info!("Exited background: resuming schedule");
            self.enter_scan();
        } else {
            info!("Exited background: schedule stopped");
        }
    }

    fn on_timer(&mut self) {
        match self.phase {
            Phase::Scanning => {
                self.radio_stop_scan();

                if !self.schedule_running {
                    self.phase = Phase::Stopped;
                    info!("Schedule stopped after scan phase");
                    return;
                }

                self.radio_start_advertise();
                self.timer.arm(self.params.advertise_duration());
                self.phase = Phase::Advertising;
                debug!(epoch = self.epochs_completed, "Scan -> advertise");
            }
            Phase::Advertising => {
                self.radio_stop_advertise();
                self.epochs_completed += 1;

                if !self.schedule_running {
                    self.phase = Phase::Stopped;
                    info!(epochs = self.epochs_completed, "Schedule stopped after advertise phase");
                    return;
                }

                debug!(epoch = self.epochs_completed, "Advertise -> scan");
                self.enter_scan();
            }
            Phase::Stopped | Phase::Background => {
                warn!(phase = %self.phase, "Timer fired with no timed phase active");
            }
        }
    }

    async fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Discovered(discovery) => self.on_discovery(discovery).await,
            TransportEvent::StateChanged(state) => {
                if state.is_available() {
                    info!(%state, "Radio state changed");
                } else {
                    warn!(%state, "Radio state changed; radio calls will be ineffective");
                }
                self.radio_state = state;
            }
        }
    }

    async fn on_discovery(&mut self, discovery: Discovery) {
        if !self.phase.is_scanning() {
            trace!(
                node_id = %discovery.node_id,
                phase = %self.phase,
                "Discovery outside scan phase dropped"
            );
            return;
        }

        let window_start = self.params.window_size().window_start(self.clock.now());
        debug!(
            node_id = %discovery.node_id,
            platform = %discovery.platform,
            window = %window_start,
            "Neighbor discovered"
        );

        self.queue
            .lock()
            .await
            .record(window_start, &discovery.node_id, discovery.platform);
    }

    fn enter_scan(&mut self) {
        self.radio_start_scan();
        self.timer.arm(self.params.scan_duration());
        self.phase = Phase::Scanning;
    }

    /// Stop all radio activity immediately and disarm the timer.
    fn halt(&mut self) {
        self.timer.cancel();
        if self.phase.is_scanning() {
            self.radio_stop_scan();
        }
        if self.phase.is_advertising() {
            self.radio_stop_advertise();
        }
        self.phase = Phase::Stopped;
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            phase: self.phase,
            schedule_running: self.schedule_running,
            is_scanning: self.phase.is_scanning(),
            is_advertising: self.phase.is_advertising(),
            epochs_completed: self.epochs_completed,
            radio_state: self.radio_state,
        }
    }

    fn radio_start_scan(&mut self) {
        let result = self.transport.start_scan(&self.filter);
        log_radio_result("start scan", result);
    }

    fn radio_stop_scan(&mut self) {
        let result = self.transport.stop_scan();
        log_radio_result("stop scan", result);
    }

    fn radio_start_advertise(&mut self) {
        let result = self.transport.start_advertise(self.advertise_service);
        log_radio_result("start advertise", result);
    }

    fn radio_stop_advertise(&mut self) {
        let result = self.transport.stop_advertise();
        log_radio_result("stop advertise", result);
    }
}

/// Transport failures never change the schedule; they are only reported.
fn log_radio_result(operation: &'static str, result: Result<(), TransportError>) {
    if let Err(e) = result {
        warn!(operation, error = %e, "Radio operation failed");
    }
}
