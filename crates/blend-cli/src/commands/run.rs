//! Run command implementation.
//!
//! Drives an epoch scheduler over the UDP beacon transport and prints the
//! current discovery window whenever its counts or closed state change.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use blend_core::config::EpochParameters;
use blend_core::scheduler::EpochScheduler;
use blend_core::transport::{event_channel, LocalIdentity, UdpBeaconOptions, UdpBeaconTransport};
use blend_core::types::WindowCount;

use crate::cli::RunArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the discovery schedule
pub async fn run_schedule(
    args: RunArgs,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    if args.poll == 0 {
        return Err(CliError::InvalidArgument(
            "--poll must be at least 1 second".to_string(),
        ));
    }
    if args.beacon_interval == 0 {
        return Err(CliError::InvalidArgument(
            "--beacon-interval must be at least 1 ms".to_string(),
        ));
    }

    let formatter = get_formatter(json);
    let config = load_config(config_path, &args.params).await?;
    let params = config.parameters()?;

    let service = args.advertise_as.service();
    let identity = LocalIdentity::generate(args.advertise_as.platform());
    let node_id = identity.node_id(service).unwrap_or_default();

    let mut options = UdpBeaconOptions::new(identity);
    options.port = args.port;
    options.broadcast_addr = args.broadcast;
    options.broadcast_port = args.port;
    options.beacon_interval = Duration::from_millis(args.beacon_interval);

    let (sink, events) = event_channel();
    let transport = UdpBeaconTransport::bind(options, sink)?;
    let scheduler = EpochScheduler::builder(params)
        .advertise_service(service)
        .spawn(transport, events);

    info!(
        node_id = %node_id,
        service = %service,
        port = args.port,
        "Starting discovery schedule"
    );
    println!(
        "{}",
        formatter.format_message(&format!(
            "Discovering as {} node {} (press Ctrl+C to stop)",
            args.advertise_as.platform(),
            node_id
        ))
    );

    scheduler.start();
    if args.background {
        scheduler.enter_background();
    }

    let stop_after = async {
        match args.duration {
            0 => std::future::pending::<()>().await,
            secs => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
    };
    tokio::pin!(stop_after);

    let mut poll = tokio::time::interval(Duration::from_secs(args.poll));
    let mut reported = ReportedWindow::default();

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if let Some(window) = scheduler.read_latest_window().await {
                    let closed = is_closed(&window, &params);
                    if reported.update(window, closed) {
                        println!("{}", formatter.format_window(&window, closed));
                    }
                }
            }
            _ = &mut stop_after => {
                info!("Run duration elapsed");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                break;
            }
        }
    }

    scheduler.stop();
    if let Some(status) = scheduler.status().await {
        println!("{}", formatter.format_status(&status));
    }

    let remaining = scheduler.shutdown().await;
    println!("{}", formatter.format_windows(&remaining));

    Ok(())
}

/// The last window line printed, so unchanged reads stay quiet.
#[derive(Debug, Default)]
struct ReportedWindow {
    last: Option<(WindowCount, bool)>,
}

impl ReportedWindow {
    /// Record a read; returns whether its counts or closed state changed.
    fn update(&mut self, window: WindowCount, closed: bool) -> bool {
        let current = Some((window, closed));
        if self.last == current {
            return false;
        }
        self.last = current;
        true
    }
}

/// Whether a read would have retired this window.
fn is_closed(window: &WindowCount, params: &EpochParameters) -> bool {
    let age = Utc::now() - window.window_start;
    age.to_std()
        .map(|age| age > params.retirement_horizon())
        .unwrap_or(false)
}
