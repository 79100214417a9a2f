//! BLEnd neighbor discovery over a duty-cycled radio.
//!
//! Nodes alternate short scan phases with long advertise phases on a fixed
//! epoch so that co-located nodes discover each other within a bounded number
//! of epochs. Discoveries are bucketed into fixed wall-clock windows and
//! deduplicated into per-window unique-neighbor counts.
//!
//! ```no_run
//! use blend_core::config::BlendConfig;
//! use blend_core::scheduler::EpochScheduler;
//! use blend_core::transport::{event_channel, LocalIdentity, UdpBeaconOptions, UdpBeaconTransport};
//! use blend_core::types::Platform;
//!
//! # async fn demo() -> blend_core::error::Result<()> {
//! let params = BlendConfig::default().parameters()?;
//! let (sink, events) = event_channel();
//! let options = UdpBeaconOptions::new(LocalIdentity::generate(Platform::Apple));
//! let transport = UdpBeaconTransport::bind(options, sink)?;
//!
//! let scheduler = EpochScheduler::spawn(params, transport, events);
//! scheduler.start();
//! if let Some(window) = scheduler.read_latest_window().await {
//!     println!("{} neighbors since {}", window.total(), window.window_start);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod transport;
pub mod types;
pub mod window;

pub use aggregator::DiscoveryQueue;
pub use config::{BlendConfig, EpochParameters};
pub use error::{ConfigError, CoreError, TransportError};
pub use scheduler::{EpochScheduler, Phase, SchedulerHandle, SchedulerStatus};
pub use types::{Platform, WindowCount};
