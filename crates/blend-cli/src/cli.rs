//! CLI argument definitions using clap.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use blend_core::config::BlendConfig;
use blend_core::transport::udp::{BEACON_PORT, DEFAULT_BEACON_INTERVAL};
use blend_core::transport::ServiceId;
use blend_core::types::Platform;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// BLEnd CLI - run duty-cycled neighbor discovery and inspect its parameters
#[derive(Parser, Debug)]
#[command(name = "blend-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text", env = "BLEND_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Config file (default: platform config directory)
    #[arg(long, global = true, env = "BLEND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the discovery schedule over UDP beacons
    Run(RunArgs),

    /// Show effective epoch parameters
    Params(ParamsArgs),

    /// Config file management
    Config(ConfigArgs),
}

// ==================== Parameters ====================

/// Command-line overrides for config file values.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamOverrides {
    /// Scan phase length in seconds
    #[arg(long, env = "BLEND_SCAN_DURATION")]
    pub scan_duration: Option<f64>,

    /// Epoch length in seconds (must exceed the scan duration)
    #[arg(long, env = "BLEND_EPOCH_DURATION")]
    pub epoch_duration: Option<f64>,

    /// Aggregation window size in minutes (must divide 60)
    #[arg(long, env = "BLEND_WINDOW_SIZE")]
    pub window_size: Option<u32>,

    /// Grace period in seconds before a closed window is retired
    #[arg(long, env = "BLEND_GRACE")]
    pub grace: Option<u32>,
}

impl ParamOverrides {
    pub fn apply(&self, config: &mut BlendConfig) {
        if let Some(v) = self.scan_duration {
            config.scan_duration_seconds = v;
        }
        if let Some(v) = self.epoch_duration {
            config.epoch_duration_seconds = v;
        }
        if let Some(v) = self.window_size {
            config.window_size_minutes = v;
        }
        if let Some(v) = self.grace {
            config.retirement_grace_seconds = v;
        }
    }
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub params: ParamOverrides,
}

// ==================== Run ====================

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamOverrides,

    /// Run time in seconds (0 = until Ctrl+C)
    #[arg(short, long, default_value = "0")]
    pub duration: u64,

    /// Seconds between window reads
    #[arg(long, default_value = "5")]
    pub poll: u64,

    /// Start in continuous (background) mode
    #[arg(long)]
    pub background: bool,

    /// Advertise as this platform
    #[arg(long, value_enum, default_value = "apple")]
    pub advertise_as: PlatformArg,

    /// UDP beacon port
    #[arg(long, default_value_t = BEACON_PORT)]
    pub port: u16,

    /// Broadcast address for beacons
    #[arg(long, default_value = "255.255.255.255")]
    pub broadcast: Ipv4Addr,

    /// Beacon interval while advertising, in milliseconds
    #[arg(long, default_value_t = DEFAULT_BEACON_INTERVAL.as_millis() as u64)]
    pub beacon_interval: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformArg {
    Apple,
    Android,
}

impl PlatformArg {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformArg::Apple => Platform::Apple,
            PlatformArg::Android => Platform::Android,
        }
    }

    pub fn service(&self) -> ServiceId {
        match self {
            PlatformArg::Apple => ServiceId::Apple,
            PlatformArg::Android => ServiceId::Android,
        }
    }
}

// ==================== Config ====================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init(ConfigInitArgs),

    /// Show the loaded config file
    Show,

    /// Print the config file path
    Path,
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub params: ParamOverrides,
}
