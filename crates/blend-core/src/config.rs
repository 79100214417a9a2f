//! Protocol configuration.
//!
//! The epoch parameters are the single tuning surface for the latency and
//! energy trade-off. Defaults target 50 co-located devices and a one minute
//! discovery latency at 95% probability.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ConfigError;
use crate::window::WindowSize;

pub const DEFAULT_SCAN_DURATION_SECONDS: f64 = 0.423;
pub const DEFAULT_EPOCH_DURATION_SECONDS: f64 = 30.032;
pub const DEFAULT_WINDOW_SIZE_MINUTES: u32 = 5;
pub const DEFAULT_RETIREMENT_GRACE_SECONDS: u32 = 3;

/// Upper bound for scan and epoch durations
pub const MAX_PHASE_SECONDS: f64 = 86_400.0;

const CONFIG_FILE_NAME: &str = "config.json";

/// On-disk and command-line configuration.
///
/// Fields omitted from a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlendConfig {
    pub scan_duration_seconds: f64,
    pub epoch_duration_seconds: f64,
    pub window_size_minutes: u32,
    pub retirement_grace_seconds: u32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            scan_duration_seconds: DEFAULT_SCAN_DURATION_SECONDS,
            epoch_duration_seconds: DEFAULT_EPOCH_DURATION_SECONDS,
            window_size_minutes: DEFAULT_WINDOW_SIZE_MINUTES,
            retirement_grace_seconds: DEFAULT_RETIREMENT_GRACE_SECONDS,
        }
    }
}

impl BlendConfig {
    /// Validate and derive the immutable epoch parameters.
    pub fn parameters(&self) -> Result<EpochParameters, ConfigError> {
        EpochParameters::try_from(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parameters().map(|_| ())
    }

    /// Read a config file. Omitted fields take defaults; the result is validated.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path).await?;
        let config: BlendConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path).await {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;

        Ok(())
    }
}

/// Get the default config file location.
///
/// Uses the `directories` crate to find the platform-specific config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "blend", "blend")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Validated, immutable epoch parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochParameters {
    scan: Duration,
    epoch: Duration,
    window: WindowSize,
    grace: Duration,
}

impl EpochParameters {
    pub fn scan_duration(&self) -> Duration {
        self.scan
    }

    pub fn epoch_duration(&self) -> Duration {
        self.epoch
    }

    /// Advertise phase length: the remainder of the epoch after scanning.
    pub fn advertise_duration(&self) -> Duration {
        self.epoch - self.scan
    }

    pub fn window_size(&self) -> WindowSize {
        self.window
    }

    pub fn retirement_grace(&self) -> Duration {
        self.grace
    }

    /// Fraction of each epoch spent scanning.
    pub fn scan_duty_cycle(&self) -> f64 {
        self.scan.as_secs_f64() / self.epoch.as_secs_f64()
    }

    /// Seconds after a window start before its record may be retired.
    pub fn retirement_horizon(&self) -> Duration {
        Duration::from_secs(self.window.as_secs() as u64) + self.grace
    }
}

impl TryFrom<&BlendConfig> for EpochParameters {
    type Error = ConfigError;

    fn try_from(config: &BlendConfig) -> Result<Self, Self::Error> {
        let scan = positive_duration("scanDurationSeconds", config.scan_duration_seconds)?;
        let epoch = positive_duration("epochDurationSeconds", config.epoch_duration_seconds)?;

        if epoch <= scan {
            return Err(ConfigError::invalid(
                "epochDurationSeconds",
                format!(
                    "{} must exceed scanDurationSeconds ({})",
                    config.epoch_duration_seconds, config.scan_duration_seconds
                ),
            ));
        }

        Ok(Self {
            scan,
            epoch,
            window: WindowSize::from_minutes(config.window_size_minutes)?,
            grace: Duration::from_secs(u64::from(config.retirement_grace_seconds)),
        })
    }
}

fn positive_duration(name: &'static str, seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::invalid(
            name,
            format!("{} is not a positive number of seconds", seconds),
        ));
    }
    if seconds > MAX_PHASE_SECONDS {
        return Err(ConfigError::invalid(
            name,
            format!("{} exceeds the {} second limit", seconds, MAX_PHASE_SECONDS),
        ));
    }

    Duration::try_from_secs_f64(seconds).map_err(|e| ConfigError::invalid(name, e.to_string()))
}
