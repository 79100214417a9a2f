//! Command implementations.

pub mod config;
pub mod params;
pub mod run;

pub use config::run_config;
pub use params::run_params;
pub use run::run_schedule;

use std::path::{Path, PathBuf};

use blend_core::config::{default_config_path, BlendConfig};
use tracing::debug;

use crate::cli::ParamOverrides;
use crate::error::CliError;

/// Resolve the config file: the explicit `--config` path, else the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or_else(|| {
            CliError::Other("Could not determine a config directory; pass --config".to_string())
        }),
    }
}

/// Load the effective config and apply command-line overrides.
///
/// An explicit `--config` file must exist. The default location is optional.
pub async fn load_config(
    explicit: Option<&Path>,
    overrides: &ParamOverrides,
) -> Result<BlendConfig, CliError> {
    let mut config = match explicit {
        Some(path) => BlendConfig::load(path).await?,
        None => match default_config_path() {
            Some(path) => BlendConfig::load_or_default(&path).await?,
            None => BlendConfig::default(),
        },
    };

    overrides.apply(&mut config);
    debug!(?config, "Effective config");
    Ok(config)
}
