//! Config file commands implementation.

use std::path::Path;

use blend_core::config::BlendConfig;
use tracing::info;

use crate::cli::{ConfigArgs, ConfigCommands, ConfigInitArgs};
use crate::commands::config_path;
use crate::error::CliError;
use crate::output::{get_formatter, OutputFormatter};

/// Run the config command
pub async fn run_config(
    args: ConfigArgs,
    explicit: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let path = config_path(explicit)?;

    match args.command {
        ConfigCommands::Init(args) => run_init(&path, args, formatter.as_ref()).await,
        ConfigCommands::Show => run_show(&path, formatter.as_ref()).await,
        ConfigCommands::Path => {
            println!("{}", formatter.format_message(&path.display().to_string()));
            Ok(())
        }
    }
}

async fn run_init(
    path: &Path,
    args: ConfigInitArgs,
    formatter: &dyn OutputFormatter,
) -> Result<(), CliError> {
    if path.exists() && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let mut config = BlendConfig::default();
    args.params.apply(&mut config);
    config.save(path).await?;

    info!(path = %path.display(), "Wrote config file");
    println!(
        "{}",
        formatter.format_message(&format!("Config written to {}", path.display()))
    );
    Ok(())
}

async fn run_show(path: &Path, formatter: &dyn OutputFormatter) -> Result<(), CliError> {
    let config = BlendConfig::load(path).await?;
    let params = config.parameters()?;

    println!("{}", formatter.format_params(&config, &params));
    Ok(())
}
