//! Params command implementation.

use std::path::Path;

use crate::cli::ParamsArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the params command
pub async fn run_params(
    args: ParamsArgs,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    let config = load_config(config_path, &args.params).await?;
    let params = config.parameters()?;

    println!("{}", formatter.format_params(&config, &params));
    Ok(())
}
