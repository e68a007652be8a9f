use std::path::Path;

use salonsync_core::config::ClientConfig;
use salonsync_core::util::normalize_base_url;

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(config_path),
        ConfigCommands::Init {
            api_base_url,
            salon_id,
            force,
        } => run_config_init(config_path, &api_base_url, &salon_id, force),
    }
}

pub fn run_config_show(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    println!("# {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    if let Err(error) = config.validate() {
        eprintln!("Warning: {error}");
    }
    Ok(())
}

/// Write a new config file, keeping unrelated settings of an existing one.
pub fn run_config_init(
    config_path: &Path,
    api_base_url: &str,
    salon_id: &str,
    force: bool,
) -> Result<(), CliError> {
    let exists = config_path.exists();
    if exists && !force {
        return Err(CliError::ConfigExists(config_path.display().to_string()));
    }

    let mut config = if exists {
        ClientConfig::load_from_path(config_path)?
    } else {
        ClientConfig::default()
    };
    config.api_base_url = normalize_base_url(api_base_url).unwrap_or_default();
    config.salon_id = salon_id.trim().to_string();
    config
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;

    config.save_to_path(config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
