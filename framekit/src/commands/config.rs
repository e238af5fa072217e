use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::{debug, info};

use crate::{configuration::Configuration, FramekitCliError};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write the default configuration
    Init,
    /// Print the effective configuration
    Show,
}

pub fn config_sub_handler(config_path: &Path, subcommand: &ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Init => {
            if config_path.exists() {
                bail!(FramekitCliError::ConfigFileAlreadyExists(config_path.to_path_buf()));
            }
            Configuration::default().save(config_path)?;
            info!("Wrote default configuration to {}", config_path.display());
        },
        ConfigSubcommand::Show => {
            let configuration = match Configuration::load(config_path)? {
                Some(configuration) => configuration,
                None => {
                    debug!("No configuration at {}, showing defaults", config_path.display());
                    Configuration::default()
                },
            };
            println!("{}", serde_json::to_string_pretty(&configuration)?);
        },
    }

    Ok(())
}
