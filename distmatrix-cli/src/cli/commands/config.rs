use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use crate::config::{Config, config_path, write_default_config};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(cmd: ConfigCommands, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", text.trim_end());
        }
        ConfigCommands::Path => {
            let path = config_path();
            let marker = if path.exists() {
                "".normal()
            } else {
                " (not created yet)".dimmed()
            };
            println!("{}{}", path.display(), marker);
        }
        ConfigCommands::Init { force } => {
            let path = write_default_config(force)?;
            println!("Wrote default config to {}", path.display().to_string().bright_green());
        }
    }
    Ok(())
}
