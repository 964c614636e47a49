//! `offmap config`: show where the configuration lives and what it holds.

use std::path::Path;

use clap::Subcommand;
use offmap::config::ConfigFile;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,
    /// Print the effective configuration, defaults included
    Show,
}

pub fn run(command: ConfigCommands, path: &Path, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist, defaults are in effect)");
            }
        }
        ConfigCommands::Show => print!("{}", config.to_ini_string()),
    }
    Ok(())
}
