//! OffMap CLI - download tile archives and read them offline

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use offmap::config::{config_file_path, ConfigFile};
use offmap::logging::init_logging;
use tracing::info;

use commands::archives::TileArgs;
use commands::common::CommandContext;
use commands::config::ConfigCommands;
use commands::download::DownloadArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "offmap")]
#[command(version, about = "Download map tile archives and read them offline", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.offmap/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download an archive into the store
    Download(DownloadArgs),

    /// List stored archives
    List,

    /// Print the source descriptor of a stored archive as JSON
    Info {
        /// Archive name
        name: String,
    },

    /// Extract a single tile
    Tile(TileArgs),

    /// Delete a stored archive and its style
    Delete {
        /// Archive name
        name: String,
    },

    /// Show storage usage against the quota
    Usage,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&config_path)?;

    let command = match cli.command {
        Commands::Config { command } => {
            return commands::config::run(command, &config_path, &config);
        }
        other => other,
    };

    let _logging = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!(config = %config_path.display(), "OffMap {}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    let ctx = CommandContext::new(config);

    runtime.block_on(async {
        match command {
            Commands::Download(args) => commands::download::run(args, &ctx).await,
            Commands::List => commands::archives::list(&ctx).await,
            Commands::Info { name } => commands::archives::info(&name, &ctx).await,
            Commands::Tile(args) => commands::archives::tile(args, &ctx).await,
            Commands::Delete { name } => commands::archives::delete(&name, &ctx).await,
            Commands::Usage => commands::archives::usage(&ctx).await,
            Commands::Config { .. } => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_arguments() {
        let cli = Cli::try_parse_from([
            "offmap",
            "download",
            "https://tiles.example/paris.pmtiles",
            "paris",
            "--chunk-size",
            "8MB",
            "--style",
            "{\"layers\": []}",
        ])
        .unwrap();

        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.url, "https://tiles.example/paris.pmtiles");
        assert_eq!(args.name, "paris");
        assert_eq!(args.chunk_size, Some(8 * 1024 * 1024));
        assert_eq!(args.style.as_deref(), Some("{\"layers\": []}"));
    }

    #[test]
    fn test_invalid_chunk_size_rejected() {
        let result = Cli::try_parse_from(["offmap", "download", "u", "n", "--chunk-size", "lots"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["offmap", "list", "--config", "/tmp/offmap.ini"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/offmap.ini")));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_tile_arguments() {
        let cli =
            Cli::try_parse_from(["offmap", "tile", "paris", "12", "2074", "1409", "-o", "t.pbf"])
                .unwrap();
        let Commands::Tile(args) = cli.command else {
            panic!("expected tile");
        };
        assert_eq!((args.z, args.x, args.y), (12, 2074, 1409));
        assert_eq!(args.output, Some(PathBuf::from("t.pbf")));
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["offmap", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Path
            }
        ));
        assert!(Cli::try_parse_from(["offmap", "config", "show"]).is_ok());
    }
}
