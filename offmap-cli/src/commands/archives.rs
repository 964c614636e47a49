//! Archive inspection and removal: `list`, `info`, `tile`, `delete`, `usage`.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use offmap::config::format_bytes;
use offmap::engine::{LoaderError, MapLoader};
use offmap::resolver::{ProtocolRequest, ProtocolResponse};
use offmap::storage::storage_usage;
use offmap::{ArchiveStore, OffmapError};
use tokio_util::sync::CancellationToken;

use super::common::{archive_error, CommandContext};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct TileArgs {
    /// Archive name
    pub name: String,
    /// Zoom level
    pub z: u8,
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
    /// Write the tile here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print every stored archive.
pub async fn list(ctx: &CommandContext) -> Result<(), CliError> {
    let archives = ctx.store().list_archives().await?;
    if archives.is_empty() {
        println!("No archives stored in {}", ctx.config.storage.directory.display());
        return Ok(());
    }

    println!("{:<32} {:>10}  STORED", "NAME", "SIZE");
    for archive in archives {
        println!(
            "{:<32} {:>10}  {}",
            archive.name,
            format_bytes(archive.size_bytes),
            archive.created_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

/// Print the source descriptor the engine would receive for `name`.
pub async fn info(name: &str, ctx: &CommandContext) -> Result<(), CliError> {
    let loader = MapLoader::new(ctx.resolver());
    let descriptor = loader.descriptor(name).await.map_err(|e| match e {
        LoaderError::Resolve(e) => archive_error(e),
        other => other.into(),
    })?;
    let json = serde_json::to_string_pretty(&descriptor).map_err(LoaderError::from)?;
    println!("{}", json);
    Ok(())
}

/// Extract one tile.
pub async fn tile(args: TileArgs, ctx: &CommandContext) -> Result<(), CliError> {
    let url = ProtocolRequest::Tile {
        name: args.name.clone(),
        z: args.z,
        x: args.x,
        y: args.y,
    }
    .to_string();

    let response = ctx
        .resolver()
        .resolve(&url, &CancellationToken::new())
        .await
        .map_err(archive_error)?;
    let ProtocolResponse::Tile(bytes) = response else {
        return Err(CliError::NotFound(format!(
            "Tile {}/{}/{} in '{}'",
            args.z, args.x, args.y, args.name
        )));
    };

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|error| CliError::FileWrite {
                    path: path.clone(),
                    error,
                })?;
            eprintln!("Wrote {} to {}", format_bytes(bytes.len() as u64), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|_| stdout.flush())
                .map_err(OffmapError::from)?;
        }
    }
    Ok(())
}

/// Delete an archive and its style.
pub async fn delete(name: &str, ctx: &CommandContext) -> Result<(), CliError> {
    let store = ctx.store();
    let archive = store.delete_archive(name).await?;
    let style = store.delete_style(name).await?;
    if !archive && !style {
        return Err(CliError::NotFound(format!("Archive '{}'", name)));
    }
    println!("Deleted '{}'", name);
    Ok(())
}

/// Print storage consumption.
pub async fn usage(ctx: &CommandContext) -> Result<(), CliError> {
    let store = ctx.store();
    println!("Store: {}", store.root().display());
    match storage_usage(store.as_ref()).await? {
        Some(usage) => {
            println!(
                "  Used:  {} of {} ({:.1}%)",
                format_bytes(usage.used),
                format_bytes(usage.quota),
                usage.percent
            );
        }
        None => {
            println!("  Used:  {}", format_bytes(store.used_bytes().await?));
            println!("  Quota: none");
        }
    }
    Ok(())
}
