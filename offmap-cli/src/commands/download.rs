//! `offmap download`: fetch an archive into the store with a progress bar.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use offmap::config::{format_bytes, parse_size};
use offmap::download::{DownloadManager, DownloadRequest, ReqwestTransport};
use offmap::{StatusCode, StatusReporter, StatusUpdate};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::common::CommandContext;
use crate::error::CliError;

/// Bar positions per percent.
const STEPS_PER_PERCENT: f64 = 10.0;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}";

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// URL of the archive
    pub url: String,

    /// Name to store the archive under
    pub name: String,

    /// Style to store alongside: inline JSON or a URL
    #[arg(long)]
    pub style: Option<String>,

    /// Bytes per range request, e.g. 8MB (overrides the config file)
    #[arg(long, value_parser = parse_size)]
    pub chunk_size: Option<u64>,
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new((100.0 * STEPS_PER_PERCENT) as u64);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

/// Reporter that drives `bar` from download status updates.
fn bar_reporter(bar: ProgressBar) -> StatusReporter {
    StatusReporter::from_fn(move |update: &StatusUpdate| match update.code {
        StatusCode::Start => bar.set_message(update.message.clone()),
        StatusCode::Progress => {
            if let Some(percent) = update.progress {
                bar.set_position((percent * STEPS_PER_PERCENT).round() as u64);
            }
            bar.set_message(update.message.clone());
        }
        StatusCode::Complete => bar.finish_with_message(update.message.clone()),
        StatusCode::Error | StatusCode::ErrorQuota => {
            bar.abandon_with_message(update.message.clone())
        }
    })
}

pub async fn run(args: DownloadArgs, ctx: &CommandContext) -> Result<(), CliError> {
    let settings = &ctx.config.download;
    let transport = ReqwestTransport::new(settings.timeout(), &settings.user_agent)?;
    let chunk_size = args.chunk_size.or(settings.chunk_size);
    let manager = DownloadManager::new(transport, ctx.store()).with_chunk_size(chunk_size);

    let cancel = CancellationToken::new();
    let mut request = DownloadRequest::new(args.url.as_str(), args.name.as_str())
        .with_cancellation(cancel.clone());
    if let Some(style) = args.style.as_deref() {
        request = request.with_style(style);
    }

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling download");
            cancel.cancel();
        }
    });

    let bar = progress_bar();
    let result = manager.download(request, &bar_reporter(bar.clone())).await;
    interrupt.abort();
    let summary = result?;

    println!(
        "Stored '{}': {} in {} response(s){}",
        summary.name,
        format_bytes(summary.bytes),
        summary.chunks,
        if summary.style_saved { ", with style" } else { "" }
    );
    Ok(())
}
