use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use super::cli::LocalArgs;
use crate::shared::download_manager::{DownloadManager, DownloadSummary};
use crate::shared::errors::SplitFetchError;
use crate::shared::network::http::HttpAdapter;
use crate::shared::progress_tracker::CliProgressTracker;

/// Download `args.url` into `args.output` with a progress bar on the terminal.
///
/// The outcome is logged here; callers should not report the error again.
pub async fn handle(args: LocalArgs) -> Result<DownloadSummary> {
    let url = args.url.clone();
    let output = args.output.clone();

    let result = run(args).await;
    match &result {
        Ok(summary) => {
            info!(
                total_size = summary.total_size(),
                chunks = summary.chunks(),
                elapsed = ?summary.elapsed(),
                "Saved {} to {}.",
                url,
                output.display()
            );
        }
        Err(err) => match err.downcast_ref::<SplitFetchError>() {
            Some(download_err) => {
                error!(stage = %download_err.stage(), url = %url, "Download failed: {err:#}");
            }
            None => error!(url = %url, "Download failed: {err:#}"),
        },
    }
    result
}

async fn run(args: LocalArgs) -> Result<DownloadSummary> {
    let transport = HttpAdapter::new(args.http_args)?;
    let tracker = CliProgressTracker::new(args.output.clone())?;
    let manager = DownloadManager::new(transport).with_tracker(Arc::new(tracker));
    Ok(manager.download(&args.url, args.workers, &args.output).await?)
}
