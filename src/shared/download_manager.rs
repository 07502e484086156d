//! # Download Manager
//!
//! This module defines the `DownloadManager` struct, which resolves the size of
//! a remote resource, splits it into byte ranges and fetches every range
//! concurrently into one output file.
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use derive_getters::Getters;
use futures::StreamExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::shared::errors::SplitFetchError;
use crate::shared::fs::local::OutputFile;
use crate::shared::network::RangeTransport;
use crate::shared::progress_tracker::{NoopTracker, ProgressTracker};
use crate::shared::split_parts::{ByteRange, DownloadPlan, split_parts};

/// Outcome of one successful chunk task.
#[derive(Debug, Clone, Getters)]
pub struct ChunkReport {
    index: usize,
    range: ByteRange,
    bytes_written: u64,
}

/// Outcome of a complete download.
#[derive(Debug, Clone, Getters)]
pub struct DownloadSummary {
    total_size: u64,
    chunks: usize,
    elapsed: Duration,
}

/// Runs range downloads over an injected transport.
///
/// The transport is shared by every chunk task, so a single HTTP client (and
/// its connection pool) serves the whole download.
pub struct DownloadManager<T> {
    transport: Arc<T>,
    tracker: Arc<dyn ProgressTracker>,
}

impl<T: RangeTransport + 'static> DownloadManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            tracker: Arc::new(NoopTracker::default()),
        }
    }

    /// Report written bytes to `tracker` instead of discarding them.
    pub fn with_tracker(mut self, tracker: Arc<dyn ProgressTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Size of the resource behind `url` in bytes.
    pub async fn resolve_size(&self, url: &Url) -> Result<u64, SplitFetchError> {
        self.transport.total_bytes(url).await
    }

    /// Resolve, plan and fetch `url` into `output` with `workers` concurrent ranges.
    #[instrument(name = "download", skip(self, output), fields(url = url.as_str(), output = %output.as_ref().display()))]
    pub async fn download(
        &self,
        url: &Url,
        workers: u64,
        output: impl AsRef<Path>,
    ) -> Result<DownloadSummary, SplitFetchError> {
        let started = Instant::now();
        let total_size = self.resolve_size(url).await?;
        info!(total_size, "Download size: {total_size} bytes.");
        self.tracker.start(total_size);

        let plan = split_parts(total_size, workers);
        debug!(chunks = plan.len(), "Planned download.");
        if let Err(err) = self.fetch_all(url, &plan, output).await {
            self.tracker.abandon();
            return Err(err);
        }
        self.tracker.finish();

        Ok(DownloadSummary {
            total_size,
            chunks: plan.len(),
            elapsed: started.elapsed(),
        })
    }

    /// Fetch every range of `plan` concurrently and write it at its offset in `output`.
    ///
    /// All chunk tasks are spawned before any is awaited and every task is
    /// reaped before this returns, even after a failure. The first failure
    /// to complete is returned; the output may then be incomplete.
    #[instrument(name = "fetch_all", skip(self, plan, output), fields(url = url.as_str(), chunks = plan.len()))]
    pub async fn fetch_all(
        &self,
        url: &Url,
        plan: &DownloadPlan,
        output: impl AsRef<Path>,
    ) -> Result<(), SplitFetchError> {
        let output = Arc::new(OutputFile::create(output).await?);

        let mut tasks = JoinSet::new();
        for (index, range) in plan.iter().copied().enumerate() {
            let transport = self.transport.clone();
            let tracker = self.tracker.clone();
            let output = output.clone();
            let url = url.clone();
            tasks.spawn(async move {
                fetch_part(transport.as_ref(), tracker.as_ref(), &output, &url, index, range).await
            });
        }

        let mut first_error: Option<SplitFetchError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(SplitFetchError::from).and_then(|outcome| outcome);
            match outcome {
                Ok(report) => {
                    debug!(
                        index = report.index,
                        range = %report.range,
                        bytes = report.bytes_written,
                        "Chunk completed."
                    );
                }
                Err(err) if first_error.is_none() => {
                    error!(error = %err, stage = %err.stage(), "Chunk failed, waiting for remaining chunks.");
                    first_error = Some(err);
                }
                Err(err) => {
                    warn!(error = %err, "Another chunk failed after the download had already failed.");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("All chunks written to {}.", output.path().display());
                Ok(())
            }
        }
    }
}

/// Fetch one range and copy its body to the range's offset in `output`.
///
/// Never writes outside `range`: a body longer than the range is rejected
/// before the overrunning bytes are written.
async fn fetch_part<T: RangeTransport + ?Sized>(
    transport: &T,
    tracker: &dyn ProgressTracker,
    output: &OutputFile,
    url: &Url,
    index: usize,
    range: ByteRange,
) -> Result<ChunkReport, SplitFetchError> {
    if range.is_empty() {
        return Ok(ChunkReport {
            index,
            range,
            bytes_written: 0,
        });
    }

    debug!(index, range = %range, "Downloading chunk.");
    let mut stream = transport.fetch_range(url, range).await?;

    let expected = range.len();
    let mut writer = output.writer_at(*range.start()).await?;
    let mut written = 0_u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let len = chunk.len() as u64;
        if written + len > expected {
            return Err(SplitFetchError::LengthMismatch {
                url: url.clone(),
                range,
                expected,
                actual: written + len,
            });
        }
        writer.write(&chunk).await?;
        written += len;
        tracker.update(len);
    }
    writer.finish().await?;

    if written != expected {
        return Err(SplitFetchError::LengthMismatch {
            url: url.clone(),
            range,
            expected,
            actual: written,
        });
    }

    debug!(index, range = %range, "Wrote chunk.");
    Ok(ChunkReport {
        index,
        range,
        bytes_written: written,
    })
}
