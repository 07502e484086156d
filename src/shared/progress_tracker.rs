use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::shared::errors::SplitFetchError;

/// Trait for progress tracking that any UI/interface can implement
/// This allows decoupling download logic from specific UI implementations (indicatif, GUI, web, etc.)
///
/// Implementations are shared by every chunk task, so `update` may be called
/// from many tasks at once.
pub trait ProgressTracker: Send + Sync {
    /// Called once the download size is known, before any bytes are written.
    fn start(&self, total_bytes: u64);

    /// Update progress with bytes written by any chunk.
    fn update(&self, bytes_written: u64);

    /// Mark entire download as complete
    fn finish(&self);

    /// Called instead of `finish` when the download fails after `start`.
    fn abandon(&self);
}

/// Tracker that only counts bytes, used when no UI is attached.
#[derive(Debug, Default)]
pub struct NoopTracker {
    written: AtomicU64,
}

impl NoopTracker {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl ProgressTracker for NoopTracker {
    fn start(&self, _total_bytes: u64) {}

    fn update(&self, bytes_written: u64) {
        self.written.fetch_add(bytes_written, Ordering::Relaxed);
    }

    fn finish(&self) {}

    fn abandon(&self) {}
}

pub struct CliProgressTracker {
    progress: ProgressBar,
    download_path: PathBuf,
    download_name: String,
}

impl CliProgressTracker {
    /// Create a new progress tracker, its length is set by `start`.
    /// # Parameters
    /// * `download_path` - Path to the download.
    pub fn new(download_path: PathBuf) -> Result<Self, SplitFetchError> {
        let progress = ProgressBar::new(0);
        match ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {bytes:>9}/{total_bytes:9} {bytes_per_sec} {msg}",
        ) {
            Ok(style) => progress.set_style(style.progress_chars("##-")),
            Err(err) => warn!(error = %err, "Can't apply progress bar template, using default style."),
        }
        let download_name = download_path
            .file_name()
            .ok_or_else(|| {
                SplitFetchError::Config(format!(
                    "Invalid download path {}, can't get file name",
                    download_path.display()
                ))
            })?
            .to_string_lossy()
            .to_string();
        Ok(Self {
            progress,
            download_path,
            download_name,
        })
    }
}

impl ProgressTracker for CliProgressTracker {
    fn start(&self, total_bytes: u64) {
        self.progress.set_length(total_bytes);
        self.progress.set_message(self.download_name.clone());
    }

    fn update(&self, bytes_written: u64) {
        self.progress.inc(bytes_written);
    }

    fn finish(&self) {
        let total_bytes = self.progress.length().unwrap_or(0);
        self.progress.finish_and_clear();
        let colored_string = format!(
            "Download '{}' Completed.\nTotal size: {}\nFile path: {}",
            self.download_name,
            total_bytes,
            self.download_path.display()
        )
        .purple();
        println!("{colored_string}");

        info!(
            total_bytes,
            download_name = %self.download_name,
            download_path = self.download_path.to_str(),
            "Download completed successfully"
        );
    }

    fn abandon(&self) {
        self.progress.abandon_with_message(format!("{} failed", self.download_name));
    }
}
