use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error; // A popular crate for defining errors
use url::Url;

use crate::shared::split_parts::ByteRange;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Client configuration and output file creation.
    Setup,
    SizeResolution,
    Fetch,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::SizeResolution => "size resolution",
            Stage::Fetch => "fetch",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SplitFetchError {
    #[error("Network connection error for {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest_middleware::Error,
    },

    #[error("Server answered HEAD {url} with status {status}")]
    ResolveStatus { url: Url, status: StatusCode },

    #[error("Can't determine download size, {url} sent no Content-Length header")]
    MissingSize { url: Url },

    #[error("Can't determine download size, {url} sent invalid Content-Length {value:?}")]
    InvalidSize { url: Url, value: String },

    #[error("Unexpected status {status} from {url} for range {range}, expected 206 Partial Content")]
    UnexpectedStatus {
        url: Url,
        range: ByteRange,
        status: StatusCode,
    },

    #[error("Server answered range {range} of {url} with Content-Range {content_range:?}")]
    ContentRangeMismatch {
        url: Url,
        range: ByteRange,
        content_range: String,
    },

    #[error("Range request to {url} for range {range} failed: {source}")]
    Request {
        url: Url,
        range: ByteRange,
        #[source]
        source: reqwest_middleware::Error,
    },

    #[error("Can't read response body from {url} for range {range}: {source}")]
    Body {
        url: Url,
        range: ByteRange,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server sent {actual} bytes for range {range} of {url}, expected {expected}")]
    LengthMismatch {
        url: Url,
        range: ByteRange,
        expected: u64,
        actual: u64,
    },

    #[error("Can't create output file {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Can't write to {} at offset {offset}: {source}", path.display())]
    Write {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Download task failed to complete: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SplitFetchError {
    /// The stage of the download that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            SplitFetchError::Transport { .. }
            | SplitFetchError::ResolveStatus { .. }
            | SplitFetchError::MissingSize { .. }
            | SplitFetchError::InvalidSize { .. } => Stage::SizeResolution,
            SplitFetchError::UnexpectedStatus { .. }
            | SplitFetchError::ContentRangeMismatch { .. }
            | SplitFetchError::Request { .. }
            | SplitFetchError::Body { .. }
            | SplitFetchError::LengthMismatch { .. }
            | SplitFetchError::TaskJoin(_) => Stage::Fetch,
            SplitFetchError::Write { .. } => Stage::Write,
            SplitFetchError::CreateOutput { .. } | SplitFetchError::Config(_) => Stage::Setup,
        }
    }
}
