//! # splitfetch
//!
//! Concurrent range-based file downloads.
//!
//! The size of a remote resource is resolved with a `HEAD` request, the
//! resource is split into contiguous byte ranges and every range is fetched
//! concurrently with an HTTP range request and written at its own offset in
//! the output file. See [`shared::download_manager::DownloadManager`].

pub mod features;
pub mod shared;
pub mod utils;
