//! # Split Parts
//!
//! This module contains the logic for splitting a download into contiguous
//! byte ranges that can be fetched in parallel.

use std::fmt;

use derive_getters::Getters;

/// A half-open span `[start, end)` of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Getters)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// # Panics
    /// If `start` is past `end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range start {start} is past end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Value of the HTTP `Range` header for this span.
    ///
    /// HTTP ranges are inclusive, so the last requested byte is `end - 1`.
    /// An empty span has no representation and returns `None`.
    pub fn header_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("bytes={}-{}", self.start, self.end - 1))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty at {}>", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end - 1)
        }
    }
}

/// Ordered ranges covering `[0, total_size)` without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct DownloadPlan {
    total_size: u64,
    ranges: Vec<ByteRange>,
}

impl DownloadPlan {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ByteRange> {
        self.ranges.iter()
    }
}

/// Splits a download of `file_size_bytes` into one range per worker.
///
/// Every worker gets `file_size_bytes / workers` bytes and the last worker
/// also takes the remainder, so the last range always ends at
/// `file_size_bytes`. A worker count of zero is treated as one and an empty
/// download yields the single range `{0,0}`.
///
/// # Arguments
///
/// * `file_size_bytes` - The total size of the download in bytes.
/// * `workers` - The number of concurrent range requests.
pub fn split_parts(file_size_bytes: u64, workers: u64) -> DownloadPlan {
    let workers = workers.max(1);
    let base = file_size_bytes / workers;

    let ranges = (0..workers)
        .map(|i| {
            let start = i * base;
            let end = if i == workers - 1 {
                file_size_bytes // last part absorbs the remainder
            } else {
                start + base
            };
            ByteRange::new(start, end)
        })
        .collect();

    DownloadPlan {
        total_size: file_size_bytes,
        ranges,
    }
}
