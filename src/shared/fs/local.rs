use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use derive_getters::Getters;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use crate::shared::errors::SplitFetchError;

/// Size of the in-memory buffer in front of every chunk writer.
const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// The download destination on the local file system.
///
/// Chunk tasks never share a handle: each opens its own [`ChunkWriter`]
/// positioned at the start of its range, so there is no shared cursor to
/// guard.
#[derive(Debug, Clone, Getters)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    /// Create the file, truncating any previous content.
    #[instrument(name = "create_output_file", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, SplitFetchError> {
        let path = path.as_ref().to_path_buf();
        debug!("Creating output file.");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|source| SplitFetchError::CreateOutput {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path })
    }

    /// Open an independent write handle whose cursor starts at `offset`.
    pub async fn writer_at(&self, offset: u64) -> Result<ChunkWriter, SplitFetchError> {
        let write_err = |source: std::io::Error| SplitFetchError::Write {
            path: self.path.clone(),
            offset,
            source,
        };
        let mut handle = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        handle
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(write_err)?; // Let the cursor point to the current range offset.

        Ok(ChunkWriter {
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, handle),
            path: self.path.clone(),
            position: offset,
        })
    }
}

/// Sequential writer over one chunk's region of the output file.
#[derive(Debug)]
pub struct ChunkWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    position: u64,
}

impl ChunkWriter {
    /// Write `buf` at the current position and advance past it.
    pub async fn write(&mut self, buf: &[u8]) -> Result<(), SplitFetchError> {
        self.writer
            .write_all(buf)
            .await
            .map_err(|source| SplitFetchError::Write {
                path: self.path.clone(),
                offset: self.position,
                source,
            })?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Flush buffered bytes to disk and release the handle.
    pub async fn finish(mut self) -> Result<(), SplitFetchError> {
        self.writer
            .flush()
            .await
            .map_err(|source| SplitFetchError::Write {
                path: self.path.clone(),
                offset: self.position,
                source,
            })?;
        self.writer
            .into_inner()
            .sync_data()
            .await
            .map_err(|source| SplitFetchError::Write {
                path: self.path,
                offset: self.position,
                source,
            })
    }
}
