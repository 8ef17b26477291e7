//! Upload spooling into a scoped temporary file.
//!
//! The spooled file is deleted when the [`SpooledFile`] (or an unfinished
//! [`Spooler`]) is dropped, on success and on every error path.

use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::ingest::error::PipelineError;

/// Streams upload bytes to disk while enforcing the size ceiling.
#[derive(Debug)]
pub struct Spooler {
    file: NamedTempFile,
    writer: tokio::fs::File,
    written: u64,
    limit: u64,
}

impl Spooler {
    /// Create the backing temp file in `dir`, or the system temp dir.
    pub fn create(dir: Option<&Path>, limit: u64) -> Result<Self, PipelineError> {
        let file = match dir {
            Some(dir) => tempfile::Builder::new().prefix("upload-").tempfile_in(dir)?,
            None => tempfile::Builder::new().prefix("upload-").tempfile()?,
        };
        let writer = tokio::fs::File::from_std(file.as_file().try_clone()?);
        Ok(Self {
            file,
            writer,
            written: 0,
            limit,
        })
    }

    /// Append one chunk. Rejects the upload as soon as it crosses the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), PipelineError> {
        let written = self.written + chunk.len() as u64;
        if written > self.limit {
            return Err(PipelineError::TooLarge { limit: self.limit });
        }
        self.writer.write_all(chunk).await?;
        self.written = written;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand over the file. Zero-byte uploads are rejected here.
    pub async fn finish(mut self) -> Result<SpooledFile, PipelineError> {
        if self.written == 0 {
            return Err(PipelineError::EmptyFile);
        }
        self.writer.flush().await?;
        self.writer.sync_all().await?;
        drop(self.writer);
        Ok(SpooledFile {
            file: self.file,
            len: self.written,
        })
    }
}

/// Fully written upload awaiting ingestion.
#[derive(Debug)]
pub struct SpooledFile {
    file: NamedTempFile,
    len: u64,
}

impl SpooledFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
