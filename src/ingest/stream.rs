//! Two-pass streaming ingestion.
//!
//! # Data Flow
//! ```text
//! SpooledFile
//!     → pass 1: count line units in fixed-size byte chunks (nothing retained)
//!     → handle closed
//!     → pass 2: reopen, read line by line (lossy UTF-8)
//!           trim → skip empty → derive (secret input) → ScanItem
//!     → ProgressEvent(ingest) every chunk_size lines and once at 100%
//! ```

use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::blockchain::KeyDerivation;
use crate::ingest::error::PipelineError;
use crate::ingest::upload::SpooledFile;
use crate::observability::metrics;
use crate::progress::{Chunk, Phase, ProgressEvent};
use crate::scanner::batch::percent;
use crate::scanner::{InputKind, ScanItem, ScanStats};

/// Bytes read per step of the counting pass.
const COUNT_BUFFER: usize = 64 * 1024;

/// Turns an uploaded file into scan items with progress.
#[derive(Clone)]
pub struct StreamIngestor {
    chunk_size: usize,
    kind: InputKind,
    deriver: Arc<dyn KeyDerivation>,
}

impl StreamIngestor {
    pub fn new(chunk_size: usize, kind: InputKind, deriver: Arc<dyn KeyDerivation>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            kind,
            deriver,
        }
    }

    /// Run the counting pass and open the processing pass.
    ///
    /// Fails with [`PipelineError::EmptyFile`] before any event exists.
    pub async fn open<'a>(&self, source: &'a SpooledFile) -> Result<IngestRun<'a>, PipelineError> {
        let total = count_lines(source.path()).await?;
        if total == 0 {
            return Err(PipelineError::EmptyFile);
        }
        tracing::debug!(lines = total, bytes = source.len(), "Counted upload lines");

        let file = File::open(source.path()).await?;
        Ok(IngestRun {
            _source: source,
            reader: BufReader::new(file),
            line: Vec::new(),
            total,
            processed: 0,
            entries: 0,
            chunk_size: self.chunk_size,
            kind: self.kind,
            deriver: self.deriver.clone(),
            items: Vec::new(),
            stats: ScanStats::default(),
            finished: false,
        })
    }
}

impl std::fmt::Debug for StreamIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamIngestor")
            .field("chunk_size", &self.chunk_size)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Count newline-terminated units; a trailing unterminated line counts too.
async fn count_lines(path: &Path) -> Result<usize, PipelineError> {
    let mut file = File::open(path).await?;
    let length = file.metadata().await?.len();
    if length == 0 {
        return Err(PipelineError::EmptyFile);
    }

    let mut buffer = vec![0u8; COUNT_BUFFER];
    let mut offset = 0u64;
    let mut chunk_index = 0usize;
    let mut lines = 0usize;
    let mut last = b'\n';

    while offset < length {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        lines += buffer[..read].iter().filter(|&&b| b == b'\n').count();
        last = buffer[read - 1];
        offset += read as u64;
        chunk_index += 1;
    }
    drop(file);

    if last != b'\n' {
        lines += 1;
    }
    tracing::trace!(chunks = chunk_index, bytes = offset, "Counting pass complete");
    Ok(lines)
}

/// Processing pass over one spooled file. Yields events lazily.
pub struct IngestRun<'a> {
    _source: &'a SpooledFile,
    reader: BufReader<File>,
    line: Vec<u8>,
    total: usize,
    processed: usize,
    entries: usize,
    chunk_size: usize,
    kind: InputKind,
    deriver: Arc<dyn KeyDerivation>,
    items: Vec<ScanItem>,
    stats: ScanStats,
    finished: bool,
}

impl IngestRun<'_> {
    pub fn total_lines(&self) -> usize {
        self.total
    }

    pub fn processed_lines(&self) -> usize {
        self.processed
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Read until the next event is due. `None` once the 100% event was
    /// returned.
    pub async fn next_event(&mut self) -> Result<Option<ProgressEvent>, PipelineError> {
        if self.finished {
            return Ok(None);
        }

        let mut chunk = Vec::new();
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(Some(self.finish(chunk)));
            }
            self.processed += 1;
            // Undecodable bytes become U+FFFD and the entry fails validation.
            let line = String::from_utf8_lossy(&self.line).into_owned();
            self.accept(line.trim(), &mut chunk);

            if self.processed >= self.total {
                return Ok(Some(self.finish(chunk)));
            }
            if self.processed % self.chunk_size == 0 {
                return Ok(Some(self.event(chunk)));
            }
        }
    }

    /// Items read so far with their summary.
    pub fn into_items(self) -> (Vec<ScanItem>, ScanStats) {
        (self.items, self.stats)
    }

    fn accept(&mut self, entry: &str, chunk: &mut Vec<String>) {
        if entry.is_empty() {
            return;
        }
        self.entries += 1;
        let item = match self.kind {
            // Rejected secrets are identified by line number.
            InputKind::Secret => ScanItem::from_secret(self.deriver.as_ref(), entry, self.processed),
            InputKind::Address => ScanItem::Address(entry.to_string()),
        };
        self.stats.record(&item);
        if let Some(address) = item.address() {
            chunk.push(address.to_string());
        }
        self.items.push(item);
    }

    fn finish(&mut self, chunk: Vec<String>) -> ProgressEvent {
        self.finished = true;
        self.total = self.total.max(self.processed);
        metrics::record_ingested_lines(self.processed as u64);
        tracing::info!(
            lines = self.processed,
            entries = self.entries,
            valid = self.stats.valid,
            invalid = self.stats.invalid,
            "Ingest complete"
        );
        self.event(chunk)
    }

    fn event(&self, chunk: Vec<String>) -> ProgressEvent {
        ProgressEvent {
            phase: Phase::Ingest,
            progress: if self.finished { 100 } else { percent(self.processed, self.total) },
            total: self.total,
            completed: self.processed,
            chunk: Some(Chunk::Addresses(chunk)),
        }
    }
}

impl std::fmt::Debug for IngestRun<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestRun")
            .field("total", &self.total)
            .field("processed", &self.processed)
            .field("finished", &self.finished)
            .finish()
    }
}
