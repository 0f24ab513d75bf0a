//! Feed collection: concurrent match fetching into one append-only
//! NDJSON sink.
//!
//! Fetching is unordered and independent per match id, bounded by a
//! caller-set worker count. The sink serializes writes behind a mutex
//! so interleaved workers never corrupt a line. Per-item failures are
//! reported, never fatal.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use vp_core::MatchRecord;
use vp_logging::{NdjsonError, NdjsonWriter};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("log: {0}")]
    Log(#[from] NdjsonError),
    #[error("feed sink poisoned by a panicked worker")]
    SinkPoisoned,
    #[error("fetch {match_id}: {reason}")]
    Fetch { match_id: String, reason: String },
}

/// Producer of parsed match records; one fetch per match id.
///
/// The HTML scraping behind this lives outside the pipeline.
pub trait MatchSource: Send + Sync {
    fn fetch(&self, match_id: &str) -> Result<Vec<MatchRecord>, FeedError>;
}

/// Mutex-guarded append-only NDJSON sink; one record per line.
pub struct FeedSink {
    w: Mutex<NdjsonWriter>,
}

impl FeedSink {
    /// Open for append, creating the file if needed.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        Ok(Self {
            w: Mutex::new(NdjsonWriter::open_append(path)?),
        })
    }

    pub fn append(&self, record: &MatchRecord) -> Result<(), FeedError> {
        let mut w = self.w.lock().map_err(|_| FeedError::SinkPoisoned)?;
        w.write_event(record)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), FeedError> {
        let mut w = self.w.lock().map_err(|_| FeedError::SinkPoisoned)?;
        w.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CollectReport {
    /// Match ids fetched successfully.
    pub fetched: usize,
    /// Records (played maps) appended to the sink.
    pub records_written: usize,
    /// (match id, reason) per failed fetch or write.
    pub failed: Vec<(String, String)>,
}

/// Fetch every id through `workers` threads into the shared sink.
pub fn collect(
    source: &dyn MatchSource,
    ids: &[String],
    workers: usize,
    sink: &FeedSink,
) -> Result<CollectReport, FeedError> {
    let workers = workers.clamp(1, ids.len().max(1));
    let cursor = AtomicUsize::new(0);
    let fetched = AtomicUsize::new(0);
    let written = AtomicUsize::new(0);
    let failed: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let i = cursor.fetch_add(1, Ordering::Relaxed);
                if i >= ids.len() {
                    break;
                }
                let id = &ids[i];
                match source.fetch(id) {
                    Ok(records) => {
                        fetched.fetch_add(1, Ordering::Relaxed);
                        for rec in &records {
                            match sink.append(rec) {
                                Ok(()) => {
                                    written.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(e) => {
                                    if let Ok(mut f) = failed.lock() {
                                        f.push((id.clone(), e.to_string()));
                                    }
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        if let Ok(mut f) = failed.lock() {
                            f.push((id.clone(), e.to_string()));
                        }
                    }
                }
            });
        }
    });

    sink.flush()?;
    Ok(CollectReport {
        fetched: fetched.into_inner(),
        records_written: written.into_inner(),
        failed: failed.into_inner().unwrap_or_else(|e| e.into_inner()),
    })
}
