//! Bounded best-N checkpoint retention.
//!
//! An online top-N over an unbounded stream of epoch scores, under an
//! injected comparison direction. At most N (score, path) entries are
//! held, best-first; inserting over capacity deletes the single worst
//! entry's file. The selector owns exactly the files it created.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use vp_core::Direction;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("retention capacity must be > 0")]
    ZeroCapacity,
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("checkpoint save failed: {0}")]
    Save(String),
    #[error("monitored score is not finite")]
    NonFiniteScore,
}

/// One retained artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedCheckpoint {
    pub score: f64,
    pub path: PathBuf,
}

/// Result of observing one epoch score.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The artifact was persisted; `evicted` names the worst entry's
    /// file if capacity was exceeded.
    Retained {
        path: PathBuf,
        evicted: Option<PathBuf>,
    },
    /// Capacity was full and the score did not beat the current worst.
    Skipped,
}

/// Online best-N selection over epoch scores.
///
/// `observe` takes `&mut self`; the exclusive borrow makes the
/// check-then-evict sequence atomic with respect to the entry list.
/// Sharing a selector across threads requires an external mutex.
pub struct CheckpointSelector {
    capacity: usize,
    monitor: String,
    direction: Direction,
    out_dir: PathBuf,
    prefix: String,
    entries: Vec<RetainedCheckpoint>,
    seq: u64,
}

impl CheckpointSelector {
    pub fn new(
        capacity: usize,
        monitor: impl Into<String>,
        direction: Direction,
        out_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Result<Self, CheckpointError> {
        if capacity == 0 {
            return Err(CheckpointError::ZeroCapacity);
        }
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            capacity,
            monitor: monitor.into(),
            direction,
            out_dir,
            prefix: prefix.into(),
            entries: Vec::with_capacity(capacity + 1),
            seq: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn monitor(&self) -> &str {
        &self.monitor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Retained entries, best-first.
    pub fn entries(&self) -> &[RetainedCheckpoint] {
        &self.entries
    }

    pub fn best(&self) -> Option<&RetainedCheckpoint> {
        self.entries.first()
    }

    /// Capacity-first rule: insert while under capacity, otherwise
    /// require strict improvement over the current worst.
    pub fn would_retain(&self, score: f64) -> bool {
        if self.entries.len() < self.capacity {
            return true;
        }
        match self.entries.last() {
            Some(worst) => self.direction.better(score, worst.score),
            None => true,
        }
    }

    /// Process one epoch score.
    ///
    /// If retained, `save` persists the artifact to the chosen path
    /// before the entry list changes; a failed save leaves the list
    /// untouched. Eviction deletes the worst entry's file; a deletion
    /// that finds no file is a no-op.
    pub fn observe(
        &mut self,
        score: f64,
        epoch: u32,
        save: impl FnOnce(&Path) -> Result<(), CheckpointError>,
    ) -> Result<Observation, CheckpointError> {
        if !score.is_finite() {
            return Err(CheckpointError::NonFiniteScore);
        }
        if !self.would_retain(score) {
            return Ok(Observation::Skipped);
        }

        // The sequence suffix keeps paths unique when the same score
        // and epoch recur across search iterations.
        let path = self.out_dir.join(format!(
            "{}-{:.4}-{:03}-{:04}.safetensors",
            self.prefix, score, epoch, self.seq
        ));
        save(&path)?;
        self.seq += 1;

        // Stable insert: ties go after existing equal scores.
        let at = self
            .entries
            .partition_point(|e| !self.direction.better(score, e.score));
        self.entries.insert(
            at,
            RetainedCheckpoint {
                score,
                path: path.clone(),
            },
        );

        let evicted = if self.entries.len() > self.capacity {
            let worst = self.entries.pop();
            if let Some(w) = &worst {
                let _ = fs::remove_file(&w.path);
                // Artifacts may carry a meta sidecar next to the
                // tensor file; remove it the same tolerant way.
                let _ = fs::remove_file(w.path.with_extension("meta.json"));
            }
            worst.map(|w| w.path)
        } else {
            None
        };

        Ok(Observation::Retained { path, evicted })
    }
}
