//! Record loader: line-delimited match feed → co-indexed roster arrays.
//!
//! Each feed line holds one played map and yields exactly two rosters,
//! one per team. Output arrays are co-indexed over roster instances:
//! agent names, map names (the roster's 5 entries are identical), raw
//! stat vectors, and per-roster metadata.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use vp_core::record::{MatchRecord, TeamResult};
use vp_core::{RosterMeta, ROSTER_SIZE};

use crate::DataError;

/// Parallel roster arrays produced by the loader.
#[derive(Debug, Clone, Default)]
pub struct RosterBatch {
    pub agents: Vec<[String; ROSTER_SIZE]>,
    pub maps: Vec<[String; ROSTER_SIZE]>,
    pub stats: Vec<[Vec<f64>; ROSTER_SIZE]>,
    /// Flattened stat columns per player; uniform across the batch.
    pub stat_dim: usize,
    pub meta: Vec<RosterMeta>,
}

impl RosterBatch {
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn push_team(
        &mut self,
        record: &MatchRecord,
        side: &TeamResult,
        line: usize,
    ) -> Result<(), DataError> {
        if !side.roster_len_ok() {
            return Err(DataError::RosterLength {
                line,
                found: side.players.len(),
                expected: ROSTER_SIZE,
            });
        }

        let mut agents: [String; ROSTER_SIZE] = Default::default();
        let mut stats: [Vec<f64>; ROSTER_SIZE] = Default::default();
        for (slot, p) in side.players.iter().enumerate() {
            let v = p.stat_vector();
            if self.stat_dim == 0 && self.agents.is_empty() && slot == 0 {
                self.stat_dim = v.len();
            }
            if v.len() != self.stat_dim {
                return Err(DataError::StatWidth {
                    line,
                    found: v.len(),
                    expected: self.stat_dim,
                });
            }
            agents[slot] = p.agent.clone();
            stats[slot] = v;
        }

        let map = record.map_name.clone();
        self.agents.push(agents);
        self.maps.push(std::array::from_fn(|_| map.clone()));
        self.stats.push(stats);
        self.meta.push(record.meta_for(side));
        Ok(())
    }

    /// Append both rosters of one record. Shape violations leave the
    /// batch unchanged up to the offending roster and surface the line.
    pub fn push_record(&mut self, record: &MatchRecord, line: usize) -> Result<(), DataError> {
        self.push_team(record, &record.team_a, line)?;
        self.push_team(record, &record.team_b, line)?;
        Ok(())
    }
}

/// A feed line the lenient loader could not parse.
#[derive(Debug, Clone)]
pub struct SkippedLine {
    /// 1-based line number in the feed.
    pub line: usize,
    pub reason: String,
}

/// Lenient load result: the batch plus a report of skipped lines.
#[derive(Debug)]
pub struct LoadReport {
    pub batch: RosterBatch,
    pub lines_read: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Parse one feed line. The line number is carried into the error.
pub fn parse_line(line: &str, line_no: usize) -> Result<MatchRecord, DataError> {
    serde_json::from_str::<MatchRecord>(line).map_err(|source| DataError::Parse {
        line: line_no,
        source,
    })
}

/// Strict load: the first malformed line aborts with its line number.
pub fn load_feed(path: impl AsRef<Path>) -> Result<RosterBatch, DataError> {
    let mut batch = RosterBatch::default();
    for (idx, line) in read_lines(path)?.enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(&line, line_no)?;
        batch.push_record(&record, line_no)?;
    }
    if batch.is_empty() {
        return Err(DataError::EmptyFeed);
    }
    Ok(batch)
}

/// Lenient load: unparseable lines are skipped and counted.
///
/// Shape invariant violations (roster length, stat width) are never
/// skippable; they abort construction exactly as in strict mode.
pub fn load_feed_lenient(path: impl AsRef<Path>) -> Result<LoadReport, DataError> {
    let mut batch = RosterBatch::default();
    let mut skipped = Vec::new();
    let mut lines_read = 0usize;
    for (idx, line) in read_lines(path)?.enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        lines_read += 1;
        match parse_line(&line, line_no) {
            Ok(record) => batch.push_record(&record, line_no)?,
            Err(e) => skipped.push(SkippedLine {
                line: line_no,
                reason: e.to_string(),
            }),
        }
    }
    if batch.is_empty() {
        return Err(DataError::EmptyFeed);
    }
    Ok(LoadReport {
        batch,
        lines_read,
        skipped,
    })
}

fn read_lines(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = std::io::Result<String>>, DataError> {
    let f = File::open(path)?;
    Ok(BufReader::new(f).lines())
}
