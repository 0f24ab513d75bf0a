//! Leave-one-out dataset builder.
//!
//! Expands each encoded 5-slot roster into 5 training examples: 4
//! context slots as input, the remaining slot as target. Enumeration
//! order is a contract: all "predict slot 0" examples come first (in
//! roster order), then all "predict slot 1" examples, and so on —
//! downstream metadata replication depends on it.

use vp_core::{RosterMeta, CONTEXT_SIZE, ROSTER_SIZE};

use crate::encode::{OneHotEncoder, StandardScaler};
use crate::loader::RosterBatch;
use crate::split::split_rosters;
use crate::tensor::{Array2, Array3};
use crate::DataError;

/// Encoder output: three co-indexed arrays over roster instances.
#[derive(Debug, Clone)]
pub struct EncodedTensorSet {
    /// One-hot agents, shape `[n, 5, agent_vocab]`.
    pub agents: Array3,
    /// One-hot maps, shape `[n, 5, map_vocab]`; the 5 rows of one
    /// roster are identical (the source roster carried 5 repeated map
    /// values).
    pub maps: Array3,
    /// Standardized stats, shape `[n, 5, stat_dim]`.
    pub stats: Array3,
    pub meta: Vec<RosterMeta>,
}

impl EncodedTensorSet {
    pub fn len(&self) -> usize {
        self.agents.n()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value-copy the given roster instances into a new set.
    pub fn select(&self, indices: &[usize]) -> Self {
        let a = self.agents.cols();
        let m = self.maps.cols();
        let s = self.stats.cols();
        let mut agents = Array3::zeros(indices.len(), ROSTER_SIZE, a);
        let mut maps = Array3::zeros(indices.len(), ROSTER_SIZE, m);
        let mut stats = Array3::zeros(indices.len(), ROSTER_SIZE, s);
        let mut meta = Vec::with_capacity(indices.len());
        for (out_i, &src_i) in indices.iter().enumerate() {
            for slot in 0..ROSTER_SIZE {
                agents
                    .row_mut(out_i, slot)
                    .copy_from_slice(self.agents.row(src_i, slot));
                maps.row_mut(out_i, slot)
                    .copy_from_slice(self.maps.row(src_i, slot));
                stats
                    .row_mut(out_i, slot)
                    .copy_from_slice(self.stats.row(src_i, slot));
            }
            meta.push(self.meta[src_i].clone());
        }
        Self {
            agents,
            maps,
            stats,
            meta,
        }
    }
}

/// Derived leave-one-out examples.
#[derive(Debug, Clone)]
pub struct LeaveOneOutDataset {
    /// Context agents, shape `[e, 4, agent_vocab]`.
    pub x_agents: Array3,
    /// Roster map one-hot, shape `[e, map_vocab]`.
    pub x_maps: Array2,
    /// Context stats, shape `[e, 4, stat_dim]`.
    pub x_stats: Array3,
    /// Target agent one-hot, shape `[e, agent_vocab]`.
    pub y_agents: Array2,
    /// Target stat vector, shape `[e, stat_dim]`.
    pub y_stats: Array2,
    /// Source-roster metadata, replicated once per target slot.
    pub meta: Vec<RosterMeta>,
}

impl LeaveOneOutDataset {
    pub fn len(&self) -> usize {
        self.x_agents.n()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn agent_dim(&self) -> usize {
        self.x_agents.cols()
    }

    pub fn map_dim(&self) -> usize {
        self.x_maps.cols()
    }

    pub fn stat_dim(&self) -> usize {
        self.x_stats.cols()
    }
}

/// Expand every roster into one example per target slot.
///
/// Context slots keep their original relative order; they are never
/// shuffled, so the context encodes roster composition.
pub fn leave_one_out(src: &EncodedTensorSet) -> Result<LeaveOneOutDataset, DataError> {
    let n = src.len();
    if n == 0 {
        return Err(DataError::Shape(
            "leave-one-out on empty tensor set".to_string(),
        ));
    }
    if src.maps.n() != n || src.stats.n() != n || src.meta.len() != n {
        return Err(DataError::Shape(format!(
            "co-indexed arrays disagree: agents={} maps={} stats={} meta={}",
            n,
            src.maps.n(),
            src.stats.n(),
            src.meta.len()
        )));
    }

    let a = src.agents.cols();
    let m = src.maps.cols();
    let s = src.stats.cols();
    let e = n * ROSTER_SIZE;

    let mut x_agents = Array3::zeros(e, CONTEXT_SIZE, a);
    let mut x_maps = Array2::zeros(e, m);
    let mut x_stats = Array3::zeros(e, CONTEXT_SIZE, s);
    let mut y_agents = Array2::zeros(e, a);
    let mut y_stats = Array2::zeros(e, s);
    let mut meta = Vec::with_capacity(e);

    for target in 0..ROSTER_SIZE {
        for i in 0..n {
            let ex = target * n + i;
            let mut ctx = 0usize;
            for slot in 0..ROSTER_SIZE {
                if slot == target {
                    continue;
                }
                x_agents
                    .row_mut(ex, ctx)
                    .copy_from_slice(src.agents.row(i, slot));
                x_stats
                    .row_mut(ex, ctx)
                    .copy_from_slice(src.stats.row(i, slot));
                ctx += 1;
            }
            x_maps.row_mut(ex).copy_from_slice(src.maps.row(i, 0));
            y_agents
                .row_mut(ex)
                .copy_from_slice(src.agents.row(i, target));
            y_stats
                .row_mut(ex)
                .copy_from_slice(src.stats.row(i, target));
            meta.push(src.meta[i].clone());
        }
    }

    Ok(LeaveOneOutDataset {
        x_agents,
        x_maps,
        x_stats,
        y_agents,
        y_stats,
        meta,
    })
}

/// Train/test partition of derived examples, plus the roster indices
/// each side was built from.
#[derive(Debug)]
pub struct DatasetSplit {
    pub train: LeaveOneOutDataset,
    pub test: LeaveOneOutDataset,
    pub train_rosters: Vec<usize>,
    pub test_rosters: Vec<usize>,
}

/// Owns the fitted encoders and scaler.
///
/// Fit once, then passed by reference to training and any inference
/// caller; there is no global encoder state anywhere.
#[derive(Debug, Clone)]
pub struct DatasetPipeline {
    pub agent_encoder: OneHotEncoder,
    pub map_encoder: OneHotEncoder,
    pub scaler: StandardScaler,
}

impl DatasetPipeline {
    /// Fit vocabulary and scale from the full corpus.
    pub fn fit(batch: &RosterBatch) -> Result<Self, DataError> {
        if batch.is_empty() {
            return Err(DataError::EmptyFeed);
        }
        let agent_encoder = OneHotEncoder::fit(
            "agent",
            batch.agents.iter().flatten().map(String::as_str),
        );
        let map_encoder =
            OneHotEncoder::fit("map", batch.maps.iter().map(|roster| roster[0].as_str()));
        let scaler = StandardScaler::fit(
            batch
                .stats
                .iter()
                .flat_map(|roster| roster.iter().map(Vec::as_slice)),
        )?;
        Ok(Self {
            agent_encoder,
            map_encoder,
            scaler,
        })
    }

    pub fn from_parts(
        agent_encoder: OneHotEncoder,
        map_encoder: OneHotEncoder,
        scaler: StandardScaler,
    ) -> Self {
        Self {
            agent_encoder,
            map_encoder,
            scaler,
        }
    }

    /// Apply-mode encode: unseen categories are an error, never coerced.
    pub fn encode(&self, batch: &RosterBatch) -> Result<EncodedTensorSet, DataError> {
        let n = batch.len();
        if batch.maps.len() != n || batch.stats.len() != n || batch.meta.len() != n {
            return Err(DataError::Shape(format!(
                "loader arrays disagree: agents={} maps={} stats={} meta={}",
                n,
                batch.maps.len(),
                batch.stats.len(),
                batch.meta.len()
            )));
        }
        if batch.stat_dim != self.scaler.dim() {
            return Err(DataError::Shape(format!(
                "batch stat width {} != fitted scaler width {}",
                batch.stat_dim,
                self.scaler.dim()
            )));
        }

        let mut agents = Array3::zeros(n, ROSTER_SIZE, self.agent_encoder.len());
        let mut maps = Array3::zeros(n, ROSTER_SIZE, self.map_encoder.len());
        let mut stats = Array3::zeros(n, ROSTER_SIZE, self.scaler.dim());
        for i in 0..n {
            for slot in 0..ROSTER_SIZE {
                self.agent_encoder
                    .encode_into(&batch.agents[i][slot], agents.row_mut(i, slot))?;
                self.map_encoder
                    .encode_into(&batch.maps[i][slot], maps.row_mut(i, slot))?;
                self.scaler
                    .transform_into(&batch.stats[i][slot], stats.row_mut(i, slot))?;
            }
        }
        Ok(EncodedTensorSet {
            agents,
            maps,
            stats,
            meta: batch.meta.clone(),
        })
    }

    /// Full pipeline: encode, split whole rosters, expand both sides.
    pub fn generate(
        &self,
        batch: &RosterBatch,
        test_fraction: f64,
        seed: u64,
    ) -> Result<DatasetSplit, DataError> {
        let encoded = self.encode(batch)?;
        let split = split_rosters(encoded.len(), test_fraction, seed)?;
        let train = leave_one_out(&encoded.select(&split.train))?;
        let test = leave_one_out(&encoded.select(&split.test))?;
        Ok(DatasetSplit {
            train,
            test,
            train_rosters: split.train,
            test_rosters: split.test,
        })
    }
}
