//! Model factory seam.
//!
//! Training consumes models through these traits only: the factory
//! turns one sampled hyperparameter configuration into an untrained
//! model with declared tensor shapes, and the trainer drives it one
//! epoch at a time. The backend behind the seam is interchangeable.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use vp_data::{Array2, LeaveOneOutDataset};

use crate::hparams::HpConfig;

/// Metric name → value for one epoch. Validation metrics carry a
/// `val_` prefix, added by the trainer.
pub type EpochLogs = BTreeMap<String, f64>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("bad hyperparameter {name}: {reason}")]
    BadHyperparameter { name: String, reason: String },
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("training step failed: {0}")]
    Step(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("safetensors: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
}

/// Declared input/output tensor shapes of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShapes {
    /// Context slots per example (4).
    pub context_agents: usize,
    pub agent_vocab: usize,
    pub map_vocab: usize,
    pub stat_dim: usize,
    /// Width of the named latent representation.
    pub latent_dim: usize,
}

/// A trainable model produced by a [`ModelFactory`].
pub trait TrainableModel {
    fn shapes(&self) -> ModelShapes;

    fn learning_rate(&self) -> f64;

    /// Applied by the plateau policy; takes effect next epoch.
    fn set_learning_rate(&mut self, lr: f64);

    /// Run one training epoch, returning training metrics.
    fn train_epoch(&mut self, train: &LeaveOneOutDataset) -> Result<EpochLogs, ModelError>;

    /// Compute metrics without updating weights.
    fn evaluate(&self, data: &LeaveOneOutDataset) -> Result<EpochLogs, ModelError>;

    /// Persist the current weights to `path`.
    fn save(&self, path: &Path) -> Result<(), ModelError>;

    /// The named internal "latent" representation for every example,
    /// shape `[n, latent_dim]`. Exposed for embedding/visualization.
    fn latent(&self, data: &LeaveOneOutDataset) -> Result<Array2, ModelError>;
}

/// Builds an untrained model from one sampled configuration.
pub trait ModelFactory {
    fn build(&self, config: &HpConfig) -> Result<Box<dyn TrainableModel>, ModelError>;
}
