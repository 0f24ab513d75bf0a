//! vp-train: Hyperparameter search with bounded best-N checkpoint
//! retention.
//!
//! The search loop samples a configuration, builds a model through the
//! external factory seam, trains it with early stopping and
//! LR-on-plateau, and hands every epoch's monitored metric to the
//! checkpoint selector. Only the N best artifacts survive on disk.

pub mod checkpoint;
pub mod hparams;
pub mod mlp;
pub mod model;
pub mod search;
pub mod trainer;

pub use checkpoint::{CheckpointError, CheckpointSelector, Observation, RetainedCheckpoint};
pub use hparams::{sample_config, HpConfig, HpDomain, HpSpec, HpValue};
pub use mlp::{ContextualFactory, ContextualModel};
pub use model::{EpochLogs, ModelError, ModelFactory, ModelShapes, TrainableModel};
pub use search::{IterationReport, RunSummary, SearchError, SearchLoop, SearchOptions, SearchPhase};
pub use trainer::{fit, EpochRecord, EpochSink, FitOptions, FitReport, TrainError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod hparams_tests;
#[cfg(test)]
mod search_tests;
