//! vp-data: Feed loading, categorical/numeric encoding, and the
//! leave-one-out dataset builder.
//!
//! Data flow: loader → encoder → split (whole rosters) → leave-one-out
//! expansion. The fitted encoder state is owned by [`DatasetPipeline`]
//! and handed by reference to any inference-time caller.

use thiserror::Error;

pub mod artifacts;
pub mod dataset;
pub mod encode;
pub mod feed;
pub mod loader;
pub mod split;
pub mod tensor;

pub use artifacts::{read_encoder_state, write_encoder_state_atomic, EncoderState};
pub use dataset::{DatasetPipeline, DatasetSplit, EncodedTensorSet, LeaveOneOutDataset};
pub use encode::{OneHotEncoder, StandardScaler};
pub use feed::{CollectReport, FeedError, FeedSink, MatchSource};
pub use loader::{load_feed, load_feed_lenient, LoadReport, RosterBatch, SkippedLine};
pub use split::{split_rosters, SplitIndices};
pub use tensor::{Array2, Array3};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors across the loader / encoder / dataset builder.
///
/// Parse errors are local to one feed line; shape invariant violations
/// abort dataset construction outright.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: parse error: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: roster has {found} players, expected {expected}")]
    RosterLength {
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("line {line}: stat vector has {found} columns, expected {expected}")]
    StatWidth {
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown {encoder} category: {category:?}")]
    UnknownCategory {
        encoder: &'static str,
        category: String,
    },
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("feed produced no rosters")]
    EmptyFeed,
    #[error("invalid dataset config: {0}")]
    InvalidConfig(&'static str),
    #[error("unsupported encoder schema version {0}")]
    SchemaVersion(u32),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("safetensors: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}

#[cfg(test)]
mod encode_tests;
#[cfg(test)]
mod feed_tests;
#[cfg(test)]
mod loader_tests;
