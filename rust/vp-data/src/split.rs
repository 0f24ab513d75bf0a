//! Deterministic train/test split over whole rosters.
//!
//! Partitioning happens on roster indices, before leave-one-out
//! expansion, so no two examples derived from the same physical roster
//! can straddle the train/test boundary.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::DataError;

/// Disjoint roster index sets. Together they cover `0..n` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `n` rosters with a fixed seed.
///
/// The test side takes `ceil(n * test_fraction)` rosters. Both sides
/// must end up non-empty.
pub fn split_rosters(n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices, DataError> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(DataError::InvalidConfig(
            "test_fraction must be in (0, 1)",
        ));
    }
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DataError::InvalidConfig(
            "split leaves an empty train or test side",
        ));
    }

    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let test = idx[..n_test].to_vec();
    let train = idx[n_test..].to_vec();
    Ok(SplitIndices { train, test })
}
