//! Persisted pipeline artifacts: encoder/scaler state and dataset
//! tensors.
//!
//! Encoder state is versioned JSON so a separately invoked inference
//! path can rebuild the exact same encoding widths. Tensors go to
//! safetensors with a meta.json sidecar; both are written atomically
//! via tmp + rename.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bytemuck::cast_slice;
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};

use vp_core::record::STAT_METRICS;

use crate::dataset::{DatasetPipeline, LeaveOneOutDataset};
use crate::encode::{OneHotEncoder, StandardScaler};
use crate::DataError;

/// Increment when the persisted encoder layout changes.
pub const ENCODER_SCHEMA_VERSION: u32 = 1;

/// Serialized encoder/scaler state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderState {
    pub schema_version: u32,
    pub agent_vocabulary: Vec<String>,
    pub map_vocabulary: Vec<String>,
    pub stat_mean: Vec<f64>,
    pub stat_std: Vec<f64>,
}

impl EncoderState {
    pub fn from_pipeline(pipe: &DatasetPipeline) -> Self {
        Self {
            schema_version: ENCODER_SCHEMA_VERSION,
            agent_vocabulary: pipe.agent_encoder.categories().to_vec(),
            map_vocabulary: pipe.map_encoder.categories().to_vec(),
            stat_mean: pipe.scaler.mean().to_vec(),
            stat_std: pipe.scaler.std().to_vec(),
        }
    }

    /// Rebuild a pipeline in apply mode (fixed closed vocabularies).
    pub fn into_pipeline(self) -> Result<DatasetPipeline, DataError> {
        if self.schema_version != ENCODER_SCHEMA_VERSION {
            return Err(DataError::SchemaVersion(self.schema_version));
        }
        Ok(DatasetPipeline::from_parts(
            OneHotEncoder::with_vocabulary("agent", self.agent_vocabulary)?,
            OneHotEncoder::with_vocabulary("map", self.map_vocabulary)?,
            StandardScaler::from_parts(self.stat_mean, self.stat_std)?,
        ))
    }
}

pub fn write_encoder_state_atomic(
    path: impl AsRef<Path>,
    state: &EncoderState,
) -> Result<(), DataError> {
    let path = path.as_ref();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_encoder_state(path: impl AsRef<Path>) -> Result<EncoderState, DataError> {
    let bytes = fs::read(path)?;
    let state: EncoderState = serde_json::from_slice(&bytes)?;
    if state.schema_version != ENCODER_SCHEMA_VERSION {
        return Err(DataError::SchemaVersion(state.schema_version));
    }
    Ok(state)
}

/// Sidecar metadata for an exported dataset partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub schema_version: u32,
    pub num_examples: usize,
    pub agent_vocab: usize,
    pub map_vocab: usize,
    pub stat_dim: usize,
    pub stat_metrics: Vec<String>,
}

/// Export one dataset partition (`train` / `test`) as safetensors.
///
/// Tensor names: `x_agents`, `x_maps`, `x_stats`, `y_agents`, `y_stats`.
pub fn write_dataset(
    dir: impl AsRef<Path>,
    name: &str,
    ds: &LeaveOneOutDataset,
) -> Result<PathBuf, DataError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut tensors: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
    tensors.insert(
        "x_agents".to_string(),
        TensorView::new(
            Dtype::F32,
            ds.x_agents.shape().to_vec(),
            cast_slice(ds.x_agents.data()),
        )?,
    );
    tensors.insert(
        "x_maps".to_string(),
        TensorView::new(
            Dtype::F32,
            ds.x_maps.shape().to_vec(),
            cast_slice(ds.x_maps.data()),
        )?,
    );
    tensors.insert(
        "x_stats".to_string(),
        TensorView::new(
            Dtype::F32,
            ds.x_stats.shape().to_vec(),
            cast_slice(ds.x_stats.data()),
        )?,
    );
    tensors.insert(
        "y_agents".to_string(),
        TensorView::new(
            Dtype::F32,
            ds.y_agents.shape().to_vec(),
            cast_slice(ds.y_agents.data()),
        )?,
    );
    tensors.insert(
        "y_stats".to_string(),
        TensorView::new(
            Dtype::F32,
            ds.y_stats.shape().to_vec(),
            cast_slice(ds.y_stats.data()),
        )?,
    );

    let final_st = dir.join(format!("{name}.safetensors"));
    let tmp_st = final_st.with_extension("safetensors.tmp");
    let st_bytes = safetensors::serialize(&tensors, &None)?;
    fs::write(&tmp_st, st_bytes)?;
    fs::rename(&tmp_st, &final_st)?;

    let meta = DatasetMeta {
        schema_version: ENCODER_SCHEMA_VERSION,
        num_examples: ds.len(),
        agent_vocab: ds.agent_dim(),
        map_vocab: ds.map_dim(),
        stat_dim: ds.stat_dim(),
        stat_metrics: STAT_METRICS.iter().map(|s| s.to_string()).collect(),
    };
    let final_meta = dir.join(format!("{name}.meta.json"));
    let tmp_meta = final_meta.with_extension("meta.json.tmp");
    fs::write(&tmp_meta, serde_json::to_vec_pretty(&meta)?)?;
    fs::rename(&tmp_meta, &final_meta)?;

    Ok(final_st)
}

/// Remove interrupted-write leftovers.
pub fn cleanup_tmp_files(dir: &Path) -> Result<(), DataError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let e = entry?;
        let p = e.path();
        if let Some(name) = p.file_name().and_then(|s| s.to_str()) {
            if name.ends_with(".tmp") {
                let _ = fs::remove_file(&p);
            }
        }
    }
    Ok(())
}
