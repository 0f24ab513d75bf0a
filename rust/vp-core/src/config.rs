//! Unified configuration schema for the pipeline.
//!
//! One YAML file configures dataset construction, the hyperparameter
//! search, training policies, checkpoint retention, and feed collection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Which way the monitored metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// True if `a` is strictly better than `b` under this direction.
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Dataset construction settings.
    #[serde(default)]
    pub data: DataConfig,
    /// Hyperparameter search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Per-model training policy settings.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Checkpoint retention settings.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Feed collection settings.
    #[serde(default)]
    pub collect: CollectConfig,
    /// Reference model backend settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// Dataset construction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Line-delimited match feed to load.
    #[serde(default = "default_feed_path")]
    pub feed_path: String,
    /// Fraction of whole rosters held out for testing.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the deterministic roster split.
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,
    /// Where dataset tensors and encoder state are written.
    #[serde(default = "default_data_out_dir")]
    pub out_dir: String,
}

fn default_feed_path() -> String {
    "data/comps.jsonl".to_string()
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_split_seed() -> u64 {
    42
}

fn default_data_out_dir() -> String {
    "runs/dataset".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            feed_path: default_feed_path(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            out_dir: default_data_out_dir(),
        }
    }
}

/// Hyperparameter search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Seed for hyperparameter sampling.
    #[serde(default)]
    pub seed: u64,
    /// Metric governing early stopping, LR reduction, and retention.
    #[serde(default = "default_monitor")]
    pub monitor: String,
    /// Whether smaller or larger monitor values are better.
    #[serde(default = "default_direction")]
    pub direction: Direction,
    /// Optional number of search iterations to run.
    ///
    /// If None, the loop runs until stopped externally.
    #[serde(default)]
    pub total_iterations: Option<u32>,
}

fn default_monitor() -> String {
    "val_loss".to_string()
}

fn default_direction() -> Direction {
    Direction::Minimize
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            monitor: default_monitor(),
            direction: default_direction(),
            total_iterations: None,
        }
    }
}

/// Per-model training policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingConfig {
    /// Minibatch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Hard epoch ceiling; training never runs past this.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: u32,
    /// Epochs without improvement before training stops.
    #[serde(default = "default_es_patience")]
    pub early_stopping_patience: u32,
    /// Multiplier applied to the learning rate on plateau.
    #[serde(default = "default_lr_factor")]
    pub reduce_lr_factor: f64,
    /// Epochs without improvement before the learning rate is reduced.
    /// Independent of the early-stopping patience.
    #[serde(default = "default_lr_patience")]
    pub reduce_lr_patience: u32,
}

fn default_batch_size() -> u32 {
    32
}

fn default_max_epochs() -> u32 {
    999
}

fn default_es_patience() -> u32 {
    10
}

fn default_lr_factor() -> f64 {
    0.2
}

fn default_lr_patience() -> u32 {
    10
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_epochs: default_max_epochs(),
            early_stopping_patience: default_es_patience(),
            reduce_lr_factor: default_lr_factor(),
            reduce_lr_patience: default_lr_patience(),
        }
    }
}

/// Checkpoint retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Keep at most this many trained models on disk.
    #[serde(default = "default_n_models")]
    pub n_models: u32,
    /// Directory retained model files are written to.
    #[serde(default = "default_model_out_dir")]
    pub model_out_dir: String,
}

fn default_n_models() -> u32 {
    5
}

fn default_model_out_dir() -> String {
    "models".to_string()
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            n_models: default_n_models(),
            model_out_dir: default_model_out_dir(),
        }
    }
}

/// Feed collection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectConfig {
    /// Concurrent fetch workers.
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Append-only output feed path.
    #[serde(default = "default_feed_path")]
    pub out_path: String,
}

fn default_workers() -> u32 {
    4
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            out_path: default_feed_path(),
        }
    }
}

/// Reference model backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Width of the named latent layer.
    #[serde(default = "default_latent_size")]
    pub latent_size: u32,
}

fn default_latent_size() -> u32 {
    16
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_size: default_latent_size(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            search: SearchConfig::default(),
            training: TrainingConfig::default(),
            retention: RetentionConfig::default(),
            collect: CollectConfig::default(),
            model: ModelConfig::default(),
        }
    }
}
