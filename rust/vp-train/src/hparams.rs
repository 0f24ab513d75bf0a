//! Hyperparameter domains and uniform sampling.
//!
//! Each named hyperparameter is bound to one of three domain variants;
//! sampling is uniform per variant. A sampled configuration is an
//! immutable name → value map, fixed for one search iteration.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// A concrete sampled hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HpValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for HpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HpValue::Int(v) => write!(f, "{v}"),
            HpValue::Real(v) => write!(f, "{v}"),
            HpValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Domain of one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HpDomain {
    /// Finite enumerated set, sampled uniformly.
    Discrete { values: Vec<HpValue> },
    /// Inclusive integer interval.
    IntRange { lo: i64, hi: i64 },
    /// Half-open real interval `[lo, hi)`.
    RealRange { lo: f64, hi: f64 },
}

impl HpDomain {
    /// Check the domain is sampleable.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            HpDomain::Discrete { values } if values.is_empty() => {
                Err("discrete set is empty".to_string())
            }
            HpDomain::IntRange { lo, hi } if lo > hi => {
                Err(format!("integer interval [{lo}, {hi}] is empty"))
            }
            HpDomain::RealRange { lo, hi } if !(lo < hi) => {
                Err(format!("real interval [{lo}, {hi}) is empty"))
            }
            _ => Ok(()),
        }
    }

    /// Draw one value uniformly. The domain must validate.
    pub fn sample(&self, rng: &mut impl Rng) -> HpValue {
        match self {
            HpDomain::Discrete { values } => values[rng.gen_range(0..values.len())].clone(),
            HpDomain::IntRange { lo, hi } => HpValue::Int(rng.gen_range(*lo..=*hi)),
            HpDomain::RealRange { lo, hi } => HpValue::Real(rng.gen_range(*lo..*hi)),
        }
    }
}

/// A named hyperparameter bound to a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpSpec {
    pub name: String,
    pub domain: HpDomain,
}

impl HpSpec {
    pub fn discrete(name: &str, values: impl IntoIterator<Item = HpValue>) -> Self {
        Self {
            name: name.to_string(),
            domain: HpDomain::Discrete {
                values: values.into_iter().collect(),
            },
        }
    }

    pub fn discrete_ints(name: &str, values: impl IntoIterator<Item = i64>) -> Self {
        Self::discrete(name, values.into_iter().map(HpValue::Int))
    }

    pub fn discrete_texts<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        Self::discrete(
            name,
            values.into_iter().map(|v| HpValue::Text(v.to_string())),
        )
    }

    pub fn int_range(name: &str, lo: i64, hi: i64) -> Self {
        Self {
            name: name.to_string(),
            domain: HpDomain::IntRange { lo, hi },
        }
    }

    pub fn real_range(name: &str, lo: f64, hi: f64) -> Self {
        Self {
            name: name.to_string(),
            domain: HpDomain::RealRange { lo, hi },
        }
    }
}

/// One sampled configuration, immutable per search iteration.
pub type HpConfig = BTreeMap<String, HpValue>;

/// Sample one value per declared hyperparameter.
pub fn sample_config(space: &[HpSpec], rng: &mut impl Rng) -> HpConfig {
    space
        .iter()
        .map(|spec| (spec.name.clone(), spec.domain.sample(rng)))
        .collect()
}

/// Read an integer-valued hyperparameter.
pub fn get_int(cfg: &HpConfig, name: &str) -> Result<i64, ModelError> {
    match cfg.get(name) {
        Some(HpValue::Int(v)) => Ok(*v),
        Some(other) => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: format!("expected integer, got {other}"),
        }),
        None => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: "missing".to_string(),
        }),
    }
}

/// Read a real-valued hyperparameter; integers widen.
pub fn get_real(cfg: &HpConfig, name: &str) -> Result<f64, ModelError> {
    match cfg.get(name) {
        Some(HpValue::Real(v)) => Ok(*v),
        Some(HpValue::Int(v)) => Ok(*v as f64),
        Some(other) => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: format!("expected real, got {other}"),
        }),
        None => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: "missing".to_string(),
        }),
    }
}

/// Read a text-valued hyperparameter.
pub fn get_text<'a>(cfg: &'a HpConfig, name: &str) -> Result<&'a str, ModelError> {
    match cfg.get(name) {
        Some(HpValue::Text(v)) => Ok(v),
        Some(other) => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: format!("expected text, got {other}"),
        }),
        None => Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: "missing".to_string(),
        }),
    }
}
