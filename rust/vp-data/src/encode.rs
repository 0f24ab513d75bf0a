//! Categorical one-hot encoding and numeric standardization.
//!
//! Encoders have two modes: *fit* derives the vocabulary or scale from a
//! corpus, *apply* reuses previously fitted state. Apply-mode lookups of
//! unseen categories fail with an unknown-category error; nothing is
//! coerced.

use rustc_hash::FxHashMap;

use crate::DataError;

/// Floor applied to per-column standard deviations so zero-variance
/// columns never divide by zero.
pub const MIN_STD: f64 = 1e-8;

/// One-hot encoder over a closed string vocabulary.
///
/// Fit derives a sorted, deduplicated vocabulary from the corpus;
/// `with_vocabulary` installs a fixed closed vocabulary known in
/// advance, which is required when training and a separately invoked
/// inference path must agree on encoding width.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    name: &'static str,
    categories: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl OneHotEncoder {
    /// Fit from observed values: sorted unique categories.
    pub fn fit<'a>(name: &'static str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.into_iter().map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self::from_sorted(name, categories)
    }

    /// Install a fixed closed vocabulary. Order is preserved.
    pub fn with_vocabulary(
        name: &'static str,
        categories: Vec<String>,
    ) -> Result<Self, DataError> {
        let mut seen = FxHashMap::default();
        for (i, c) in categories.iter().enumerate() {
            if seen.insert(c.clone(), i).is_some() {
                return Err(DataError::Shape(format!(
                    "duplicate {name} category in vocabulary: {c:?}"
                )));
            }
        }
        Ok(Self {
            name,
            categories,
            index: seen,
        })
    }

    fn from_sorted(name: &'static str, categories: Vec<String>) -> Self {
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            name,
            categories,
            index,
        }
    }

    /// Vocabulary size, i.e. the one-hot width.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Index of a category, or an unknown-category error.
    pub fn index_of(&self, category: &str) -> Result<usize, DataError> {
        self.index
            .get(category)
            .copied()
            .ok_or_else(|| DataError::UnknownCategory {
                encoder: self.name,
                category: category.to_string(),
            })
    }

    /// Write the one-hot vector for `category` into `out`.
    pub fn encode_into(&self, category: &str, out: &mut [f32]) -> Result<(), DataError> {
        if out.len() != self.len() {
            return Err(DataError::Shape(format!(
                "{} one-hot width {} != vocabulary size {}",
                self.name,
                out.len(),
                self.len()
            )));
        }
        let idx = self.index_of(category)?;
        out.fill(0.0);
        out[idx] = 1.0;
        Ok(())
    }

    /// Recover the category from a one-hot (or score) vector by argmax.
    pub fn decode(&self, one_hot: &[f32]) -> Result<&str, DataError> {
        if one_hot.len() != self.len() {
            return Err(DataError::Shape(format!(
                "{} decode width {} != vocabulary size {}",
                self.name,
                one_hot.len(),
                self.len()
            )));
        }
        let mut best = 0usize;
        for (i, &v) in one_hot.iter().enumerate() {
            if v > one_hot[best] {
                best = i;
            }
        }
        Ok(&self.categories[best])
    }
}

/// Per-column standardization: subtract mean, divide by std.
///
/// Fitted once over the flattened stat rows of the corpus; `transform`
/// is pure given the fitted parameters, so applying it twice without a
/// refit yields identical output.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Fit over rows of uniform width.
    pub fn fit<'a>(rows: impl IntoIterator<Item = &'a [f64]> + Clone) -> Result<Self, DataError> {
        let mut n = 0usize;
        let mut mean: Vec<f64> = Vec::new();
        for row in rows.clone() {
            if mean.is_empty() {
                mean = vec![0.0; row.len()];
            } else if row.len() != mean.len() {
                return Err(DataError::Shape(format!(
                    "scaler fit row width {} != {}",
                    row.len(),
                    mean.len()
                )));
            }
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
            n += 1;
        }
        if n == 0 {
            return Err(DataError::Shape("scaler fit on empty corpus".to_string()));
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let mut var = vec![0.0f64; mean.len()];
        for row in rows {
            for ((s, m), v) in var.iter_mut().zip(&mean).zip(row) {
                let d = v - m;
                *s += d * d;
            }
        }
        let std = var
            .into_iter()
            .map(|s| (s / n as f64).sqrt().max(MIN_STD))
            .collect();
        Ok(Self { mean, std })
    }

    /// Rebuild from persisted parameters. The std floor is re-applied.
    pub fn from_parts(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, DataError> {
        if mean.len() != std.len() {
            return Err(DataError::Shape(format!(
                "scaler mean width {} != std width {}",
                mean.len(),
                std.len()
            )));
        }
        let std = std.into_iter().map(|s| s.max(MIN_STD)).collect();
        Ok(Self { mean, std })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Standardize one row into `out`.
    pub fn transform_into(&self, row: &[f64], out: &mut [f32]) -> Result<(), DataError> {
        if row.len() != self.dim() || out.len() != self.dim() {
            return Err(DataError::Shape(format!(
                "scaler transform width {} (out {}) != {}",
                row.len(),
                out.len(),
                self.dim()
            )));
        }
        for ((o, v), (m, s)) in out
            .iter_mut()
            .zip(row)
            .zip(self.mean.iter().zip(&self.std))
        {
            *o = ((v - m) / s) as f32;
        }
        Ok(())
    }
}
