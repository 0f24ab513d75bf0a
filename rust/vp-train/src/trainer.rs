//! Epoch-level training driver.
//!
//! Drives one model until the monitored metric stops improving for the
//! early-stopping patience window or the epoch ceiling is hit. A
//! plateau on a shorter, independent patience window multiplies the
//! learning rate by the configured factor. Every epoch's monitored
//! score is offered to the checkpoint selector.

use std::path::PathBuf;

use thiserror::Error;
use vp_core::config::{SearchConfig, TrainingConfig};
use vp_core::Direction;
use vp_data::LeaveOneOutDataset;
use vp_logging::{now_ms, EpochEventV1, NdjsonWriter};

use crate::checkpoint::{CheckpointError, CheckpointSelector, Observation};
use crate::model::{EpochLogs, ModelError, TrainableModel};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("model: {0}")]
    Model(#[from] ModelError),
    #[error("monitored metric {0:?} missing from epoch logs")]
    MissingMonitor(String),
    #[error("invalid fit options: {0}")]
    InvalidOptions(&'static str),
}

/// Training policy for one model.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub max_epochs: u32,
    pub early_stopping_patience: u32,
    pub reduce_lr_factor: f64,
    pub reduce_lr_patience: u32,
    pub monitor: String,
    pub direction: Direction,
}

impl FitOptions {
    pub fn from_config(training: &TrainingConfig, search: &SearchConfig) -> Self {
        Self {
            max_epochs: training.max_epochs,
            early_stopping_patience: training.early_stopping_patience,
            reduce_lr_factor: training.reduce_lr_factor,
            reduce_lr_patience: training.reduce_lr_patience,
            monitor: search.monitor.clone(),
            direction: search.direction,
        }
    }

    fn validate(&self) -> Result<(), TrainError> {
        if self.max_epochs == 0 {
            return Err(TrainError::InvalidOptions("max_epochs must be > 0"));
        }
        if !(0.0..1.0).contains(&self.reduce_lr_factor) || self.reduce_lr_factor == 0.0 {
            return Err(TrainError::InvalidOptions(
                "reduce_lr_factor must be in (0, 1)",
            ));
        }
        Ok(())
    }
}

/// Where epoch events go, if anywhere.
pub struct EpochSink<'a> {
    pub writer: &'a mut NdjsonWriter,
    pub run_id: &'a str,
    pub iteration: u64,
}

/// One epoch's outcome.
#[derive(Debug, Clone)]
pub struct EpochRecord {
    pub epoch: u32,
    pub learning_rate: f64,
    pub logs: EpochLogs,
    pub retained: Option<PathBuf>,
}

/// Outcome of training one model to stop.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub epochs: Vec<EpochRecord>,
    pub best_epoch: u32,
    pub best_score: f64,
    /// Full logs at the best-monitored epoch.
    pub best_metrics: EpochLogs,
    pub stopped_early: bool,
}

/// Train until early stop or the epoch ceiling.
///
/// Checkpoint failures are checkpoint-local: a failed save aborts that
/// retention attempt, not training.
pub fn fit(
    model: &mut dyn TrainableModel,
    train: &LeaveOneOutDataset,
    val: &LeaveOneOutDataset,
    opts: &FitOptions,
    selector: &mut CheckpointSelector,
    mut events: Option<EpochSink<'_>>,
) -> Result<FitReport, TrainError> {
    opts.validate()?;

    let mut epochs = Vec::new();
    let mut best_score: Option<f64> = None;
    let mut best_epoch = 0u32;
    let mut best_metrics = EpochLogs::new();
    let mut es_wait = 0u32;
    let mut lr_wait = 0u32;
    let mut stopped_early = false;

    for epoch in 1..=opts.max_epochs {
        let lr = model.learning_rate();
        let train_logs = model.train_epoch(train)?;
        let val_logs = model.evaluate(val)?;

        let mut logs: EpochLogs = train_logs;
        for (k, v) in val_logs {
            logs.insert(format!("val_{k}"), v);
        }

        let score = *logs
            .get(&opts.monitor)
            .ok_or_else(|| TrainError::MissingMonitor(opts.monitor.clone()))?;

        let retained = match selector.observe(score, epoch, |p| {
            model
                .save(p)
                .map_err(|e| CheckpointError::Save(e.to_string()))
        }) {
            Ok(Observation::Retained { path, .. }) => Some(path),
            Ok(Observation::Skipped) => None,
            // Checkpoint-local: the attempt is abandoned, training goes on.
            Err(_) => None,
        };

        let improved = match best_score {
            None => true,
            Some(best) => opts.direction.better(score, best),
        };
        if improved {
            best_score = Some(score);
            best_epoch = epoch;
            best_metrics = logs.clone();
            es_wait = 0;
            lr_wait = 0;
        } else {
            es_wait += 1;
            lr_wait += 1;
        }

        if let Some(sink) = events.as_mut() {
            let ev = EpochEventV1 {
                event: "epoch",
                ts_ms: now_ms(),
                run_id: sink.run_id.to_string(),
                iteration: sink.iteration,
                epoch,
                learning_rate: lr,
                logs: logs.clone(),
                retained: retained
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            };
            let _ = sink.writer.write_event(&ev);
        }

        epochs.push(EpochRecord {
            epoch,
            learning_rate: lr,
            logs,
            retained,
        });

        if !improved && lr_wait >= opts.reduce_lr_patience {
            model.set_learning_rate(model.learning_rate() * opts.reduce_lr_factor);
            lr_wait = 0;
        }
        if !improved && es_wait >= opts.early_stopping_patience {
            stopped_early = true;
            break;
        }
    }

    // max_epochs >= 1, so at least one epoch ran and set the best.
    Ok(FitReport {
        epochs,
        best_epoch,
        best_score: best_score.unwrap_or(f64::NAN),
        best_metrics,
        stopped_early,
    })
}
