//! Hyperparameter search loop.
//!
//! Each iteration: sample one configuration from every domain, build a
//! model through the factory, train it to stop, report the best value
//! of each tracked metric. A configuration that makes the factory or a
//! training step raise is logged and abandoned; the loop itself only
//! ends when the caller says so.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use vp_data::LeaveOneOutDataset;
use vp_logging::{now_ms, IterationFailedEventV1, NdjsonWriter, SearchIterationEventV1};

use crate::checkpoint::CheckpointSelector;
use crate::hparams::{sample_config, HpConfig, HpSpec, HpValue};
use crate::model::{EpochLogs, ModelError, ModelFactory};
use crate::trainer::{fit, EpochSink, FitOptions, TrainError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("hyperparameter space is empty")]
    EmptySpace,
    #[error("invalid domain for {name}: {reason}")]
    InvalidDomain { name: String, reason: String },
    #[error("factory: {0}")]
    Factory(#[from] ModelError),
    #[error("train: {0}")]
    Train(#[from] TrainError),
}

/// Loop state, advanced once per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Training,
    Evaluated,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub run_id: String,
    pub seed: u64,
    pub fit: FitOptions,
}

/// What one iteration produced.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: u64,
    pub config: HpConfig,
    /// Best value reached by each tracked metric.
    pub best_metrics: EpochLogs,
    pub epochs_trained: u32,
    pub stopped_early: bool,
}

/// Totals for a bounded or aborted run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u64,
    pub failed: u64,
}

/// The search loop. One selector spans all iterations, so retention
/// compares artifacts across configurations, not only within one.
pub struct SearchLoop<'f> {
    factory: &'f dyn ModelFactory,
    space: Vec<HpSpec>,
    opts: SearchOptions,
    selector: CheckpointSelector,
    events: Option<NdjsonWriter>,
    rng: ChaCha8Rng,
    iteration: u64,
    phase: SearchPhase,
}

impl<'f> SearchLoop<'f> {
    pub fn new(
        factory: &'f dyn ModelFactory,
        space: Vec<HpSpec>,
        opts: SearchOptions,
        selector: CheckpointSelector,
    ) -> Result<Self, SearchError> {
        if space.is_empty() {
            return Err(SearchError::EmptySpace);
        }
        for spec in &space {
            spec.domain
                .validate()
                .map_err(|reason| SearchError::InvalidDomain {
                    name: spec.name.clone(),
                    reason,
                })?;
        }
        let rng = ChaCha8Rng::seed_from_u64(opts.seed);
        Ok(Self {
            factory,
            space,
            opts,
            selector,
            events: None,
            rng,
            iteration: 0,
            phase: SearchPhase::Idle,
        })
    }

    /// Attach an NDJSON event log.
    pub fn with_events(mut self, writer: NdjsonWriter) -> Self {
        self.events = Some(writer);
        self
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn selector(&self) -> &CheckpointSelector {
        &self.selector
    }

    /// Run one iteration. Errors are iteration-local; the sampled
    /// configuration is consumed either way.
    pub fn run_iteration(
        &mut self,
        train: &LeaveOneOutDataset,
        val: &LeaveOneOutDataset,
    ) -> Result<IterationReport, SearchError> {
        let iteration = self.iteration;
        self.iteration += 1;
        self.phase = SearchPhase::Training;

        let config = sample_config(&self.space, &mut self.rng);
        let result = self.train_one(&config, train, val, iteration);
        match result {
            Ok(report) => {
                self.phase = SearchPhase::Evaluated;
                if let Some(w) = self.events.as_mut() {
                    let ev = SearchIterationEventV1 {
                        event: "search_iteration",
                        ts_ms: now_ms(),
                        run_id: self.opts.run_id.clone(),
                        iteration,
                        epochs_trained: report.epochs_trained,
                        config: config_to_json(&config),
                        best_metrics: report.best_metrics.clone(),
                    };
                    let _ = w.write_event(&ev);
                    let _ = w.flush();
                }
                self.phase = SearchPhase::Idle;
                Ok(report)
            }
            Err(e) => {
                if let Some(w) = self.events.as_mut() {
                    let ev = IterationFailedEventV1 {
                        event: "iteration_failed",
                        ts_ms: now_ms(),
                        run_id: self.opts.run_id.clone(),
                        iteration,
                        error: e.to_string(),
                    };
                    let _ = w.write_event(&ev);
                    let _ = w.flush();
                }
                self.phase = SearchPhase::Idle;
                Err(e)
            }
        }
    }

    fn train_one(
        &mut self,
        config: &HpConfig,
        train: &LeaveOneOutDataset,
        val: &LeaveOneOutDataset,
        iteration: u64,
    ) -> Result<IterationReport, SearchError> {
        let mut model = self.factory.build(config)?;
        let run_id = self.opts.run_id.as_str();
        let sink = self.events.as_mut().map(|writer| EpochSink {
            writer,
            run_id,
            iteration,
        });
        let report = fit(
            model.as_mut(),
            train,
            val,
            &self.opts.fit,
            &mut self.selector,
            sink,
        )?;
        Ok(IterationReport {
            iteration,
            config: config.clone(),
            best_metrics: report.best_metrics,
            epochs_trained: report.epochs.len() as u32,
            stopped_early: report.stopped_early,
        })
    }

    /// Run until `total_iterations` complete, or forever when `None`.
    ///
    /// A failed iteration is abandoned and counted; it never stops the
    /// loop.
    pub fn run(
        &mut self,
        train: &LeaveOneOutDataset,
        val: &LeaveOneOutDataset,
        total_iterations: Option<u32>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            if let Some(t) = total_iterations {
                if summary.completed + summary.failed >= u64::from(t) {
                    break;
                }
            }
            match self.run_iteration(train, val) {
                Ok(_) => summary.completed += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

fn config_to_json(
    config: &HpConfig,
) -> std::collections::BTreeMap<String, serde_json::Value> {
    config
        .iter()
        .map(|(k, v)| {
            let j = match v {
                HpValue::Int(i) => serde_json::json!(i),
                HpValue::Real(r) => serde_json::json!(r),
                HpValue::Text(t) => serde_json::json!(t),
            };
            (k.clone(), j)
        })
        .collect()
}
