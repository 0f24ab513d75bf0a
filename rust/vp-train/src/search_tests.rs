use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;

use vp_core::Direction;
use vp_logging::NdjsonWriter;

use crate::checkpoint::CheckpointSelector;
use crate::hparams::HpSpec;
use crate::model::{ModelError, ModelFactory, TrainableModel};
use crate::search::{SearchLoop, SearchOptions, SearchPhase};
use crate::trainer::FitOptions;
use crate::trainer_tests::{tiny_dataset, ScriptedModel};

/// Factory that hands out scripted models in order; `None` entries
/// simulate a configuration the factory cannot build.
struct ScriptedFactory {
    schedules: RefCell<VecDeque<Option<Vec<f64>>>>,
}

impl ScriptedFactory {
    fn new(schedules: Vec<Option<Vec<f64>>>) -> Self {
        Self {
            schedules: RefCell::new(schedules.into()),
        }
    }
}

impl ModelFactory for ScriptedFactory {
    fn build(
        &self,
        _config: &crate::hparams::HpConfig,
    ) -> Result<Box<dyn TrainableModel>, ModelError> {
        match self.schedules.borrow_mut().pop_front() {
            Some(Some(losses)) => Ok(Box::new(ScriptedModel::new(losses))),
            Some(None) => Err(ModelError::Step("unbuildable configuration".to_string())),
            None => Err(ModelError::Step("factory exhausted".to_string())),
        }
    }
}

fn space() -> Vec<HpSpec> {
    vec![
        HpSpec::discrete_ints("layer_a_size", [128, 192, 256]),
        HpSpec::real_range("dropout", 0.1, 0.33),
    ]
}

fn options(seed: u64) -> SearchOptions {
    SearchOptions {
        run_id: "test-run".to_string(),
        seed,
        fit: FitOptions {
            max_epochs: 3,
            early_stopping_patience: 10,
            reduce_lr_factor: 0.2,
            reduce_lr_patience: 10,
            monitor: "val_loss".to_string(),
            direction: Direction::Minimize,
        },
    }
}

fn selector(dir: &std::path::Path, n: usize) -> CheckpointSelector {
    CheckpointSelector::new(n, "val_loss", Direction::Minimize, dir, "model").unwrap()
}

#[test]
fn iteration_reports_config_and_best_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::new(vec![Some(vec![1.0, 0.8, 0.9])]);
    let mut search =
        SearchLoop::new(&factory, space(), options(0), selector(dir.path(), 2)).unwrap();

    let ds = tiny_dataset();
    let report = search.run_iteration(&ds, &ds).unwrap();
    assert_eq!(report.iteration, 0);
    assert!(report.config.contains_key("layer_a_size"));
    assert!(report.config.contains_key("dropout"));
    assert_eq!(report.best_metrics["val_loss"], 0.8);
    assert_eq!(report.epochs_trained, 3);
    assert_eq!(search.phase(), SearchPhase::Idle);
}

#[test]
fn failed_iterations_never_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::new(vec![
        Some(vec![1.0, 0.9, 0.8]),
        None, // factory refuses this configuration
        Some(vec![0.7, 0.6, 0.5]),
    ]);
    let mut search =
        SearchLoop::new(&factory, space(), options(1), selector(dir.path(), 2)).unwrap();

    let ds = tiny_dataset();
    let summary = search.run(&ds, &ds, Some(3));
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(search.iteration(), 3);
}

#[test]
fn retention_spans_search_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::new(vec![
        Some(vec![0.9, 0.8, 0.7]),
        Some(vec![0.5, 0.6, 0.65]),
    ]);
    let mut search =
        SearchLoop::new(&factory, space(), options(2), selector(dir.path(), 2)).unwrap();

    let ds = tiny_dataset();
    let summary = search.run(&ds, &ds, Some(2));
    assert_eq!(summary.completed, 2);

    // Best two artifacts across both iterations, best-first.
    let scores: Vec<f64> = search
        .selector()
        .entries()
        .iter()
        .map(|e| e.score)
        .collect();
    assert_eq!(scores, vec![0.5, 0.6]);
    // Only the retained files remain on disk.
    let count = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(count, 2);
}

#[test]
fn sampling_is_deterministic_per_seed() {
    let ds = tiny_dataset();
    let run = |seed: u64| {
        let dir = tempfile::tempdir().unwrap();
        let factory = ScriptedFactory::new(vec![Some(vec![1.0, 0.9, 0.8]); 3]);
        let mut search =
            SearchLoop::new(&factory, space(), options(seed), selector(dir.path(), 2)).unwrap();
        (0..3)
            .map(|_| search.run_iteration(&ds, &ds).unwrap().config)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn events_log_iterations_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.ndjson");
    let factory = ScriptedFactory::new(vec![Some(vec![1.0, 0.9, 0.8]), None]);
    let mut search = SearchLoop::new(&factory, space(), options(3), selector(dir.path(), 2))
        .unwrap()
        .with_events(NdjsonWriter::open_append(&log_path).unwrap());

    let ds = tiny_dataset();
    let _ = search.run(&ds, &ds, Some(2));

    let text = fs::read_to_string(&log_path).unwrap();
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(events.iter().any(|e| e["event"] == "epoch"));
    assert!(events.iter().any(|e| e["event"] == "search_iteration"));
    assert!(events.iter().any(|e| e["event"] == "iteration_failed"));
    let it = events
        .iter()
        .find(|e| e["event"] == "search_iteration")
        .unwrap();
    assert_eq!(it["run_id"], "test-run");
    assert!(it["config"]["layer_a_size"].is_i64());
}

#[test]
fn empty_space_and_bad_domains_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::new(vec![]);
    assert!(matches!(
        SearchLoop::new(&factory, vec![], options(0), selector(dir.path(), 2)),
        Err(crate::search::SearchError::EmptySpace)
    ));

    let bad = vec![HpSpec::int_range("x", 9, 3)];
    let r = SearchLoop::new(&factory, bad, options(0), selector(dir.path(), 2));
    assert!(matches!(
        r,
        Err(crate::search::SearchError::InvalidDomain { .. })
    ));
}
