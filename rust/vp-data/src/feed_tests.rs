use std::fs;

use vp_core::record::{MatchRecord, MetricValue, PlayerResult, TeamResult};

use crate::feed::{collect, FeedError, FeedSink, MatchSource};
use crate::loader::load_feed;

fn player(agent: &str) -> PlayerResult {
    PlayerResult {
        player: "p".into(),
        team: "T".into(),
        agent: agent.into(),
        acs: MetricValue::Scalar(200.0),
        kills: MetricValue::Scalar(15.0),
        deaths: MetricValue::Scalar(10.0),
        assists: MetricValue::Scalar(4.0),
        adr: MetricValue::Scalar(130.0),
        fb: MetricValue::Scalar(2.0),
        fd: MetricValue::Scalar(1.0),
    }
}

fn team(name: &str) -> TeamResult {
    TeamResult {
        team: name.into(),
        score: 13,
        players: ["Jett", "Sova", "Omen", "Sage", "Raze"]
            .iter()
            .map(|a| player(a))
            .collect(),
    }
}

fn record(match_id: &str) -> MatchRecord {
    MatchRecord {
        match_id: match_id.into(),
        game_id: Some("g1".into()),
        map_name: "Ascent".into(),
        team_a: team("Alpha"),
        team_b: team("Bravo"),
    }
}

/// Source that serves two records per id and fails ids ending in "x".
struct StaticSource;

impl MatchSource for StaticSource {
    fn fetch(&self, match_id: &str) -> Result<Vec<MatchRecord>, FeedError> {
        if match_id.ends_with('x') {
            return Err(FeedError::Fetch {
                match_id: match_id.into(),
                reason: "not found".into(),
            });
        }
        Ok(vec![record(match_id), record(match_id)])
    }
}

#[test]
fn concurrent_collect_never_corrupts_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comps.jsonl");
    let sink = FeedSink::open_append(&path).unwrap();

    let ids: Vec<String> = (0..40).map(|i| format!("m{i}")).collect();
    let report = collect(&StaticSource, &ids, 8, &sink).unwrap();
    assert_eq!(report.fetched, 40);
    assert_eq!(report.records_written, 80);
    assert!(report.failed.is_empty());

    // Every line is one whole JSON object; the strict loader accepts all.
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 80);
    let batch = load_feed(&path).unwrap();
    assert_eq!(batch.len(), 160);
}

#[test]
fn failed_fetches_are_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comps.jsonl");
    let sink = FeedSink::open_append(&path).unwrap();

    let ids: Vec<String> = vec!["m1".into(), "badx".into(), "m2".into(), "alsox".into()];
    let report = collect(&StaticSource, &ids, 2, &sink).unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.records_written, 4);
    assert_eq!(report.failed.len(), 2);
    let mut failed_ids: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    failed_ids.sort();
    assert_eq!(failed_ids, vec!["alsox", "badx"]);
}

#[test]
fn single_worker_preserves_id_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comps.jsonl");
    let sink = FeedSink::open_append(&path).unwrap();

    let ids: Vec<String> = vec!["a".into(), "b".into()];
    collect(&StaticSource, &ids, 1, &sink).unwrap();

    let batch = load_feed(&path).unwrap();
    // Two records per id, two rosters per record.
    assert_eq!(batch.meta[0].match_id, "a");
    assert_eq!(batch.meta[7].match_id, "b");
}
