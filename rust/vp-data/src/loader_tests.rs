use std::io::Write;

use crate::loader::{load_feed, load_feed_lenient};
use crate::DataError;

fn player(agent: &str, kills: u32) -> String {
    format!(
        r#"{{"player":"p","team":"T","agent":"{agent}","acs":200,"kills":{kills},"deaths":10,"assists":4,"adr":130,"fb":2,"fd":1}}"#
    )
}

fn team(name: &str, agents: &[&str]) -> String {
    let players: Vec<String> = agents.iter().enumerate().map(|(i, a)| player(a, i as u32)).collect();
    format!(
        r#"{{"team":"{name}","score":13,"players":[{}]}}"#,
        players.join(",")
    )
}

fn line(map: &str, a: &[&str], b: &[&str]) -> String {
    format!(
        r#"{{"match_id":1,"map_name":"{map}","team_a":{},"team_b":{}}}"#,
        team("Alpha", a),
        team("Bravo", b)
    )
}

fn write_feed(lines: &[String]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comps.jsonl");
    let mut f = std::fs::File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

const FIVE_A: [&str; 5] = ["Jett", "Sova", "Omen", "Sage", "Raze"];
const FIVE_B: [&str; 5] = ["Viper", "Fade", "Breach", "Chamber", "Neon"];

#[test]
fn one_line_yields_two_rosters() {
    let (_dir, path) = write_feed(&[line("Ascent", &FIVE_A, &FIVE_B)]);
    let batch = load_feed(&path).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.agents[0][0], "Jett");
    assert_eq!(batch.agents[1][0], "Viper");
    // The roster's 5 map entries are identical.
    assert!(batch.maps[0].iter().all(|m| m == "Ascent"));
    assert_eq!(batch.stat_dim, 7);
    assert_eq!(batch.meta[0].team, "Alpha");
    assert_eq!(batch.meta[1].team, "Bravo");
    // kills differ per slot in the fixture; check co-indexing held up.
    assert_eq!(batch.stats[0][3][1], 3.0);
}

#[test]
fn strict_load_reports_offending_line() {
    let (_dir, path) = write_feed(&[
        line("Ascent", &FIVE_A, &FIVE_B),
        "{not json".to_string(),
    ]);
    match load_feed(&path) {
        Err(DataError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn lenient_load_skips_and_counts() {
    let (_dir, path) = write_feed(&[
        line("Ascent", &FIVE_A, &FIVE_B),
        "{not json".to_string(),
        line("Bind", &FIVE_A, &FIVE_B),
    ]);
    let report = load_feed_lenient(&path).unwrap();
    assert_eq!(report.batch.len(), 4);
    assert_eq!(report.lines_read, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 2);
}

#[test]
fn short_roster_is_fatal_even_in_lenient_mode() {
    let four = ["Jett", "Sova", "Omen", "Sage"];
    let (_dir, path) = write_feed(&[
        line("Ascent", &FIVE_A, &FIVE_B),
        line("Bind", &four, &FIVE_B),
    ]);
    match load_feed_lenient(&path) {
        Err(DataError::RosterLength { line, found, expected }) => {
            assert_eq!(line, 2);
            assert_eq!(found, 4);
            assert_eq!(expected, 5);
        }
        other => panic!("expected roster length error, got {other:?}"),
    }
}

#[test]
fn mixed_stat_widths_are_fatal() {
    let split_player = r#"{"player":"p","team":"T","agent":"Jett","acs":{"atk":240,"def":180},"kills":{"atk":10,"def":8},"deaths":{"atk":6,"def":5},"assists":{"atk":2,"def":3},"adr":{"atk":150,"def":120},"fb":{"atk":2,"def":1},"fd":{"atk":1,"def":0}}"#;
    let mut split_team = format!(r#"{{"team":"Alpha","score":13,"players":[{}]}}"#,
        vec![split_player; 5].join(","));
    split_team = split_team.replace("\n", "");
    let mixed = format!(
        r#"{{"match_id":2,"map_name":"Bind","team_a":{},"team_b":{}}}"#,
        split_team,
        team("Bravo", &FIVE_B)
    );
    let (_dir, path) = write_feed(&[mixed]);
    match load_feed(&path) {
        Err(DataError::StatWidth { line, found, expected }) => {
            assert_eq!(line, 1);
            assert_eq!(found, 7);
            assert_eq!(expected, 14);
        }
        other => panic!("expected stat width error, got {other:?}"),
    }
}

#[test]
fn empty_feed_is_an_error() {
    let (_dir, path) = write_feed(&[]);
    assert!(matches!(load_feed(&path), Err(DataError::EmptyFeed)));
}

#[test]
fn blank_lines_are_ignored() {
    let (_dir, path) = write_feed(&[
        String::new(),
        line("Ascent", &FIVE_A, &FIVE_B),
        String::new(),
    ]);
    let batch = load_feed(&path).unwrap();
    assert_eq!(batch.len(), 2);
}
