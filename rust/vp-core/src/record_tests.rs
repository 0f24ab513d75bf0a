use crate::record::{MatchRecord, MetricValue, PlayerResult, STAT_METRICS};

fn player_json(agent: &str) -> String {
    format!(
        r#"{{"player":"p","team":"T","agent":"{agent}","acs":200,"kills":15,"deaths":10,"assists":4,"adr":130,"fb":2,"fd":1}}"#
    )
}

fn record_json() -> String {
    let players_a: Vec<String> = ["Jett", "Sova", "Omen", "Sage", "Raze"]
        .iter()
        .map(|a| player_json(a))
        .collect();
    let players_b: Vec<String> = ["Viper", "Fade", "Breach", "Chamber", "Neon"]
        .iter()
        .map(|a| player_json(a))
        .collect();
    format!(
        r#"{{"match_id":147005,"game_id":"g1","map_name":"Ascent",
            "team_a":{{"team":"Alpha","score":13,"players":[{}]}},
            "team_b":{{"team":"Bravo","score":"7","players":[{}]}}}}"#,
        players_a.join(","),
        players_b.join(",")
    )
}

#[test]
fn parses_full_record() {
    let rec: MatchRecord = serde_json::from_str(&record_json()).unwrap();
    assert_eq!(rec.match_id, "147005");
    assert_eq!(rec.game_id.as_deref(), Some("g1"));
    assert_eq!(rec.map_name, "Ascent");
    assert_eq!(rec.team_a.score, 13);
    // String scores coming from the scraper parse to integers.
    assert_eq!(rec.team_b.score, 7);
    assert!(rec.team_a.roster_len_ok());
    assert_eq!(rec.team_b.players[0].agent, "Viper");
}

#[test]
fn accepts_alias_keys() {
    let json = record_json()
        .replace("map_name", "map")
        .replace("team_a", "a_team")
        .replace("team_b", "b_team");
    let rec: MatchRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(rec.map_name, "Ascent");
    assert_eq!(rec.team_a.team, "Alpha");
}

#[test]
fn game_id_may_be_absent() {
    let json = record_json().replace(r#""game_id":"g1","#, "");
    let rec: MatchRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(rec.game_id, None);
}

#[test]
fn short_roster_is_detectable() {
    let players: Vec<String> = ["Jett", "Sova", "Omen", "Sage"]
        .iter()
        .map(|a| player_json(a))
        .collect();
    let team = format!(r#"{{"team":"Alpha","score":13,"players":[{}]}}"#, players.join(","));
    let side: crate::record::TeamResult = serde_json::from_str(&team).unwrap();
    assert!(!side.roster_len_ok());
}

#[test]
fn split_metrics_flatten_attack_then_defense() {
    let json = r#"{"player":"p","team":"T","agent":"Jett",
        "acs":{"atk":240,"def":180},"kills":{"atk":10,"def":8},
        "deaths":{"atk":6,"def":5},"assists":{"atk":2,"def":3},
        "adr":{"atk":150,"def":120},"fk":{"atk":2,"def":1},"fd":{"atk":1,"def":0}}"#;
    let p: PlayerResult = serde_json::from_str(json).unwrap();
    assert_eq!(p.stat_width(), 2 * STAT_METRICS.len());
    let v = p.stat_vector();
    assert_eq!(&v[0..2], &[240.0, 180.0]);
    // `fk` aliases `fb`.
    assert_eq!(p.fb, MetricValue::Split { atk: 2.0, def: 1.0 });
}

#[test]
fn scalar_metrics_have_unit_width() {
    let p: PlayerResult = serde_json::from_str(&player_json("Jett")).unwrap();
    assert_eq!(p.stat_width(), STAT_METRICS.len());
    assert_eq!(p.stat_vector(), vec![200.0, 15.0, 10.0, 4.0, 130.0, 2.0, 1.0]);
}
