//! Match record schema for the line-delimited feed.
//!
//! One feed line is one played map of one match: two teams, five players
//! each, per-player agent pick and performance metrics. Records are
//! immutable once parsed; the loader in `vp-data` turns them into rosters.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ROSTER_SIZE;

/// Ordered metric names every player object must carry.
///
/// The feed may spell first-bloods as `fk`; it is accepted as an alias
/// for `fb`. Each metric is either a plain number or an attack/defense
/// pair, and the whole feed must agree on which (see the loader).
pub const STAT_METRICS: [&str; 7] = ["acs", "kills", "deaths", "assists", "adr", "fb", "fd"];

/// One numeric performance metric, optionally split by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Split { atk: f64, def: f64 },
}

impl MetricValue {
    /// Number of columns this value flattens into.
    pub fn width(&self) -> usize {
        match self {
            MetricValue::Scalar(_) => 1,
            MetricValue::Split { .. } => 2,
        }
    }

    /// Append the flattened columns (`atk` before `def` for pairs).
    pub fn push_into(&self, out: &mut Vec<f64>) {
        match *self {
            MetricValue::Scalar(v) => out.push(v),
            MetricValue::Split { atk, def } => {
                out.push(atk);
                out.push(def);
            }
        }
    }
}

/// One player's result on one played map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub team: String,
    pub agent: String,
    pub acs: MetricValue,
    pub kills: MetricValue,
    pub deaths: MetricValue,
    pub assists: MetricValue,
    pub adr: MetricValue,
    #[serde(alias = "fk")]
    pub fb: MetricValue,
    pub fd: MetricValue,
}

impl PlayerResult {
    /// Metric values in `STAT_METRICS` order.
    pub fn metrics(&self) -> [MetricValue; STAT_METRICS.len()] {
        [
            self.acs,
            self.kills,
            self.deaths,
            self.assists,
            self.adr,
            self.fb,
            self.fd,
        ]
    }

    /// Total flattened column count for this player's metrics.
    pub fn stat_width(&self) -> usize {
        self.metrics().iter().map(MetricValue::width).sum()
    }

    /// Flatten all metrics into one stat vector, `STAT_METRICS` order.
    pub fn stat_vector(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.stat_width());
        for m in self.metrics() {
            m.push_into(&mut out);
        }
        out
    }
}

/// One team's result: name, score, and its roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub team: String,
    #[serde(deserialize_with = "de_int_or_string")]
    pub score: i64,
    pub players: Vec<PlayerResult>,
}

impl TeamResult {
    /// Rosters must hold exactly [`ROSTER_SIZE`] players; short or long
    /// rosters are rejected, never truncated or padded.
    pub fn roster_len_ok(&self) -> bool {
        self.players.len() == ROSTER_SIZE
    }
}

/// One played map of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(deserialize_with = "de_id")]
    pub match_id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub game_id: Option<String>,
    #[serde(alias = "map")]
    pub map_name: String,
    #[serde(alias = "a_team")]
    pub team_a: TeamResult,
    #[serde(alias = "b_team")]
    pub team_b: TeamResult,
}

/// Per-roster metadata carried alongside derived training examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMeta {
    pub match_id: String,
    pub game_id: Option<String>,
    pub team: String,
    pub score: i64,
}

impl MatchRecord {
    pub fn meta_for(&self, side: &TeamResult) -> RosterMeta {
        RosterMeta {
            match_id: self.match_id.clone(),
            game_id: self.game_id.clone(),
            team: side.team.clone(),
            score: side.score,
        }
    }
}

// The feed carries ids and scores as either JSON numbers or strings,
// depending on which scraper version produced it.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(i64),
    Text(String),
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match NumOrString::deserialize(d)? {
        NumOrString::Num(n) => n.to_string(),
        NumOrString::Text(s) => s,
    })
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<NumOrString>::deserialize(d)? {
        None => None,
        Some(NumOrString::Num(n)) => Some(n.to_string()),
        Some(NumOrString::Text(s)) => Some(s),
    })
}

fn de_int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match NumOrString::deserialize(d)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("invalid score: {s:?}"))),
    }
}
