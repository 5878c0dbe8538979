// League snapshot: teams, season totals, rosters, and per-player season
// averages for a single analysis run. Read-only once built.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::catalog::{RatioComponents, StatCatalog};
use crate::source::SourceError;

/// Stat id -> numeric value.
pub type StatLine = BTreeMap<String, f64>;

/// Team key -> season stat totals.
pub type TeamTotals = BTreeMap<String, StatLine>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("team {team_key} is listed more than once")]
    DuplicateTeam { team_key: String },

    #[error("roster given for unknown team {team_key}")]
    UnknownRosterTeam { team_key: String },

    #[error("player {player_key} is rostered by both {first_team} and {second_team}")]
    DuplicatePlayer {
        player_key: String,
        first_team: String,
        second_team: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_key: String,
    pub name: String,
}

/// Display metadata for a rostered player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub nba_team: String,
}

// ---------------------------------------------------------------------------
// Read access to team totals
// ---------------------------------------------------------------------------

/// Anything the Roto calculator can rank: the snapshot's own totals or a
/// hypothetical view layered on top of them.
pub trait TeamStatsView {
    /// Team keys in a stable order.
    fn team_keys(&self) -> Vec<&str>;

    fn stat(&self, team_key: &str, stat_id: &str) -> Option<f64>;
}

impl TeamStatsView for TeamTotals {
    fn team_keys(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }

    fn stat(&self, team_key: &str, stat_id: &str) -> Option<f64> {
        self.get(team_key).and_then(|line| line.get(stat_id)).copied()
    }
}

// ---------------------------------------------------------------------------
// Ratio helpers
// ---------------------------------------------------------------------------

/// Recompute every ratio whose made and attempted components are both
/// present in `line`.
pub fn normalize_ratios(catalog: &StatCatalog, line: &mut StatLine) {
    for ratio in catalog.ratios() {
        let (Some(&made), Some(&attempted)) = (line.get(&ratio.made), line.get(&ratio.attempted))
        else {
            continue;
        };
        line.insert(ratio.ratio.clone(), RatioComponents::compute(made, attempted));
    }
}

/// Sum player season totals into team totals. Every non-ratio stat is
/// summed (games played included); ratios are derived from the summed
/// components.
pub fn aggregate_totals<'a, I>(catalog: &StatCatalog, lines: I) -> StatLine
where
    I: IntoIterator<Item = &'a StatLine>,
{
    let mut total = StatLine::new();
    for line in lines {
        for (stat_id, &value) in line {
            if catalog.is_ratio(stat_id) {
                continue;
            }
            *total.entry(stat_id.clone()).or_insert(0.0) += value;
        }
    }
    normalize_ratios(catalog, &mut total);
    total
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LeagueSnapshot {
    catalog: StatCatalog,
    teams: Vec<TeamInfo>,
    totals: TeamTotals,
    rosters: HashMap<String, Vec<String>>,
    averages: HashMap<String, StatLine>,
    players: HashMap<String, PlayerInfo>,
}

impl LeagueSnapshot {
    pub fn builder(catalog: StatCatalog) -> SnapshotBuilder {
        SnapshotBuilder {
            catalog,
            teams: Vec::new(),
            totals: TeamTotals::new(),
            rosters: Vec::new(),
            averages: HashMap::new(),
            players: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &StatCatalog {
        &self.catalog
    }

    /// Teams in ingestion order.
    pub fn teams(&self) -> &[TeamInfo] {
        &self.teams
    }

    pub fn has_team(&self, team_key: &str) -> bool {
        self.teams.iter().any(|t| t.team_key == team_key)
    }

    pub fn team_name(&self, team_key: &str) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.team_key == team_key)
            .map(|t| t.name.as_str())
    }

    pub fn totals(&self) -> &TeamTotals {
        &self.totals
    }

    pub fn team_totals(&self, team_key: &str) -> Option<&StatLine> {
        self.totals.get(team_key)
    }

    /// Player keys on a team's roster; empty for unknown teams.
    pub fn roster(&self, team_key: &str) -> &[String] {
        self.rosters.get(team_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn player_averages(&self, player_key: &str) -> Option<&StatLine> {
        self.averages.get(player_key)
    }

    pub fn player_info(&self, player_key: &str) -> Option<&PlayerInfo> {
        self.players.get(player_key)
    }

    /// Display name for a player, falling back to the player key.
    pub fn player_name(&self, player_key: &str) -> String {
        self.players
            .get(player_key)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| player_key.to_string())
    }

    /// Number of players with recorded season averages.
    pub fn players_with_averages(&self) -> usize {
        self.averages.len()
    }

    /// Total rostered players across the league.
    pub fn rostered_players(&self) -> usize {
        self.rosters.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`LeagueSnapshot`] and enforces its invariants on `build`.
#[derive(Debug)]
pub struct SnapshotBuilder {
    catalog: StatCatalog,
    teams: Vec<TeamInfo>,
    totals: TeamTotals,
    rosters: Vec<(String, Vec<String>)>,
    averages: HashMap<String, StatLine>,
    players: HashMap<String, PlayerInfo>,
}

impl SnapshotBuilder {
    pub fn catalog(&self) -> &StatCatalog {
        &self.catalog
    }

    /// Add a team with its season totals.
    pub fn team(mut self, team_key: &str, name: &str, totals: StatLine) -> Self {
        self.teams.push(TeamInfo {
            team_key: team_key.to_string(),
            name: name.to_string(),
        });
        self.totals.insert(team_key.to_string(), totals);
        self
    }

    /// Set a team's roster (ordered player keys).
    pub fn roster<S: Into<String>>(mut self, team_key: &str, players: Vec<S>) -> Self {
        self.rosters.push((
            team_key.to_string(),
            players.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add a player's display info and per-game season averages.
    pub fn player(mut self, player_key: &str, info: PlayerInfo, averages: StatLine) -> Self {
        self.players.insert(player_key.to_string(), info);
        self.averages.insert(player_key.to_string(), averages);
        self
    }

    /// Add display info for a player without recorded averages.
    pub fn player_info(mut self, player_key: &str, info: PlayerInfo) -> Self {
        self.players.insert(player_key.to_string(), info);
        self
    }

    pub fn build(self) -> Result<LeagueSnapshot, SnapshotError> {
        let mut seen_teams: HashSet<&str> = HashSet::new();
        for team in &self.teams {
            if !seen_teams.insert(team.team_key.as_str()) {
                return Err(SnapshotError::DuplicateTeam {
                    team_key: team.team_key.clone(),
                });
            }
        }

        let mut rosters: HashMap<String, Vec<String>> = HashMap::new();
        let mut owner: HashMap<String, String> = HashMap::new();
        for (team_key, players) in self.rosters {
            if !seen_teams.contains(team_key.as_str()) {
                return Err(SnapshotError::UnknownRosterTeam { team_key });
            }
            let roster = rosters.entry(team_key.clone()).or_default();
            for player_key in players {
                match owner.get(&player_key) {
                    Some(first_team) if *first_team != team_key => {
                        return Err(SnapshotError::DuplicatePlayer {
                            player_key,
                            first_team: first_team.clone(),
                            second_team: team_key,
                        });
                    }
                    Some(_) => {
                        warn!(
                            "player {} listed twice on roster of {}, keeping one",
                            player_key, team_key
                        );
                    }
                    None => {
                        owner.insert(player_key.clone(), team_key.clone());
                        roster.push(player_key);
                    }
                }
            }
        }

        let mut totals = self.totals;
        for line in totals.values_mut() {
            normalize_ratios(&self.catalog, line);
        }

        Ok(LeagueSnapshot {
            catalog: self.catalog,
            teams: self.teams,
            totals,
            rosters,
            averages: self.averages,
            players: self.players,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogDefaults;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn line(pairs: &[(&str, f64)]) -> StatLine {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn catalog() -> StatCatalog {
        StatCatalog::from_defaults(&CatalogDefaults::default())
    }

    #[test]
    fn build_normalizes_ratios_from_components() {
        let snapshot = LeagueSnapshot::builder(catalog())
            .team("t1", "One", line(&[("3", 300.0), ("4", 650.0), ("5", 0.5)]))
            .build()
            .unwrap();
        let fg = snapshot.team_totals("t1").unwrap()["5"];
        assert!(approx_eq(fg, 300.0 / 650.0, 1e-12));
    }

    #[test]
    fn ratio_without_components_is_left_alone() {
        let snapshot = LeagueSnapshot::builder(catalog())
            .team("t1", "One", line(&[("5", 0.47)]))
            .build()
            .unwrap();
        assert!(approx_eq(snapshot.team_totals("t1").unwrap()["5"], 0.47, 1e-12));
    }

    #[test]
    fn zero_attempts_yield_zero_ratio() {
        let snapshot = LeagueSnapshot::builder(catalog())
            .team("t1", "One", line(&[("6", 0.0), ("7", 0.0), ("8", 0.8)]))
            .build()
            .unwrap();
        assert_eq!(snapshot.team_totals("t1").unwrap()["8"], 0.0);
    }

    #[test]
    fn duplicate_player_is_rejected() {
        let err = LeagueSnapshot::builder(catalog())
            .team("t1", "One", StatLine::new())
            .team("t2", "Two", StatLine::new())
            .roster("t1", vec!["p1", "p2"])
            .roster("t2", vec!["p2"])
            .build()
            .unwrap_err();
        match err {
            SnapshotError::DuplicatePlayer {
                player_key,
                first_team,
                second_team,
            } => {
                assert_eq!(player_key, "p2");
                assert_eq!(first_team, "t1");
                assert_eq!(second_team, "t2");
            }
            other => panic!("expected DuplicatePlayer, got: {other}"),
        }
    }

    #[test]
    fn repeated_roster_entry_is_kept_once() {
        let snapshot = LeagueSnapshot::builder(catalog())
            .team("t1", "One", StatLine::new())
            .roster("t1", vec!["p1", "p2", "p1"])
            .roster("t1", vec!["p2"])
            .build()
            .unwrap();
        assert_eq!(snapshot.roster("t1"), ["p1".to_string(), "p2".to_string()]);
        assert_eq!(snapshot.rostered_players(), 2);
    }

    #[test]
    fn roster_for_unknown_team_is_rejected() {
        let err = LeagueSnapshot::builder(catalog())
            .team("t1", "One", StatLine::new())
            .roster("t9", vec!["p1"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownRosterTeam { ref team_key } if team_key == "t9"));
    }

    #[test]
    fn duplicate_team_is_rejected() {
        let err = LeagueSnapshot::builder(catalog())
            .team("t1", "One", StatLine::new())
            .team("t1", "Again", StatLine::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateTeam { .. }));
    }

    #[test]
    fn accessors_fall_back_for_unknown_keys() {
        let snapshot = LeagueSnapshot::builder(catalog())
            .team("t1", "One", StatLine::new())
            .roster("t1", vec!["p1"])
            .build()
            .unwrap();
        assert!(snapshot.roster("nope").is_empty());
        assert_eq!(snapshot.roster("t1"), ["p1".to_string()]);
        assert_eq!(snapshot.player_name("p1"), "p1");
        assert!(snapshot.team_name("nope").is_none());
        assert_eq!(snapshot.rostered_players(), 1);
    }

    #[test]
    fn aggregate_sums_players_and_derives_ratios() {
        let a = line(&[("0", 50.0), ("3", 200.0), ("4", 400.0), ("5", 0.5), ("12", 500.0)]);
        let b = line(&[("0", 40.0), ("3", 100.0), ("4", 250.0), ("5", 0.4), ("12", 300.0)]);
        let total = aggregate_totals(&catalog(), [&a, &b]);

        assert!(approx_eq(total["12"], 800.0, 1e-9));
        assert!(approx_eq(total["0"], 90.0, 1e-9));
        assert!(approx_eq(total["3"], 300.0, 1e-9));
        assert!(approx_eq(total["5"], 300.0 / 650.0, 1e-12));
    }

    #[test]
    fn team_totals_view_reports_missing_stats_as_none() {
        let mut totals = TeamTotals::new();
        totals.insert("t1".into(), line(&[("12", 10.0)]));
        assert_eq!(totals.stat("t1", "12"), Some(10.0));
        assert_eq!(totals.stat("t1", "15"), None);
        assert_eq!(totals.stat("t2", "12"), None);
        assert_eq!(totals.team_keys(), vec!["t1"]);
    }
}
