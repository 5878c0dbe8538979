// Trade simulation: rest-of-season projection, hypothetical team totals
// after a swap, and exhaustive one-for-one trade search.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::catalog::RatioComponents;
use crate::roto::{RotoCalculator, StandingsResult};
use crate::snapshot::{LeagueSnapshot, StatLine, TeamInfo, TeamStatsView, TeamTotals};

/// Games assumed left in the season when none is configured.
pub const DEFAULT_REMAINING_GAMES: u32 = 30;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Roto score impact of one simulated trade on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeResult {
    pub my_old_score: f64,
    pub my_new_score: f64,
    pub my_delta: f64,
    pub their_old_score: f64,
    pub their_new_score: f64,
    pub their_delta: f64,
    pub my_players_traded: Vec<String>,
    pub their_players_traded: Vec<String>,
    /// The trade does not cost the other side any Roto points.
    pub mutually_beneficial: bool,
}

/// A trade found by [`TradeSimulator::find_best_trades`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeSuggestion {
    #[serde(flatten)]
    pub result: TradeResult,
    pub my_team: String,
    pub opponent_team: String,
    pub opponent_team_key: String,
    pub my_player_key: String,
    pub their_player_key: String,
}

// ---------------------------------------------------------------------------
// Hypothetical totals
// ---------------------------------------------------------------------------

/// Snapshot totals with the lines of the teams involved in a trade replaced.
/// Every other team reads straight through to the shared totals.
struct TradeOverlay<'a> {
    base: &'a TeamTotals,
    replaced: BTreeMap<String, StatLine>,
}

impl TeamStatsView for TradeOverlay<'_> {
    fn team_keys(&self) -> Vec<&str> {
        self.base.team_keys()
    }

    fn stat(&self, team_key: &str, stat_id: &str) -> Option<f64> {
        match self.replaced.get(team_key) {
            Some(line) => line.get(stat_id).copied(),
            None => self.base.stat(team_key, stat_id),
        }
    }
}

/// Projected stats flowing into and out of one team.
#[derive(Default)]
struct Flow {
    incoming: StatLine,
    outgoing: StatLine,
}

impl Flow {
    fn net(&self, stat_id: &str) -> f64 {
        let incoming = self.incoming.get(stat_id).copied().unwrap_or(0.0);
        let outgoing = self.outgoing.get(stat_id).copied().unwrap_or(0.0);
        incoming - outgoing
    }
}

fn accumulate(into: &mut StatLine, projection: &StatLine) {
    for (stat_id, value) in projection {
        *into.entry(stat_id.clone()).or_insert(0.0) += value;
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TradeSimulator<'a> {
    snapshot: &'a LeagueSnapshot,
    calculator: RotoCalculator<'a>,
    remaining_games: u32,
    parallel: bool,
    /// Summable stats a trade moves: non-ratio scoring stats plus every
    /// ratio component.
    moved_stats: Vec<String>,
}

impl<'a> TradeSimulator<'a> {
    pub fn new(calculator: RotoCalculator<'a>) -> Self {
        let snapshot = calculator.snapshot();
        let catalog = snapshot.catalog();

        let mut moved_stats: Vec<String> = catalog
            .scoring_stat_ids()
            .into_iter()
            .filter(|id| !catalog.is_ratio(id))
            .map(str::to_string)
            .collect();
        for ratio in catalog.ratios() {
            for component in [&ratio.made, &ratio.attempted] {
                if !moved_stats.contains(component) {
                    moved_stats.push(component.clone());
                }
            }
        }

        TradeSimulator {
            snapshot,
            calculator,
            remaining_games: DEFAULT_REMAINING_GAMES,
            parallel: true,
            moved_stats,
        }
    }

    pub fn with_remaining_games(mut self, remaining_games: u32) -> Self {
        self.remaining_games = remaining_games;
        self
    }

    /// Score trade candidates on the rayon pool (default) or on the calling
    /// thread. Results are identical either way.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn remaining_games(&self) -> u32 {
        self.remaining_games
    }

    /// A player's expected remaining contribution: per-game averages scaled
    /// by the remaining games. Ratio stats pass through unscaled; they are
    /// rebuilt from their components when a trade is applied. Players
    /// without averages project to an empty line.
    pub fn project_player_rest_of_season(&self, player_key: &str) -> StatLine {
        let Some(averages) = self.snapshot.player_averages(player_key) else {
            return StatLine::new();
        };
        let catalog = self.snapshot.catalog();
        let games = f64::from(self.remaining_games);
        averages
            .iter()
            .map(|(stat_id, &avg)| {
                let value = if catalog.is_ratio(stat_id) { avg } else { avg * games };
                (stat_id.clone(), value)
            })
            .collect()
    }

    /// Score a trade where `my_team` sends `my_players` to `their_team` for
    /// `their_players`. Unknown team keys score 0 on both sides of the trade.
    pub fn simulate_trade<S: AsRef<str>>(
        &self,
        my_players: &[S],
        their_players: &[S],
        my_team: &str,
        their_team: &str,
    ) -> TradeResult {
        let baseline = self.calculator.standings();
        self.simulate_against(&baseline, my_players, their_players, my_team, their_team)
    }

    fn simulate_against<S: AsRef<str>>(
        &self,
        baseline: &StandingsResult,
        my_players: &[S],
        their_players: &[S],
        my_team: &str,
        their_team: &str,
    ) -> TradeResult {
        let overlay = self.apply_trade(my_players, their_players, my_team, their_team);
        let after = self.calculator.calculate_standings(&overlay);

        let my_old_score = baseline.score(my_team);
        let my_new_score = after.score(my_team);
        let their_old_score = baseline.score(their_team);
        let their_new_score = after.score(their_team);
        let their_delta = their_new_score - their_old_score;

        TradeResult {
            my_old_score,
            my_new_score,
            my_delta: my_new_score - my_old_score,
            their_old_score,
            their_new_score,
            their_delta,
            my_players_traded: self.names(my_players),
            their_players_traded: self.names(their_players),
            mutually_beneficial: their_delta >= 0.0,
        }
    }

    fn names<S: AsRef<str>>(&self, players: &[S]) -> Vec<String> {
        players
            .iter()
            .map(|pk| self.snapshot.player_name(pk.as_ref()))
            .collect()
    }

    /// Build the post-trade view. Each team's net flow (incoming minus
    /// outgoing) is applied once per moved stat, and ratios are rebuilt from
    /// their components.
    fn apply_trade<S: AsRef<str>>(
        &self,
        my_players: &[S],
        their_players: &[S],
        my_team: &str,
        their_team: &str,
    ) -> TradeOverlay<'a> {
        let mut flows: BTreeMap<&str, Flow> = BTreeMap::new();
        for (team, gets, gives) in [
            (my_team, their_players, my_players),
            (their_team, my_players, their_players),
        ] {
            let flow = flows.entry(team).or_default();
            for pk in gets {
                accumulate(&mut flow.incoming, &self.project_player_rest_of_season(pk.as_ref()));
            }
            for pk in gives {
                accumulate(&mut flow.outgoing, &self.project_player_rest_of_season(pk.as_ref()));
            }
        }

        let catalog = self.snapshot.catalog();
        let mut replaced = BTreeMap::new();
        for (team, flow) in flows {
            let Some(base) = self.snapshot.team_totals(team) else {
                continue;
            };
            let mut line = base.clone();
            for stat_id in &self.moved_stats {
                let delta = flow.net(stat_id);
                if delta != 0.0 {
                    *line.entry(stat_id.clone()).or_insert(0.0) += delta;
                }
            }
            for ratio in catalog.ratios() {
                rebuild_ratio(ratio, &flow, &mut line);
            }
            replaced.insert(team.to_string(), line);
        }

        TradeOverlay {
            base: self.snapshot.totals(),
            replaced,
        }
    }

    /// Every one-for-one trade between `my_team_key` and each other team,
    /// keeping those that raise my Roto score. Mutually beneficial trades
    /// come first, then larger gains; at most `max_results` are returned.
    pub fn find_best_trades(&self, my_team_key: &str, max_results: usize) -> Vec<TradeSuggestion> {
        if !self.snapshot.has_team(my_team_key) {
            return Vec::new();
        }

        let baseline = self.calculator.standings();
        let my_team = self.snapshot.team_name(my_team_key).unwrap_or(my_team_key);
        let my_roster = self.snapshot.roster(my_team_key);

        let candidates: Vec<(&TeamInfo, &str, &str)> = self
            .snapshot
            .teams()
            .iter()
            .filter(|opp| opp.team_key != my_team_key)
            .flat_map(|opp| {
                let theirs = self.snapshot.roster(&opp.team_key);
                my_roster.iter().flat_map(move |mine| {
                    theirs.iter().map(move |their| (opp, mine.as_str(), their.as_str()))
                })
            })
            .collect();

        let evaluate = |&(opp, mine, theirs): &(&TeamInfo, &str, &str)| TradeSuggestion {
            result: self.simulate_against(&baseline, &[mine], &[theirs], my_team_key, &opp.team_key),
            my_team: my_team.to_string(),
            opponent_team: opp.name.clone(),
            opponent_team_key: opp.team_key.clone(),
            my_player_key: mine.to_string(),
            their_player_key: theirs.to_string(),
        };

        let scored: Vec<TradeSuggestion> = if self.parallel {
            candidates.par_iter().map(evaluate).collect()
        } else {
            candidates.iter().map(evaluate).collect()
        };

        let mut improving: Vec<TradeSuggestion> = scored
            .into_iter()
            .filter(|s| s.result.my_delta > 0.0)
            .collect();
        debug!(
            "simulated {} trades for {}, {} improve the team",
            candidates.len(),
            my_team,
            improving.len()
        );

        improving.sort_by(|a, b| {
            b.result
                .mutually_beneficial
                .cmp(&a.result.mutually_beneficial)
                .then_with(|| {
                    b.result
                        .my_delta
                        .partial_cmp(&a.result.my_delta)
                        .unwrap_or(Ordering::Equal)
                })
        });
        improving.truncate(max_results);
        improving
    }
}

/// Recompute a ratio after a trade when the team carries both components or
/// the trade moved either of them. A missing component counts as 0.
fn rebuild_ratio(ratio: &RatioComponents, flow: &Flow, line: &mut StatLine) {
    let moved = flow.net(&ratio.made) != 0.0 || flow.net(&ratio.attempted) != 0.0;
    let carried = line.contains_key(&ratio.made) && line.contains_key(&ratio.attempted);
    if !moved && !carried {
        return;
    }
    let made = line.get(&ratio.made).copied().unwrap_or(0.0);
    let attempted = line.get(&ratio.attempted).copied().unwrap_or(0.0);
    line.insert(ratio.ratio.clone(), RatioComponents::compute(made, attempted));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
