// Rotisserie standings: per-category rankings with tie averaging, total Roto
// scores, standings gaps, and safety margins.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::snapshot::{LeagueSnapshot, TeamStatsView};

/// Amount added to a gap so that closing it strictly passes the team above
/// instead of tying it.
pub const DEFAULT_GAIN_EPSILON: f64 = 0.001;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One team's placement in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub team_key: String,
    pub value: f64,
    pub rank_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StandingsResult {
    /// Stat id -> entries ordered best to worst.
    pub rankings: BTreeMap<String, Vec<RankingEntry>>,
    /// Team key -> sum of rank points over every category the team is ranked in.
    pub roto_scores: BTreeMap<String, f64>,
    /// Team key -> stat id -> rank points.
    pub category_points: BTreeMap<String, BTreeMap<String, f64>>,
}

impl StandingsResult {
    /// Total Roto score for a team; 0.0 for teams not in the result.
    pub fn score(&self, team_key: &str) -> f64 {
        self.roto_scores.get(team_key).copied().unwrap_or(0.0)
    }
}

/// Distance to the neighbouring ranks in one category. All distances are
/// expressed as a positive amount of "improvement" or "slack", whatever the
/// category's sort direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsGap {
    /// 1 = best.
    pub current_rank: usize,
    pub current_value: f64,
    pub rank_points: f64,
    /// Improvement needed to strictly pass the team above; `None` when first.
    pub to_gain_rank: Option<f64>,
    /// Slack before falling behind the team below; `None` when last.
    pub to_lose_rank: Option<f64>,
    pub next_above_value: Option<f64>,
    pub next_below_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyMargin {
    pub stat_id: String,
    pub stat_name: String,
    pub current_rank: usize,
    pub safety_margin: Option<f64>,
    pub opportunity: Option<f64>,
    pub rank_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsRow {
    pub team_key: String,
    pub team_name: String,
    pub roto_score: f64,
    pub category_points: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Ranks teams over a league snapshot. Holds no state beyond its settings;
/// every call recomputes from the totals it is given.
#[derive(Debug, Clone, Copy)]
pub struct RotoCalculator<'a> {
    snapshot: &'a LeagueSnapshot,
    gain_epsilon: f64,
}

impl<'a> RotoCalculator<'a> {
    pub fn new(snapshot: &'a LeagueSnapshot) -> Self {
        RotoCalculator {
            snapshot,
            gain_epsilon: DEFAULT_GAIN_EPSILON,
        }
    }

    pub fn with_gain_epsilon(mut self, gain_epsilon: f64) -> Self {
        self.gain_epsilon = gain_epsilon;
        self
    }

    pub fn snapshot(&self) -> &'a LeagueSnapshot {
        self.snapshot
    }

    /// Standings over the snapshot's own totals.
    pub fn standings(&self) -> StandingsResult {
        self.calculate_standings(self.snapshot.totals())
    }

    /// Rank every team in `view` in each scoring category.
    ///
    /// A team missing a stat is left out of that category only. Within a
    /// category of `n` ranked teams, sorted positions `[i, j)` holding equal
    /// values share the mean of the points `n - i ..= n - j + 1`, so each
    /// category always hands out `n (n + 1) / 2` points in total.
    pub fn calculate_standings<V>(&self, view: &V) -> StandingsResult
    where
        V: TeamStatsView + ?Sized,
    {
        let catalog = self.snapshot.catalog();
        let team_keys = view.team_keys();

        let mut result = StandingsResult::default();
        for &team_key in &team_keys {
            result
                .category_points
                .insert(team_key.to_string(), BTreeMap::new());
        }

        for stat_id in catalog.scoring_stat_ids() {
            let mut values: Vec<(&str, f64)> = team_keys
                .iter()
                .filter_map(|&tk| view.stat(tk, stat_id).map(|v| (tk, v)))
                .collect();
            if values.is_empty() {
                continue;
            }

            if catalog.is_negative(stat_id) {
                values.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            } else {
                values.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            }

            let n = values.len() as f64;
            let mut ranked = Vec::with_capacity(values.len());
            let mut i = 0;
            while i < values.len() {
                let mut j = i + 1;
                while j < values.len() && values[j].1 == values[i].1 {
                    j += 1;
                }
                let points = n - (i + j - 1) as f64 / 2.0;
                for &(team_key, value) in &values[i..j] {
                    ranked.push(RankingEntry {
                        team_key: team_key.to_string(),
                        value,
                        rank_points: points,
                    });
                    if let Some(per_team) = result.category_points.get_mut(team_key) {
                        per_team.insert(stat_id.to_string(), points);
                    }
                }
                i = j;
            }
            result.rankings.insert(stat_id.to_string(), ranked);
        }

        for (team_key, per_team) in &result.category_points {
            result
                .roto_scores
                .insert(team_key.clone(), per_team.values().sum());
        }
        result
    }

    /// Gaps to the neighbouring ranks in each category the team is ranked
    /// in. Unknown teams get an empty map.
    pub fn standings_gaps(&self, team_key: &str) -> BTreeMap<String, StandingsGap> {
        let standings = self.standings();
        let catalog = self.snapshot.catalog();
        let mut gaps = BTreeMap::new();

        for (stat_id, ranked) in &standings.rankings {
            let Some(idx) = ranked.iter().position(|e| e.team_key == team_key) else {
                continue;
            };
            let entry = &ranked[idx];
            // Positive when `better` is ahead of `worse` in this category.
            let lead = |better: f64, worse: f64| {
                if catalog.is_negative(stat_id) {
                    worse - better
                } else {
                    better - worse
                }
            };

            let next_above_value = idx.checked_sub(1).map(|k| ranked[k].value);
            let next_below_value = ranked.get(idx + 1).map(|e| e.value);

            let to_gain_rank = next_above_value
                .map(|above| round3(lead(above, entry.value) + self.gain_epsilon));
            let to_lose_rank = next_below_value.map(|below| round3(lead(entry.value, below)));

            gaps.insert(
                stat_id.clone(),
                StandingsGap {
                    current_rank: idx + 1,
                    current_value: entry.value,
                    rank_points: entry.rank_points,
                    to_gain_rank,
                    to_lose_rank,
                    next_above_value,
                    next_below_value,
                },
            );
        }
        gaps
    }

    /// Gaps re-expressed as safety margin and opportunity, easiest rank-up
    /// first. Categories where the team is already first sort last.
    pub fn safety_margins(&self, team_key: &str) -> Vec<SafetyMargin> {
        let gaps = self.standings_gaps(team_key);
        let catalog = self.snapshot.catalog();

        let mut margins: Vec<SafetyMargin> = catalog
            .scoring_stat_ids()
            .into_iter()
            .filter_map(|stat_id| {
                gaps.get(stat_id).map(|gap| SafetyMargin {
                    stat_id: stat_id.to_string(),
                    stat_name: catalog.display_name(stat_id),
                    current_rank: gap.current_rank,
                    safety_margin: gap.to_lose_rank,
                    opportunity: gap.to_gain_rank,
                    rank_points: gap.rank_points,
                })
            })
            .collect();

        margins.sort_by(|a, b| {
            let a = a.opportunity.unwrap_or(f64::INFINITY);
            let b = b.opportunity.unwrap_or(f64::INFINITY);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
        margins
    }

    /// One row per team, highest Roto score first. Equal scores keep the
    /// snapshot's team order.
    pub fn standings_table(&self) -> Vec<StandingsRow> {
        let standings = self.standings();
        let mut rows: Vec<StandingsRow> = self
            .snapshot
            .teams()
            .iter()
            .map(|team| StandingsRow {
                team_key: team.team_key.clone(),
                team_name: team.name.clone(),
                roto_score: standings.score(&team.team_key),
                category_points: standings
                    .category_points
                    .get(&team.team_key)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.roto_score
                .partial_cmp(&a.roto_score)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogDefaults, StatCatalog, StatDefinition};
    use crate::snapshot::{StatLine, TeamTotals};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn line(pairs: &[(&str, f64)]) -> StatLine {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn pts_to_catalog() -> StatCatalog {
        StatCatalog::new(
            vec![
                StatDefinition::scoring("12", "PTS"),
                StatDefinition::negative("19", "TO"),
            ],
            &CatalogDefaults::default(),
        )
    }

    /// Four teams with PTS {5200, 5000, 4800, 4600} and TO {600, 500, 700, 550}.
    fn four_team_snapshot() -> LeagueSnapshot {
        LeagueSnapshot::builder(pts_to_catalog())
            .team("t1", "Team One", line(&[("12", 5200.0), ("19", 600.0)]))
            .team("t2", "Team Two", line(&[("12", 5000.0), ("19", 500.0)]))
            .team("t3", "Team Three", line(&[("12", 4800.0), ("19", 700.0)]))
            .team("t4", "Team Four", line(&[("12", 4600.0), ("19", 550.0)]))
            .build()
            .unwrap()
    }

    fn points(result: &StandingsResult, team: &str, stat: &str) -> f64 {
        result.category_points[team][stat]
    }

    #[test]
    fn positive_stat_ranks_high_values_first() {
        let snapshot = four_team_snapshot();
        let result = RotoCalculator::new(&snapshot).standings();
        assert_eq!(points(&result, "t1", "12"), 4.0);
        assert_eq!(points(&result, "t2", "12"), 3.0);
        assert_eq!(points(&result, "t3", "12"), 2.0);
        assert_eq!(points(&result, "t4", "12"), 1.0);
    }

    #[test]
    fn negative_stat_ranks_low_values_first() {
        let snapshot = four_team_snapshot();
        let result = RotoCalculator::new(&snapshot).standings();
        assert_eq!(points(&result, "t2", "19"), 4.0);
        assert_eq!(points(&result, "t4", "19"), 3.0);
        assert_eq!(points(&result, "t1", "19"), 2.0);
        assert_eq!(points(&result, "t3", "19"), 1.0);

        let order: Vec<&str> = result.rankings["19"]
            .iter()
            .map(|e| e.team_key.as_str())
            .collect();
        assert_eq!(order, vec!["t2", "t4", "t1", "t3"]);
    }

    #[test]
    fn roto_score_sums_category_points() {
        let snapshot = four_team_snapshot();
        let result = RotoCalculator::new(&snapshot).standings();
        assert_eq!(result.score("t1"), 6.0);
        assert_eq!(result.score("t2"), 7.0);
        assert_eq!(result.score("t3"), 3.0);
        assert_eq!(result.score("t4"), 4.0);
        assert_eq!(result.score("nobody"), 0.0);
    }

    #[test]
    fn tied_teams_split_contested_points() {
        let snapshot = LeagueSnapshot::builder(pts_to_catalog())
            .team("t1", "One", line(&[("12", 5200.0)]))
            .team("t2", "Two", line(&[("12", 5000.0)]))
            .team("t3", "Three", line(&[("12", 5000.0)]))
            .team("t4", "Four", line(&[("12", 4600.0)]))
            .build()
            .unwrap();
        let result = RotoCalculator::new(&snapshot).standings();
        assert_eq!(points(&result, "t1", "12"), 4.0);
        assert_eq!(points(&result, "t2", "12"), 2.5);
        assert_eq!(points(&result, "t3", "12"), 2.5);
        assert_eq!(points(&result, "t4", "12"), 1.0);
    }

    #[test]
    fn category_points_always_sum_to_triangular_number() {
        let cases: Vec<Vec<f64>> = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![3.0, 3.0, 3.0, 3.0, 3.0],
            vec![9.0, 9.0, 1.0, 1.0, 5.0],
            vec![2.0, 7.0, 7.0, 7.0, 0.5],
        ];
        for values in cases {
            let mut builder = LeagueSnapshot::builder(pts_to_catalog());
            for (i, v) in values.iter().enumerate() {
                builder = builder.team(&format!("t{i}"), "T", line(&[("12", *v), ("19", *v)]));
            }
            let snapshot = builder.build().unwrap();
            let result = RotoCalculator::new(&snapshot).standings();
            let n = values.len() as f64;
            for stat in ["12", "19"] {
                let total: f64 = result.rankings[stat].iter().map(|e| e.rank_points).sum();
                assert!(
                    approx_eq(total, n * (n + 1.0) / 2.0, 1e-9),
                    "values {values:?} stat {stat} total {total}"
                );
            }
        }
    }

    #[test]
    fn missing_stat_excludes_team_from_that_category_only() {
        let snapshot = LeagueSnapshot::builder(pts_to_catalog())
            .team("t1", "One", line(&[("12", 100.0), ("19", 10.0)]))
            .team("t2", "Two", line(&[("19", 5.0)]))
            .team("t3", "Three", line(&[("12", 50.0), ("19", 20.0)]))
            .build()
            .unwrap();
        let result = RotoCalculator::new(&snapshot).standings();

        assert_eq!(result.rankings["12"].len(), 2);
        assert_eq!(points(&result, "t1", "12"), 2.0);
        assert_eq!(points(&result, "t3", "12"), 1.0);
        assert!(!result.category_points["t2"].contains_key("12"));
        assert_eq!(result.score("t2"), 3.0);
    }

    #[test]
    fn empty_view_yields_empty_result() {
        let snapshot = four_team_snapshot();
        let result = RotoCalculator::new(&snapshot).calculate_standings(&TeamTotals::new());
        assert!(result.rankings.is_empty());
        assert!(result.roto_scores.is_empty());
    }

    #[test]
    fn gaps_for_middle_team() {
        let snapshot = four_team_snapshot();
        let gaps = RotoCalculator::new(&snapshot).standings_gaps("t2");

        let pts = &gaps["12"];
        assert_eq!(pts.current_rank, 2);
        assert_eq!(pts.next_above_value, Some(5200.0));
        assert_eq!(pts.next_below_value, Some(4800.0));
        assert!(approx_eq(pts.to_gain_rank.unwrap(), 200.001, 1e-9));
        assert!(approx_eq(pts.to_lose_rank.unwrap(), 200.0, 1e-9));

        // t2 leads TO with the lowest value.
        let to = &gaps["19"];
        assert_eq!(to.current_rank, 1);
        assert_eq!(to.to_gain_rank, None);
        assert!(approx_eq(to.to_lose_rank.unwrap(), 50.0, 1e-9));
    }

    #[test]
    fn negative_stat_gaps_are_directional() {
        let snapshot = four_team_snapshot();
        let gaps = RotoCalculator::new(&snapshot).standings_gaps("t1");
        // TO order: t2 500, t4 550, t1 600, t3 700.
        let to = &gaps["19"];
        assert_eq!(to.current_rank, 3);
        assert!(approx_eq(to.to_gain_rank.unwrap(), 50.001, 1e-9));
        assert!(approx_eq(to.to_lose_rank.unwrap(), 100.0, 1e-9));
    }

    #[test]
    fn first_has_no_gain_and_last_has_no_loss() {
        let snapshot = four_team_snapshot();
        let calc = RotoCalculator::new(&snapshot);
        assert_eq!(calc.standings_gaps("t1")["12"].to_gain_rank, None);
        let last = &calc.standings_gaps("t4")["12"];
        assert_eq!(last.current_rank, 4);
        assert_eq!(last.to_lose_rank, None);
        assert_eq!(last.next_below_value, None);
    }

    #[test]
    fn tied_team_needs_only_epsilon_to_pass() {
        let snapshot = LeagueSnapshot::builder(pts_to_catalog())
            .team("t1", "One", line(&[("12", 5000.0)]))
            .team("t2", "Two", line(&[("12", 5000.0)]))
            .build()
            .unwrap();
        let gap = &RotoCalculator::new(&snapshot).standings_gaps("t2")["12"];
        assert_eq!(gap.current_rank, 2);
        assert_eq!(gap.to_gain_rank, Some(0.001));
    }

    #[test]
    fn gain_epsilon_is_tunable() {
        let snapshot = four_team_snapshot();
        let gaps = RotoCalculator::new(&snapshot)
            .with_gain_epsilon(0.5)
            .standings_gaps("t2");
        assert!(approx_eq(gaps["12"].to_gain_rank.unwrap(), 200.5, 1e-9));
    }

    #[test]
    fn gaps_are_rounded_to_three_places() {
        let snapshot = LeagueSnapshot::builder(pts_to_catalog())
            .team("t1", "One", line(&[("12", 0.47123)]))
            .team("t2", "Two", line(&[("12", 0.46)]))
            .build()
            .unwrap();
        let gap = &RotoCalculator::new(&snapshot).standings_gaps("t2")["12"];
        assert_eq!(gap.to_gain_rank, Some(0.012));
    }

    #[test]
    fn unknown_team_has_no_gaps_or_margins() {
        let snapshot = four_team_snapshot();
        let calc = RotoCalculator::new(&snapshot);
        assert!(calc.standings_gaps("t99").is_empty());
        assert!(calc.safety_margins("t99").is_empty());
    }

    #[test]
    fn safety_margins_sort_by_opportunity_with_none_last() {
        let snapshot = four_team_snapshot();
        let margins = RotoCalculator::new(&snapshot).safety_margins("t2");
        assert_eq!(margins.len(), 2);
        assert_eq!(margins[0].stat_id, "12");
        assert_eq!(margins[0].stat_name, "PTS");
        assert_eq!(margins[1].stat_id, "19");
        assert_eq!(margins[1].opportunity, None);
        assert_eq!(margins[1].safety_margin, Some(50.0));

        for pair in margins.windows(2) {
            let a = pair[0].opportunity.unwrap_or(f64::INFINITY);
            let b = pair[1].opportunity.unwrap_or(f64::INFINITY);
            assert!(a <= b);
        }
    }

    #[test]
    fn standings_table_orders_by_score_and_keeps_ties_stable() {
        let snapshot = four_team_snapshot();
        let table = RotoCalculator::new(&snapshot).standings_table();
        let order: Vec<&str> = table.iter().map(|r| r.team_key.as_str()).collect();
        assert_eq!(order, vec!["t2", "t1", "t4", "t3"]);
        assert_eq!(table[0].team_name, "Team Two");
        assert_eq!(table[0].category_points["19"], 4.0);

        let tied = LeagueSnapshot::builder(pts_to_catalog())
            .team("b", "B", line(&[("12", 1.0)]))
            .team("a", "A", line(&[("12", 1.0)]))
            .build()
            .unwrap();
        let table = RotoCalculator::new(&tied).standings_table();
        assert_eq!(table[0].team_key, "b");
        assert_eq!(table[1].team_key, "a");
    }
}
