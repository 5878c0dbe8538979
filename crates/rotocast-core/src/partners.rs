// Category strengths and weaknesses per team, and trade partners whose
// profile complements a team's.

use serde::Serialize;

use crate::roto::RotoCalculator;

/// Share of the league at either end of a category ranking that counts as
/// a strength (top) or a weakness (bottom).
pub const PROFILE_SHARE: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProfile {
    pub team_key: String,
    pub team_name: String,
    /// Stat ids, catalog order.
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Two teams where each is strong in a category the other is weak in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerSuggestion {
    pub team_key: String,
    pub team_name: String,
    pub partner_key: String,
    pub partner_name: String,
    /// Categories where the team is weak and the partner strong.
    pub team_gains: Vec<String>,
    /// Categories where the partner is weak and the team strong.
    pub partner_gains: Vec<String>,
    pub synergy_score: usize,
}

impl RotoCalculator<'_> {
    /// Strengths and weaknesses for every team, in snapshot team order.
    ///
    /// A team ranked at sorted position `i` of `n` in a category is strong
    /// there when `i < n * PROFILE_SHARE` and weak when
    /// `n - 1 - i < n * PROFILE_SHARE`. Tied teams keep their ranking order.
    pub fn team_profiles(&self) -> Vec<TeamProfile> {
        let snapshot = self.snapshot();
        let standings = self.standings();
        let stat_ids = snapshot.catalog().scoring_stat_ids();

        snapshot
            .teams()
            .iter()
            .map(|team| {
                let mut profile = TeamProfile {
                    team_key: team.team_key.clone(),
                    team_name: team.name.clone(),
                    strengths: Vec::new(),
                    weaknesses: Vec::new(),
                };
                for stat_id in &stat_ids {
                    let Some(ranking) = standings.rankings.get(*stat_id) else {
                        continue;
                    };
                    let Some(pos) = ranking.iter().position(|e| e.team_key == team.team_key)
                    else {
                        continue;
                    };
                    let cutoff = ranking.len() as f64 * PROFILE_SHARE;
                    if (pos as f64) < cutoff {
                        profile.strengths.push(stat_id.to_string());
                    } else if ((ranking.len() - 1 - pos) as f64) < cutoff {
                        profile.weaknesses.push(stat_id.to_string());
                    }
                }
                profile
            })
            .collect()
    }

    /// Complementary trade partners for `team_key`, or for every team when
    /// `None`. A pairing is kept only when both sides gain at least one
    /// category; highest synergy first, ties in team order. Unknown teams
    /// get no suggestions.
    pub fn trade_partners(&self, team_key: Option<&str>) -> Vec<PartnerSuggestion> {
        let profiles = self.team_profiles();

        let mut suggestions = Vec::new();
        for team in &profiles {
            if team_key.is_some_and(|tk| tk != team.team_key) {
                continue;
            }
            for partner in &profiles {
                if partner.team_key == team.team_key {
                    continue;
                }
                let team_gains = overlap(&team.weaknesses, &partner.strengths);
                let partner_gains = overlap(&partner.weaknesses, &team.strengths);
                if team_gains.is_empty() || partner_gains.is_empty() {
                    continue;
                }
                suggestions.push(PartnerSuggestion {
                    team_key: team.team_key.clone(),
                    team_name: team.team_name.clone(),
                    partner_key: partner.team_key.clone(),
                    partner_name: partner.team_name.clone(),
                    synergy_score: team_gains.len() + partner_gains.len(),
                    team_gains,
                    partner_gains,
                });
            }
        }

        suggestions.sort_by(|a, b| b.synergy_score.cmp(&a.synergy_score));
        suggestions
    }
}

/// Ids in `needs` that also appear in `offers`, in `needs` order.
fn overlap(needs: &[String], offers: &[String]) -> Vec<String> {
    needs
        .iter()
        .filter(|id| offers.contains(*id))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
