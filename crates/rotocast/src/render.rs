// Console output: standings, gaps and safety margins, rosters, category
// profiles and trade suggestions, laid out with tabled.

use std::fmt::Write;

use tabled::builder::Builder;
use tabled::{Table, Tabled};

use rotocast_core::catalog::StatCatalog;
use rotocast_core::partners::{PartnerSuggestion, TeamProfile};
use rotocast_core::roto::{SafetyMargin, StandingsRow};
use rotocast_core::snapshot::{LeagueSnapshot, StatLine};
use rotocast_core::trade::TradeSuggestion;

const RULE_WIDTH: usize = 90;

fn banner(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  {title}");
    let _ = writeln!(out, "{rule}");
}

/// Append a rendered table, indented two spaces.
fn indent(out: &mut String, table: &str) {
    for line in table.lines() {
        let _ = writeln!(out, "  {line}");
    }
}

/// Display names for a list of stat ids, or `None` when empty.
fn stat_names(catalog: &StatCatalog, stat_ids: &[String]) -> String {
    if stat_ids.is_empty() {
        return "None".to_string();
    }
    stat_ids
        .iter()
        .map(|id| catalog.display_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Signed one-decimal delta, e.g. `+1.5` or `-2.0`.
pub fn format_delta(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{delta:.1}")
    } else {
        format!("{delta:.1}")
    }
}

/// Stat value for display: ratios with three decimals, whole numbers
/// without a fraction, anything else with one decimal.
pub fn format_stat_value(catalog: &StatCatalog, stat_id: &str, value: f64) -> String {
    if catalog.is_ratio(stat_id) {
        format!("{value:.3}")
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// Rank, team, Roto score, then the points earned in each scoring category.
pub fn standings_table(rows: &[StandingsRow], catalog: &StatCatalog) -> String {
    let stat_ids = catalog.scoring_stat_ids();

    let mut builder = Builder::default();
    let mut header = vec!["Rank".to_string(), "Team".to_string(), "Roto".to_string()];
    header.extend(stat_ids.iter().map(|id| catalog.display_name(id)));
    builder.push_record(header);

    for (rank, row) in rows.iter().enumerate() {
        let mut record = vec![
            (rank + 1).to_string(),
            row.team_name.clone(),
            format!("{:.1}", row.roto_score),
        ];
        record.extend(stat_ids.iter().map(|id| {
            let pts = row.category_points.get(*id).copied().unwrap_or(0.0);
            format!("{pts:.1}")
        }));
        builder.push_record(record);
    }

    let mut out = String::new();
    banner(&mut out, "ROTISSERIE STANDINGS");
    indent(&mut out, &builder.build().to_string());
    out
}

/// One line of `NAME value` pairs for a team's scoring stats.
pub fn team_totals_line(catalog: &StatCatalog, totals: &StatLine) -> String {
    let parts: Vec<String> = catalog
        .scoring_stat_ids()
        .into_iter()
        .filter_map(|id| {
            totals.get(id).map(|&v| {
                format!("{} {}", catalog.display_name(id), format_stat_value(catalog, id, v))
            })
        })
        .collect();
    format!("  Season totals: {}\n", parts.join("  "))
}

// ---------------------------------------------------------------------------
// Gaps and safety margins
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct MarginRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Pts")]
    points: String,
    #[tabled(rename = "To Gain Rank")]
    to_gain: String,
    #[tabled(rename = "Safety Margin")]
    safety: String,
}

pub fn margins_table(team_name: &str, margins: &[SafetyMargin]) -> String {
    let rows: Vec<MarginRow> = margins
        .iter()
        .map(|m| MarginRow {
            category: m.stat_name.clone(),
            rank: m.current_rank,
            points: format!("{:.1}", m.rank_points),
            to_gain: m
                .opportunity
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "Already #1".to_string()),
            safety: m
                .safety_margin
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "Already Last".to_string()),
        })
        .collect();

    let mut out = String::new();
    banner(&mut out, &format!("STANDINGS GAPS & SAFETY MARGINS - {team_name}"));
    indent(&mut out, &Table::new(rows).to_string());
    out
}

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

/// A team's roster with each player's position, NBA team and per-game
/// averages for every catalog stat, closed by the team's season totals.
pub fn roster_table(snapshot: &LeagueSnapshot, team_key: &str) -> String {
    let catalog = snapshot.catalog();
    let team_name = snapshot.team_name(team_key).unwrap_or(team_key);

    let mut out = String::new();
    banner(&mut out, &format!("ROSTER - {team_name} ({team_key})"));

    let roster = snapshot.roster(team_key);
    if roster.is_empty() {
        out.push_str("  No players on roster.\n");
        return out;
    }

    let stat_cells = |line: Option<&StatLine>| -> Vec<String> {
        catalog
            .definitions()
            .iter()
            .map(|def| {
                line.and_then(|l| l.get(&def.stat_id))
                    .map(|&v| format_stat_value(catalog, &def.stat_id, v))
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect()
    };

    let mut builder = Builder::default();
    let mut header = vec!["Player".to_string(), "Pos".to_string(), "Team".to_string()];
    header.extend(catalog.definitions().iter().map(|def| def.display_name.clone()));
    builder.push_record(header);

    for player_key in roster {
        let (name, position, nba_team) = match snapshot.player_info(player_key) {
            Some(info) => (info.name.clone(), info.position.clone(), info.nba_team.clone()),
            None => (player_key.clone(), String::new(), String::new()),
        };
        let mut record = vec![name, position, nba_team];
        record.extend(stat_cells(snapshot.player_averages(player_key)));
        builder.push_record(record);
    }

    let mut totals = vec!["TEAM TOTALS".to_string(), String::new(), String::new()];
    totals.extend(stat_cells(snapshot.team_totals(team_key)));
    builder.push_record(totals);

    out.push_str("  Players show per-game averages; TEAM TOTALS are season totals.\n");
    indent(&mut out, &builder.build().to_string());
    out
}

// ---------------------------------------------------------------------------
// Category profiles and trade partners
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Strengths (Top 25%)")]
    strengths: String,
    #[tabled(rename = "Weaknesses (Bottom 25%)")]
    weaknesses: String,
}

pub fn profiles_table(profiles: &[TeamProfile], catalog: &StatCatalog) -> String {
    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            team: p.team_name.clone(),
            strengths: stat_names(catalog, &p.strengths),
            weaknesses: stat_names(catalog, &p.weaknesses),
        })
        .collect();

    let mut out = String::new();
    banner(&mut out, "TEAM CATEGORY PROFILES");
    indent(&mut out, &Table::new(rows).to_string());
    out
}

#[derive(Tabled)]
struct PartnerRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Partner")]
    partner: String,
    #[tabled(rename = "Team Improves")]
    team_gains: String,
    #[tabled(rename = "Partner Improves")]
    partner_gains: String,
    #[tabled(rename = "Synergy")]
    synergy: usize,
}

pub fn partners_table(partners: &[PartnerSuggestion], catalog: &StatCatalog) -> String {
    if partners.is_empty() {
        return "\n  No complementary trade partners found.\n".to_string();
    }

    let rows: Vec<PartnerRow> = partners
        .iter()
        .enumerate()
        .map(|(i, p)| PartnerRow {
            rank: i + 1,
            team: p.team_name.clone(),
            partner: p.partner_name.clone(),
            team_gains: stat_names(catalog, &p.team_gains),
            partner_gains: stat_names(catalog, &p.partner_gains),
            synergy: p.synergy_score,
        })
        .collect();

    let mut out = String::new();
    banner(&mut out, "COMPLEMENTARY TRADE PARTNERS");
    indent(&mut out, &Table::new(rows).to_string());
    out
}

// ---------------------------------------------------------------------------
// Trade suggestions
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "You Give")]
    give: String,
    #[tabled(rename = "You Get")]
    get: String,
    #[tabled(rename = "Opponent")]
    opponent: String,
    #[tabled(rename = "You")]
    my_delta: String,
    #[tabled(rename = "Them")]
    their_delta: String,
    #[tabled(rename = "Mutual")]
    mutual: &'static str,
}

pub fn trades_table(trades: &[TradeSuggestion]) -> String {
    if trades.is_empty() {
        return "\n  No beneficial trades found.\n".to_string();
    }

    let rows: Vec<TradeRow> = trades
        .iter()
        .enumerate()
        .map(|(i, trade)| {
            let r = &trade.result;
            TradeRow {
                rank: i + 1,
                give: r.my_players_traded.join(", "),
                get: r.their_players_traded.join(", "),
                opponent: trade.opponent_team.clone(),
                my_delta: format_delta(r.my_delta),
                their_delta: format_delta(r.their_delta),
                mutual: if r.mutually_beneficial { "yes" } else { "no" },
            }
        })
        .collect();

    let mut out = String::new();
    banner(&mut out, "TOP TRADE SUGGESTIONS");
    indent(&mut out, &Table::new(rows).to_string());

    for (i, trade) in trades.iter().enumerate() {
        let r = &trade.result;
        let _ = writeln!(out, "\n  Trade #{}:", i + 1);
        let _ = writeln!(out, "    You give:   {}", r.my_players_traded.join(", "));
        let _ = writeln!(out, "    You get:    {}", r.their_players_traded.join(", "));
        let _ = writeln!(out, "    From:       {}", trade.opponent_team);
        let _ = writeln!(
            out,
            "    Your Roto:  {:.1} -> {:.1} ({})",
            r.my_old_score,
            r.my_new_score,
            format_delta(r.my_delta)
        );
        let _ = writeln!(
            out,
            "    Their Roto: {:.1} -> {:.1} ({})",
            r.their_old_score,
            r.their_new_score,
            format_delta(r.their_delta)
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
