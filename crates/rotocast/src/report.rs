// Analysis report export: pretty JSON for the whole run plus a CSV of the
// trade suggestions.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use rotocast_core::roto::{RotoCalculator, SafetyMargin, StandingsRow};
use rotocast_core::trade::TradeSuggestion;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode report {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write trade csv {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub league_name: String,
    pub team_key: Option<String>,
    pub team_name: Option<String>,
    pub exported_at: DateTime<Utc>,
    pub remaining_games: u32,
    /// Display names of the scoring stats, in catalog order.
    pub stat_categories: Vec<String>,
    pub roto_stat_ids: Vec<String>,
    pub negative_stats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub standings: Vec<StandingsRow>,
    pub safety_margins: Vec<SafetyMargin>,
    pub trades: Vec<TradeSuggestion>,
}

impl AnalysisReport {
    /// Collect the standings (and, when a team is selected, its margins)
    /// alongside already computed trade suggestions.
    pub fn build(
        calculator: &RotoCalculator<'_>,
        league_name: &str,
        team_key: Option<&str>,
        remaining_games: u32,
        trades: Vec<TradeSuggestion>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let snapshot = calculator.snapshot();
        let catalog = snapshot.catalog();
        let roto_stat_ids: Vec<String> = catalog
            .scoring_stat_ids()
            .into_iter()
            .map(str::to_string)
            .collect();

        let metadata = ReportMetadata {
            league_name: league_name.to_string(),
            team_key: team_key.map(str::to_string),
            team_name: team_key
                .and_then(|tk| snapshot.team_name(tk))
                .map(str::to_string),
            exported_at,
            remaining_games,
            stat_categories: roto_stat_ids
                .iter()
                .map(|id| catalog.display_name(id))
                .collect(),
            negative_stats: roto_stat_ids
                .iter()
                .filter(|id| catalog.is_negative(id))
                .cloned()
                .collect(),
            roto_stat_ids,
        };

        AnalysisReport {
            metadata,
            standings: calculator.standings_table(),
            safety_margins: team_key
                .map(|tk| calculator.safety_margins(tk))
                .unwrap_or_default(),
            trades,
        }
    }

    /// `rotocast-<team-key>-<timestamp>`, or `rotocast-league-<timestamp>`
    /// without a selected team.
    pub fn file_stem(&self) -> String {
        let subject = self.metadata.team_key.as_deref().unwrap_or("league");
        let stamp = self.metadata.exported_at.format("%Y%m%dT%H%M%SZ");
        format!("rotocast-{subject}-{stamp}")
    }
}

/// One CSV line per trade suggestion.
#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    rank: usize,
    my_team: &'a str,
    you_give: String,
    you_get: String,
    opponent_team: &'a str,
    opponent_team_key: &'a str,
    my_old_score: f64,
    my_new_score: f64,
    my_delta: f64,
    their_old_score: f64,
    their_new_score: f64,
    their_delta: f64,
    mutually_beneficial: bool,
}

/// Files written by [`write_report`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub json: PathBuf,
    /// Only written when there are trade suggestions.
    pub trades_csv: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write the report into `dir` (created if missing).
pub fn write_report(report: &AnalysisReport, dir: &Path) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let stem = report.file_stem();
    let json = dir.join(format!("{stem}.json"));
    let file = File::create(&json).map_err(|e| ReportError::Io {
        path: json.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|e| ReportError::Json {
        path: json.clone(),
        source: e,
    })?;
    writer.flush().map_err(|e| ReportError::Io {
        path: json.clone(),
        source: e,
    })?;

    let trades_csv = if report.trades.is_empty() {
        None
    } else {
        let path = dir.join(format!("{stem}-trades.csv"));
        write_trades_csv(&report.trades, &path)?;
        Some(path)
    };

    info!("Report written to {}", json.display());
    Ok(ReportPaths { json, trades_csv })
}

fn write_trades_csv(trades: &[TradeSuggestion], path: &Path) -> Result<(), ReportError> {
    let csv_err = |e| ReportError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for (i, trade) in trades.iter().enumerate() {
        let r = &trade.result;
        wtr.serialize(TradeRow {
            rank: i + 1,
            my_team: &trade.my_team,
            you_give: r.my_players_traded.join("; "),
            you_get: r.their_players_traded.join("; "),
            opponent_team: &trade.opponent_team,
            opponent_team_key: &trade.opponent_team_key,
            my_old_score: r.my_old_score,
            my_new_score: r.my_new_score,
            my_delta: r.my_delta,
            their_old_score: r.their_old_score,
            their_new_score: r.their_new_score,
            their_delta: r.their_delta,
            mutually_beneficial: r.mutually_beneficial,
        })
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
