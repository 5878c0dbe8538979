// One analysis run: load the league snapshot, print standings, optional
// rosters and category profiles, and for a selected team its gaps and trade
// suggestions, then optionally export.

use std::io::Write;

use anyhow::Context;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use rotocast_core::roto::RotoCalculator;
use rotocast_core::snapshot::LeagueSnapshot;
use rotocast_core::source::JsonLeagueFile;
use rotocast_core::trade::TradeSimulator;

use crate::config::Config;
use crate::render;
use crate::report::{self, AnalysisReport, ReportPaths};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("team key `{team_key}` not found in league; available teams:\n{available}")]
    UnknownTeam { team_key: String, available: String },
}

/// Partner suggestions printed at most.
const MAX_PARTNERS: usize = 10;

/// Switches that come from the command line only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub find_trades: bool,
    pub export: bool,
    /// Print rosters: the selected team's, or every team's.
    pub show_rosters: bool,
    /// Print category strengths/weaknesses and complementary partners.
    pub show_partners: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            find_trades: true,
            export: false,
            show_rosters: false,
            show_partners: false,
        }
    }
}

/// Load the configured snapshot.
pub fn load_snapshot(config: &Config) -> anyhow::Result<LeagueSnapshot> {
    let path = config.snapshot_path();
    let source = JsonLeagueFile::open(&path)
        .with_context(|| format!("failed to open league snapshot {}", path.display()))?;
    let snapshot = LeagueSnapshot::ingest(&source, &config.catalog)
        .with_context(|| format!("failed to ingest league snapshot {}", source.path().display()))?;
    info!("Loaded league snapshot from {}", source.path().display());
    Ok(snapshot)
}

/// Check a team key against the snapshot. `None` passes through.
pub fn select_team<'a>(
    snapshot: &LeagueSnapshot,
    team_key: Option<&'a str>,
) -> Result<Option<&'a str>, AppError> {
    let Some(team_key) = team_key else {
        return Ok(None);
    };
    if snapshot.has_team(team_key) {
        return Ok(Some(team_key));
    }
    let available = snapshot
        .teams()
        .iter()
        .map(|t| format!("  {} - {}", t.team_key, t.name))
        .collect::<Vec<_>>()
        .join("\n");
    Err(AppError::UnknownTeam {
        team_key: team_key.to_string(),
        available,
    })
}

/// Run the analysis, writing the rendered tables to `out`. Returns the
/// exported file paths when exporting.
pub fn run<W: Write>(
    config: &Config,
    options: RunOptions,
    out: &mut W,
) -> anyhow::Result<Option<ReportPaths>> {
    let snapshot = load_snapshot(config)?;
    let team_key = select_team(&snapshot, config.league.my_team.as_deref())?;

    let calculator =
        RotoCalculator::new(&snapshot).with_gain_epsilon(config.analysis.gain_epsilon);

    write!(
        out,
        "{}",
        render::standings_table(&calculator.standings_table(), snapshot.catalog())
    )?;

    if options.show_rosters {
        let keys: Vec<&str> = match team_key {
            Some(tk) => vec![tk],
            None => snapshot.teams().iter().map(|t| t.team_key.as_str()).collect(),
        };
        for key in keys {
            writeln!(out)?;
            write!(out, "{}", render::roster_table(&snapshot, key))?;
        }
    }

    if options.show_partners {
        writeln!(out)?;
        write!(
            out,
            "{}",
            render::profiles_table(&calculator.team_profiles(), snapshot.catalog())
        )?;
        let mut partners = calculator.trade_partners(team_key);
        partners.truncate(MAX_PARTNERS);
        write!(out, "{}", render::partners_table(&partners, snapshot.catalog()))?;
    }

    let mut trades = Vec::new();
    if let Some(team_key) = team_key {
        let team_name = snapshot.team_name(team_key).unwrap_or(team_key);
        writeln!(out)?;
        write!(
            out,
            "{}",
            render::margins_table(team_name, &calculator.safety_margins(team_key))
        )?;
        if let Some(totals) = snapshot.team_totals(team_key) {
            write!(out, "{}", render::team_totals_line(snapshot.catalog(), totals))?;
        }

        if options.find_trades {
            let simulator = TradeSimulator::new(calculator)
                .with_remaining_games(config.analysis.remaining_games)
                .with_parallel(config.analysis.parallel_search);
            info!(
                "Searching 1-for-1 trades for {} over {} remaining games",
                team_name,
                simulator.remaining_games()
            );
            trades = simulator.find_best_trades(team_key, config.analysis.top_trades);
            writeln!(out)?;
            write!(out, "{}", render::trades_table(&trades))?;
        }
    }

    if !options.export {
        return Ok(None);
    }
    let report = AnalysisReport::build(
        &calculator,
        &config.league.name,
        team_key,
        config.analysis.remaining_games,
        trades,
        Utc::now(),
    );
    let export_dir = config.export_dir();
    let paths = report::write_report(&report, &export_dir)
        .with_context(|| format!("failed to export report to {}", export_dir.display()))?;
    writeln!(out, "\n  Report exported to {}", paths.json.display())?;
    if let Some(csv) = &paths.trades_csv {
        writeln!(out, "  Trades exported to {}", csv.display())?;
    }
    Ok(Some(paths))
}
