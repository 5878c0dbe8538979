// Command-line surface. Flags override the matching rotocast.toml values.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Debug, Clone, Parser)]
#[command(name = "rotocast")]
#[command(about = "Rotisserie standings, gap analysis and trade suggestions for fantasy basketball")]
#[command(version)]
pub struct Cli {
    /// Directory holding config/ (and defaults/ for first-run setup)
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Team key to analyze, e.g. 428.l.21454.t.1
    #[arg(short, long)]
    pub team_key: Option<String>,

    /// Games assumed left for every player
    #[arg(long)]
    pub remaining_games: Option<u32>,

    /// Number of trade suggestions to show
    #[arg(long)]
    pub top_trades: Option<usize>,

    /// Write the JSON report and trade CSV to the export directory
    #[arg(long)]
    pub export: bool,

    /// Skip the trade search
    #[arg(long)]
    pub no_trades: bool,

    /// Print rosters with player averages (the selected team's, or all)
    #[arg(long)]
    pub rosters: bool,

    /// Print category strengths/weaknesses and complementary trade partners
    #[arg(long)]
    pub partners: bool,

    /// Run the trade search on the calling thread only
    #[arg(long)]
    pub sequential: bool,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(team_key) = &self.team_key {
            config.league.my_team = Some(team_key.clone());
        }
        if let Some(games) = self.remaining_games {
            config.analysis.remaining_games = games;
        }
        if let Some(top) = self.top_trades {
            config.analysis.top_trades = top;
        }
        if self.sequential {
            config.analysis.parallel_search = false;
        }
    }
}
