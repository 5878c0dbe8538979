// Ingestion boundary: the adapter trait the snapshot is built from, plus a
// JSON-file implementation.
//
// Adapters hand over canonical `{stat_id -> f64}` maps. Any sniffing of raw
// provider payloads (flat vs nested stat blocks, string-encoded numbers)
// belongs inside an adapter, never in the analysis code.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{CatalogDefaults, RawStatCategory, StatCatalog};
use crate::snapshot::{aggregate_totals, LeagueSnapshot, PlayerInfo, SnapshotError, StatLine};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read league file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse league file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("league source unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A team and, when the provider reports them, its season totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<StatLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecord {
    pub team_key: String,
    pub players: Vec<String>,
}

/// A player's per-game season averages, optional season totals, and
/// display info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_key: String,
    #[serde(flatten)]
    pub info: PlayerInfo,
    #[serde(default)]
    pub averages: StatLine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_totals: Option<StatLine>,
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// Where league data comes from. Calls are made once each, in declaration
/// order, when a snapshot is ingested.
pub trait LeagueSource {
    fn stat_categories(&self) -> Result<Vec<RawStatCategory>, SourceError>;

    /// Teams in standings order.
    fn teams(&self) -> Result<Vec<TeamRecord>, SourceError>;

    fn rosters(&self) -> Result<Vec<RosterRecord>, SourceError>;

    fn player_stats(&self) -> Result<Vec<PlayerRecord>, SourceError>;
}

// ---------------------------------------------------------------------------
// JSON league document
// ---------------------------------------------------------------------------

/// On-disk shape of a league snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_id: Option<String>,
    #[serde(default)]
    pub stat_categories: Vec<RawStatCategory>,
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
    #[serde(default)]
    pub rosters: Vec<RosterRecord>,
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
}

/// A league document loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonLeagueFile {
    path: PathBuf,
    document: LeagueDocument,
}

impl JsonLeagueFile {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(path, file)
    }

    /// Parse a document from any reader; `origin` is only used in errors.
    pub fn from_reader<R: Read>(origin: &Path, rdr: R) -> Result<Self, SourceError> {
        let document = serde_json::from_reader(rdr).map_err(|e| SourceError::Json {
            path: origin.to_path_buf(),
            source: e,
        })?;
        Ok(JsonLeagueFile {
            path: origin.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &LeagueDocument {
        &self.document
    }
}

impl LeagueSource for JsonLeagueFile {
    fn stat_categories(&self) -> Result<Vec<RawStatCategory>, SourceError> {
        Ok(self.document.stat_categories.clone())
    }

    fn teams(&self) -> Result<Vec<TeamRecord>, SourceError> {
        Ok(self.document.teams.clone())
    }

    fn rosters(&self) -> Result<Vec<RosterRecord>, SourceError> {
        Ok(self.document.rosters.clone())
    }

    fn player_stats(&self) -> Result<Vec<PlayerRecord>, SourceError> {
        Ok(self.document.players.clone())
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

impl LeagueSnapshot {
    /// Build a snapshot from a source.
    ///
    /// Steps:
    /// 1. Resolve the stat catalog from the league's category settings.
    /// 2. Register teams in source order. Teams without reported totals get
    ///    totals aggregated from their rostered players' season totals.
    /// 3. Register rosters, dropping blank player keys.
    /// 4. Register player averages and display info.
    pub fn ingest(
        source: &dyn LeagueSource,
        defaults: &CatalogDefaults,
    ) -> Result<Self, SnapshotError> {
        let categories = source.stat_categories()?;
        let catalog = StatCatalog::from_settings(&categories, defaults);

        let teams = source.teams()?;
        let rosters = source.rosters()?;
        let players = source.player_stats()?;

        let season_totals: HashMap<&str, &StatLine> = players
            .iter()
            .filter_map(|p| p.season_totals.as_ref().map(|t| (p.player_key.as_str(), t)))
            .collect();
        let roster_by_team: HashMap<&str, &[String]> = rosters
            .iter()
            .map(|r| (r.team_key.as_str(), r.players.as_slice()))
            .collect();

        let mut builder = LeagueSnapshot::builder(catalog);

        for team in &teams {
            let totals = match &team.totals {
                Some(totals) => totals.clone(),
                None => {
                    let roster = roster_by_team.get(team.team_key.as_str()).copied().unwrap_or(&[]);
                    let lines: Vec<&StatLine> = roster
                        .iter()
                        .filter_map(|pk| season_totals.get(pk.as_str()).copied())
                        .collect();
                    if lines.is_empty() {
                        warn!(
                            "no totals or player season totals for team {}, treating as empty",
                            team.name
                        );
                    }
                    aggregate_totals(builder.catalog(), lines)
                }
            };
            builder = builder.team(&team.team_key, &team.name, totals);
        }

        for roster in rosters {
            let total = roster.players.len();
            let keys: Vec<String> = roster
                .players
                .into_iter()
                .filter(|pk| !pk.trim().is_empty())
                .collect();
            if keys.len() != total {
                warn!(
                    "dropped {} blank player keys from roster of {}",
                    total - keys.len(),
                    roster.team_key
                );
            }
            builder = builder.roster(&roster.team_key, keys);
        }

        for player in players {
            builder = if player.averages.is_empty() {
                builder.player_info(&player.player_key, player.info)
            } else {
                builder.player(&player.player_key, player.info, player.averages)
            };
        }

        let snapshot = builder.build()?;
        info!(
            "Ingested {} teams; averages for {} of {} rostered players",
            snapshot.teams().len(),
            snapshot.players_with_averages(),
            snapshot.rostered_players()
        );
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
