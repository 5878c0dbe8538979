// Library root: Roto scoring and trade analysis over an in-memory league
// snapshot.

pub mod catalog;
pub mod partners;
pub mod roto;
pub mod snapshot;
pub mod source;
pub mod trade;

pub use catalog::{CatalogDefaults, RatioComponents, RawStatCategory, StatCatalog, StatDefinition};
pub use partners::{PartnerSuggestion, TeamProfile};
pub use roto::{RotoCalculator, SafetyMargin, StandingsGap, StandingsResult, StandingsRow};
pub use snapshot::{LeagueSnapshot, SnapshotError, StatLine, TeamStatsView, TeamTotals};
pub use source::{JsonLeagueFile, LeagueSource, SourceError};
pub use trade::{TradeResult, TradeSimulator, TradeSuggestion};
