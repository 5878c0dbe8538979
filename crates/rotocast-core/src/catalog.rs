// Stat catalog: display names, scoring eligibility, and sort direction for
// every stat id a league reports, plus the made/attempted components behind
// each percentage stat.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A single stat the league tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDefinition {
    pub stat_id: String,
    pub display_name: String,
    pub counts_for_scoring: bool,
    /// Lower is better (e.g. turnovers).
    #[serde(default)]
    pub is_negative: bool,
}

impl StatDefinition {
    /// A higher-is-better scoring category.
    pub fn scoring(stat_id: &str, display_name: &str) -> Self {
        StatDefinition {
            stat_id: stat_id.to_string(),
            display_name: display_name.to_string(),
            counts_for_scoring: true,
            is_negative: false,
        }
    }

    /// A lower-is-better scoring category.
    pub fn negative(stat_id: &str, display_name: &str) -> Self {
        StatDefinition {
            is_negative: true,
            ..Self::scoring(stat_id, display_name)
        }
    }

    /// A tracked stat that does not count toward Roto scoring.
    pub fn display_only(stat_id: &str, display_name: &str) -> Self {
        StatDefinition {
            counts_for_scoring: false,
            ..Self::scoring(stat_id, display_name)
        }
    }
}

/// A percentage stat and the made/attempted stats it is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioComponents {
    pub ratio: String,
    pub made: String,
    pub attempted: String,
}

impl RatioComponents {
    pub fn new(ratio: &str, made: &str, attempted: &str) -> Self {
        RatioComponents {
            ratio: ratio.to_string(),
            made: made.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// `made / attempted`, or 0.0 when nothing was attempted.
    pub fn compute(made: f64, attempted: f64) -> f64 {
        if attempted > 0.0 {
            made / attempted
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback table
// ---------------------------------------------------------------------------

/// The catalog used when league settings are unavailable or name no scoring
/// stats. Also the sole source of ratio component definitions.
///
/// The default table is the standard 9-category basketball Roto layout:
///
/// | id | name | role                  |
/// |----|------|-----------------------|
/// | 5  | FG%  | scoring (FGM / FGA)   |
/// | 8  | FT%  | scoring (FTM / FTA)   |
/// | 10 | 3PTM | scoring               |
/// | 12 | PTS  | scoring               |
/// | 15 | REB  | scoring               |
/// | 16 | AST  | scoring               |
/// | 17 | STL  | scoring               |
/// | 18 | BLK  | scoring               |
/// | 19 | TO   | scoring, lower better |
/// | 3  | FGM  | component             |
/// | 4  | FGA  | component             |
/// | 6  | FTM  | component             |
/// | 7  | FTA  | component             |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefaults {
    pub stats: Vec<StatDefinition>,
    pub ratios: Vec<RatioComponents>,
}

impl Default for CatalogDefaults {
    fn default() -> Self {
        CatalogDefaults {
            stats: vec![
                StatDefinition::scoring("5", "FG%"),
                StatDefinition::scoring("8", "FT%"),
                StatDefinition::scoring("10", "3PTM"),
                StatDefinition::scoring("12", "PTS"),
                StatDefinition::scoring("15", "REB"),
                StatDefinition::scoring("16", "AST"),
                StatDefinition::scoring("17", "STL"),
                StatDefinition::scoring("18", "BLK"),
                StatDefinition::negative("19", "TO"),
                StatDefinition::display_only("3", "FGM"),
                StatDefinition::display_only("4", "FGA"),
                StatDefinition::display_only("6", "FTM"),
                StatDefinition::display_only("7", "FTA"),
            ],
            ratios: vec![
                RatioComponents::new("5", "3", "4"),
                RatioComponents::new("8", "6", "7"),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Raw league settings
// ---------------------------------------------------------------------------

/// One entry of the league's stat category settings as delivered by the
/// ingestion layer. Flags arrive as the provider's string codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatCategory {
    pub stat_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// `"1"` marks a stat shown but not scored.
    #[serde(default)]
    pub is_only_display_stat: String,
    /// `"0"` marks a lower-is-better stat.
    #[serde(default)]
    pub sort_order: String,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Resolved stat catalog for one analysis run.
#[derive(Debug, Clone)]
pub struct StatCatalog {
    definitions: Vec<StatDefinition>,
    index: HashMap<String, usize>,
    ratios: Vec<RatioComponents>,
    fallback_names: HashMap<String, String>,
}

impl StatCatalog {
    /// Build a catalog from explicit definitions. Ratio components and
    /// fallback display names come from `defaults`. Duplicate stat ids keep
    /// their first definition.
    pub fn new(definitions: Vec<StatDefinition>, defaults: &CatalogDefaults) -> Self {
        let mut kept: Vec<StatDefinition> = Vec::with_capacity(definitions.len());
        let mut index = HashMap::new();
        for def in definitions {
            if index.contains_key(&def.stat_id) {
                debug!("ignoring duplicate definition for stat {}", def.stat_id);
                continue;
            }
            index.insert(def.stat_id.clone(), kept.len());
            kept.push(def);
        }

        let fallback_names = defaults
            .stats
            .iter()
            .map(|d| (d.stat_id.clone(), d.display_name.clone()))
            .collect();

        StatCatalog {
            definitions: kept,
            index,
            ratios: defaults.ratios.clone(),
            fallback_names,
        }
    }

    /// The fallback catalog on its own.
    pub fn from_defaults(defaults: &CatalogDefaults) -> Self {
        Self::new(defaults.stats.clone(), defaults)
    }

    /// Build a catalog from league settings.
    ///
    /// If no setting counts toward scoring, the default scoring set is
    /// merged in: default names replace the settings' names for those ids
    /// and default negatives are added.
    pub fn from_settings(raw: &[RawStatCategory], defaults: &CatalogDefaults) -> Self {
        let mut definitions: Vec<StatDefinition> = Vec::with_capacity(raw.len());
        for cat in raw {
            let stat_id = cat.stat_id.trim();
            if stat_id.is_empty() {
                continue;
            }
            let display_name = cat
                .display_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Stat {stat_id}"));
            definitions.push(StatDefinition {
                stat_id: stat_id.to_string(),
                display_name,
                counts_for_scoring: cat.is_only_display_stat.trim() != "1",
                is_negative: cat.sort_order.trim() == "0",
            });
        }

        if !definitions.iter().any(|d| d.counts_for_scoring) {
            debug!("league settings name no scoring stats, using default categories");
            for default in &defaults.stats {
                match definitions.iter_mut().find(|d| d.stat_id == default.stat_id) {
                    Some(existing) => {
                        existing.display_name = default.display_name.clone();
                        existing.counts_for_scoring = default.counts_for_scoring;
                        existing.is_negative |= default.is_negative;
                    }
                    None => definitions.push(default.clone()),
                }
            }
        }

        Self::new(definitions, defaults)
    }

    pub fn definitions(&self) -> &[StatDefinition] {
        &self.definitions
    }

    pub fn get(&self, stat_id: &str) -> Option<&StatDefinition> {
        self.index.get(stat_id).map(|&i| &self.definitions[i])
    }

    /// Scoring stat ids in catalog order.
    pub fn scoring_stat_ids(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter(|d| d.counts_for_scoring)
            .map(|d| d.stat_id.as_str())
            .collect()
    }

    pub fn is_negative(&self, stat_id: &str) -> bool {
        self.get(stat_id).is_some_and(|d| d.is_negative)
    }

    /// Display name for a stat id: the catalog's own name, else the fallback
    /// table's, else `"Stat <id>"`.
    pub fn display_name(&self, stat_id: &str) -> String {
        if let Some(def) = self.get(stat_id) {
            return def.display_name.clone();
        }
        self.fallback_names
            .get(stat_id)
            .cloned()
            .unwrap_or_else(|| format!("Stat {stat_id}"))
    }

    pub fn ratios(&self) -> &[RatioComponents] {
        &self.ratios
    }

    /// Component definition for a ratio stat id.
    pub fn ratio(&self, stat_id: &str) -> Option<&RatioComponents> {
        self.ratios.iter().find(|r| r.ratio == stat_id)
    }

    pub fn is_ratio(&self, stat_id: &str) -> bool {
        self.ratio(stat_id).is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
