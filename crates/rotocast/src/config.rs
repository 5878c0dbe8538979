// Configuration loading and parsing (rotocast.toml).

use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use rotocast_core::catalog::{CatalogDefaults, RatioComponents, StatDefinition};
use rotocast_core::roto::DEFAULT_GAIN_EPSILON;
use rotocast_core::trade::DEFAULT_REMAINING_GAMES;

/// Name of the config file inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "rotocast.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub analysis: AnalysisConfig,
    /// Stat fallback table: the built-in defaults, or `[catalog]` overrides.
    pub catalog: CatalogDefaults,
    pub output: OutputConfig,
    /// Directory the config was loaded from; relative paths resolve here.
    pub base_dir: PathBuf,
}

impl Config {
    /// Path of the league snapshot document.
    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.league.snapshot)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.resolve(&self.output.export_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// rotocast.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire rotocast.toml file.
#[derive(Debug, Clone, Deserialize)]
struct RotocastFile {
    league: LeagueConfig,
    #[serde(default)]
    analysis: AnalysisConfig,
    #[serde(default)]
    catalog: CatalogSection,
    #[serde(default)]
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// League snapshot JSON document.
    pub snapshot: PathBuf,
    /// Team key to analyze (optional). Without one only standings are shown.
    #[serde(default)]
    pub my_team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub remaining_games: u32,
    pub top_trades: usize,
    pub gain_epsilon: f64,
    pub parallel_search: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            remaining_games: DEFAULT_REMAINING_GAMES,
            top_trades: 5,
            gain_epsilon: DEFAULT_GAIN_EPSILON,
            parallel_search: true,
        }
    }
}

/// Optional `[catalog]` overrides. An empty list keeps the built-in table
/// for that part.
#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogSection {
    #[serde(default)]
    stats: Vec<StatDefinition>,
    #[serde(default)]
    ratios: Vec<RatioComponents>,
}

impl CatalogSection {
    fn into_defaults(self) -> CatalogDefaults {
        let mut defaults = CatalogDefaults::default();
        if !self.stats.is_empty() {
            defaults.stats = self.stats;
        }
        if !self.ratios.is_empty() {
            defaults.ratios = self.ratios;
        }
        defaults
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            export_dir: default_export_dir(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/rotocast.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: RotocastFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        league: file.league,
        analysis: file.analysis,
        catalog: file.catalog.into_defaults(),
        output: file.output,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/rotocast.toml` from `defaults/rotocast.toml` on first run.
/// Returns the path written, or `None` when a config file already exists.
/// An existing file is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let template = base_dir.join("defaults").join(CONFIG_FILE);
    let content = std::fs::read(&template).map_err(|_| ConfigError::DefaultsCopyError {
        message: format!(
            "no config/{CONFIG_FILE} or defaults/{CONFIG_FILE} in {}; pass --config-dir",
            base_dir.display()
        ),
    })?;

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }

    // create_new so a file written concurrently is left alone.
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };
    dest.write_all(&content)
        .map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to write {}: {e}", target.display()),
        })?;

    info!("Created {} from defaults", target.display());
    Ok(Some(target))
}

/// Seed the config file from defaults if needed, then load it.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check value ranges. Called on load and again after command-line
/// overrides are applied.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.snapshot.as_os_str().is_empty() {
        return Err(invalid("league.snapshot", "must not be empty".into()));
    }
    if config
        .league
        .my_team
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        return Err(invalid("league.my_team", "must not be blank when set".into()));
    }

    let analysis = &config.analysis;
    if analysis.remaining_games == 0 {
        return Err(invalid("analysis.remaining_games", "must be > 0".into()));
    }
    if analysis.top_trades == 0 {
        return Err(invalid("analysis.top_trades", "must be > 0".into()));
    }
    let eps = analysis.gain_epsilon;
    if !(eps > 0.0 && eps < 1.0) {
        return Err(invalid(
            "analysis.gain_epsilon",
            format!("must be between 0.0 and 1.0 exclusive, got {eps}"),
        ));
    }

    for (i, stat) in config.catalog.stats.iter().enumerate() {
        if stat.stat_id.trim().is_empty() {
            return Err(invalid(
                &format!("catalog.stats[{i}].stat_id"),
                "must not be empty".into(),
            ));
        }
    }

    for (i, ratio) in config.catalog.ratios.iter().enumerate() {
        let ids = [&ratio.ratio, &ratio.made, &ratio.attempted];
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(invalid(
                &format!("catalog.ratios[{i}]"),
                "ratio, made and attempted ids must not be empty".into(),
            ));
        }
        if ratio.made == ratio.attempted || ratio.ratio == ratio.made || ratio.ratio == ratio.attempted
        {
            return Err(invalid(
                &format!("catalog.ratios[{i}]"),
                format!(
                    "ratio {} must use distinct ids, got made {} attempted {}",
                    ratio.ratio, ratio.made, ratio.attempted
                ),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the path to the rotocast crate root
    /// (works whether `cargo test` runs from the crate root or repo root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/rotocast/defaults").exists() {
            cwd.join("crates/rotocast")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Write `body` as config/rotocast.toml under a fresh temp dir.
    fn temp_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), body).unwrap();
        tmp
    }

    const MINIMAL: &str = r#"
[league]
name = "Test League"
snapshot = "data/league.json"
"#;

    #[test]
    fn load_valid_config_from_project_files() {
        let tmp = std::env::temp_dir().join("rotocast_config_project");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        let root = project_root();
        fs::copy(
            root.join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();

        let config = load_config(&tmp).expect("default config should load");
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.catalog, CatalogDefaults::default());
        assert_eq!(config.snapshot_path(), tmp.join("data/league.json"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = temp_config("rotocast_config_minimal", MINIMAL);
        let config = load_config_from(&tmp).unwrap();

        assert_eq!(config.league.name, "Test League");
        assert_eq!(config.league.my_team, None);
        assert_eq!(config.analysis.remaining_games, 30);
        assert_eq!(config.analysis.top_trades, 5);
        assert_eq!(config.analysis.gain_epsilon, 0.001);
        assert!(config.analysis.parallel_search);
        assert_eq!(config.export_dir(), tmp.join("exports"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let body = r#"
[league]
name = "Abs"
snapshot = "/srv/league.json"

[output]
export_dir = "/tmp/rotocast-out"
"#;
        let tmp = temp_config("rotocast_config_absolute", body);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.snapshot_path(), PathBuf::from("/srv/league.json"));
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/rotocast-out"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn catalog_section_overrides_fallback_table() {
        let body = format!(
            "{MINIMAL}\n{}",
            r#"
[[catalog.stats]]
stat_id = "R"
display_name = "Runs"
counts_for_scoring = true

[[catalog.stats]]
stat_id = "AVG"
display_name = "AVG"
counts_for_scoring = true

[[catalog.ratios]]
ratio = "AVG"
made = "H"
attempted = "AB"
"#
        );
        let tmp = temp_config("rotocast_config_catalog", &body);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.catalog.stats.len(), 2);
        assert!(!config.catalog.stats[0].is_negative);
        assert_eq!(config.catalog.ratios, vec![RatioComponents::new("AVG", "H", "AB")]);
        let _ = fs::remove_dir_all(&tmp);
    }

    fn expect_validation_error(name: &str, body: &str, expected_field: &str) {
        let tmp = temp_config(name, body);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert!(
                    field.starts_with(expected_field),
                    "expected {expected_field}, got {field}"
                );
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_remaining_games() {
        let body = format!("{MINIMAL}\n[analysis]\nremaining_games = 0\n");
        expect_validation_error("rotocast_config_zero_games", &body, "analysis.remaining_games");
    }

    #[test]
    fn rejects_zero_top_trades() {
        let body = format!("{MINIMAL}\n[analysis]\ntop_trades = 0\n");
        expect_validation_error("rotocast_config_zero_trades", &body, "analysis.top_trades");
    }

    #[test]
    fn rejects_gain_epsilon_out_of_range() {
        for (i, eps) in ["0.0", "1.0", "-0.5"].iter().enumerate() {
            let body = format!("{MINIMAL}\n[analysis]\ngain_epsilon = {eps}\n");
            expect_validation_error(
                &format!("rotocast_config_eps_{i}"),
                &body,
                "analysis.gain_epsilon",
            );
        }
    }

    #[test]
    fn rejects_ratio_with_shared_component() {
        let body = format!(
            "{MINIMAL}\n[[catalog.ratios]]\nratio = \"5\"\nmade = \"3\"\nattempted = \"3\"\n"
        );
        expect_validation_error("rotocast_config_bad_ratio", &body, "catalog.ratios[0]");
    }

    #[test]
    fn rejects_ratio_with_empty_component() {
        let body = format!(
            "{MINIMAL}\n[[catalog.ratios]]\nratio = \"5\"\nmade = \"\"\nattempted = \"4\"\n"
        );
        expect_validation_error("rotocast_config_empty_ratio", &body, "catalog.ratios[0]");
    }

    #[test]
    fn rejects_blank_my_team() {
        let body = r#"
[league]
name = "Blank"
snapshot = "league.json"
my_team = "  "
"#;
        expect_validation_error("rotocast_config_blank_team", body, "league.my_team");
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("rotocast_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_config("rotocast_config_invalid", "this is not valid [[[ toml");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_seeds_from_defaults() {
        let tmp = std::env::temp_dir().join("rotocast_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join(CONFIG_FILE), MINIMAL).unwrap();
        fs::write(defaults_dir.join("notes.txt"), "ignored\n").unwrap();

        let written = ensure_config_file(&tmp).expect("should succeed");
        assert_eq!(written, Some(tmp.join("config").join(CONFIG_FILE)));
        assert_eq!(
            fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap(),
            MINIMAL
        );
        assert!(!tmp.join("config/notes.txt").exists());

        // Second call finds the file in place.
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_keeps_existing() {
        let tmp = std::env::temp_dir().join("rotocast_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), MINIMAL).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), "# custom\n").unwrap();

        assert_eq!(ensure_config_file(&tmp).expect("should succeed"), None);
        let content = fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_errors_without_config_or_defaults() {
        let tmp = std::env::temp_dir().join("rotocast_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_file(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("--config-dir"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        assert!(!tmp.join("config").exists());

        let _ = fs::remove_dir_all(&tmp);
    }
}
