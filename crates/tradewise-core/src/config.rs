// Configuration loading and parsing (config/engine.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Position;

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
    pub engine: EngineConfig,
    pub db_path: String,
}

/// Tunables for the valuation, need, and trade engines. Stable within one
/// `version`: changing any knob should come with a version bump so stored
/// valuations stay reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub version: String,
    pub valuation: ValuationConfig,
    pub need: NeedConfig,
    pub trade: TradeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: DEFAULT_ENGINE_VERSION.to_string(),
            valuation: ValuationConfig::default(),
            need: NeedConfig::default(),
            trade: TradeConfig::default(),
        }
    }
}

pub const DEFAULT_ENGINE_VERSION: &str = "tw-1.0";

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire engine.toml file.
#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    engine: EngineSection,
    #[serde(default)]
    valuation: ValuationConfig,
    #[serde(default)]
    need: NeedConfig,
    #[serde(default)]
    trade: TradeConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineSection {
    version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Component weights and recency schedule for player pricing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub anchor_weight: f64,
    pub performance_weight: f64,
    pub vorp_weight: f64,
    pub global_weight: f64,
    /// Geometric decay applied per week of age; 1.0 weighs all weeks equally.
    pub recency_decay: f64,
    /// How many of the most recent weeks count as "recent" form.
    pub recent_window: usize,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            anchor_weight: 1.0,
            performance_weight: 1.0,
            vorp_weight: 0.5,
            global_weight: 1.0,
            recency_decay: 0.75,
            recent_window: 4,
        }
    }
}

/// Per-position multipliers for the need score. Positions not listed weigh 1.0.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct NeedConfig {
    pub position_weights: BTreeMap<Position, f64>,
}

impl NeedConfig {
    pub fn weight(&self, pos: Position) -> f64 {
        self.position_weights.get(&pos).copied().unwrap_or(1.0)
    }
}

/// Fairness transform and proposal search bounds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Smallest logistic scale, in dollars.
    pub fairness_scale_floor: f64,
    /// Logistic scale as a fraction of the dollars changing hands.
    pub fairness_scale_fraction: f64,
    /// Maximum value loss in balanced mode, as a fraction of roster value.
    pub value_tolerance: f64,
    pub max_results: usize,
    /// Most players considered per side of a package search.
    pub max_pool_size: usize,
    /// Most candidate packages evaluated per generation request.
    pub max_candidates: usize,
}

impl Default for TradeConfig {
    fn default() -> Self {
        TradeConfig {
            fairness_scale_floor: 10.0,
            fairness_scale_fraction: 0.25,
            value_tolerance: 0.03,
            max_results: 5,
            max_pool_size: 10,
            max_candidates: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/engine.toml` relative to
/// `base_dir`. Does not copy defaults; see `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let engine_path = base_dir.join("config").join("engine.toml");
    let text = read_file(&engine_path)?;
    let file: EngineFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: engine_path.clone(),
        source: e,
    })?;

    let config = Config {
        engine: EngineConfig {
            version: file.engine.version,
            valuation: file.valuation,
            need: file.need,
            trade: file.trade,
        },
        db_path: file.database.path,
    };

    validate(&config.engine)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
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
        field: field.to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.version.trim().is_empty() {
        return Err(invalid("engine.version", "must not be empty".into()));
    }

    let v = &engine.valuation;
    let weight_fields: &[(&str, f64)] = &[
        ("valuation.anchor_weight", v.anchor_weight),
        ("valuation.performance_weight", v.performance_weight),
        ("valuation.vorp_weight", v.vorp_weight),
        ("valuation.global_weight", v.global_weight),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    if !(v.recency_decay > 0.0 && v.recency_decay <= 1.0) {
        return Err(invalid(
            "valuation.recency_decay",
            format!("must be in (0.0, 1.0], got {}", v.recency_decay),
        ));
    }
    if v.recent_window == 0 {
        return Err(invalid("valuation.recent_window", "must be > 0".into()));
    }

    for (pos, w) in &engine.need.position_weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(invalid(
                &format!("need.position_weights.{pos}"),
                format!("must be >= 0, got {w}"),
            ));
        }
    }

    let t = &engine.trade;
    if !(t.fairness_scale_floor > 0.0 && t.fairness_scale_floor.is_finite()) {
        return Err(invalid(
            "trade.fairness_scale_floor",
            format!("must be > 0, got {}", t.fairness_scale_floor),
        ));
    }
    if !(t.fairness_scale_fraction >= 0.0 && t.fairness_scale_fraction.is_finite()) {
        return Err(invalid(
            "trade.fairness_scale_fraction",
            format!("must be >= 0, got {}", t.fairness_scale_fraction),
        ));
    }
    if !(0.0..=1.0).contains(&t.value_tolerance) {
        return Err(invalid(
            "trade.value_tolerance",
            format!("must be between 0.0 and 1.0 inclusive, got {}", t.value_tolerance),
        ));
    }
    let count_fields: &[(&str, usize)] = &[
        ("trade.max_results", t.max_results),
        ("trade.max_pool_size", t.max_pool_size),
        ("trade.max_candidates", t.max_candidates),
    ];
    for (name, val) in count_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0".into()));
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

    /// Workspace root, where the shipped `defaults/` directory lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Fresh temp dir with `config/engine.toml` holding `contents`.
    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/engine.toml"), contents).unwrap();
        tmp
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults/engine.toml")).unwrap()
    }

    #[test]
    fn shipped_defaults_match_engine_default() {
        let tmp = temp_config("tw_config_defaults", &default_text());
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.db_path, "tradewise.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let text = r#"
[engine]
version = "custom-2"

[database]
path = ":memory:"

[need.position_weights]
QB = 2.0
"D/ST" = 0.5
"#;
        let tmp = temp_config("tw_config_partial", text);
        let config = load_config_from(&tmp).unwrap();

        assert_eq!(config.engine.version, "custom-2");
        assert_eq!(config.engine.valuation, ValuationConfig::default());
        assert_eq!(config.engine.need.weight(Position::Quarterback), 2.0);
        assert_eq!(config.engine.need.weight(Position::Defense), 0.5);
        assert_eq!(config.engine.need.weight(Position::Kicker), 1.0);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_tolerance_above_one() {
        let modified = default_text().replace("value_tolerance = 0.03", "value_tolerance = 1.5");
        let tmp = temp_config("tw_config_tolerance", &modified);

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "trade.value_tolerance");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_recency_decay() {
        let modified = default_text().replace("recency_decay = 0.75", "recency_decay = 0.0");
        let tmp = temp_config("tw_config_decay", &modified);

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "valuation.recency_decay");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_max_results() {
        let modified = default_text().replace("max_results = 5", "max_results = 0");
        let tmp = temp_config("tw_config_results", &modified);

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "trade.max_results");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_negative_position_weight() {
        let text = r#"
[engine]
version = "v"

[database]
path = "x.db"

[need.position_weights]
RB = -1.0
"#;
        let tmp = temp_config("tw_config_neg_weight", text);

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "need.position_weights.RB");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_config("tw_config_invalid", "this is not valid [[[ toml");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("engine.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_engine_toml() {
        let tmp = std::env::temp_dir().join("tw_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("engine.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_and_skips_examples() {
        let tmp = std::env::temp_dir().join("tw_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("engine.toml"), default_text()).unwrap();
        fs::write(defaults_dir.join("engine.toml.example"), "# sample\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/engine.toml").exists());
        assert!(!tmp.join("config/engine.toml.example").exists());

        // Second run leaves the existing file alone.
        fs::write(tmp.join("config/engine.toml"), "# custom\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/engine.toml")).unwrap(),
            "# custom\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("tw_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
