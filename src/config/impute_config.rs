//! Imputation run configuration loaded from TOML.
//!
//! Every section is optional; missing fields fall back to the Volve
//! production values in `defaults`.

use super::defaults;
use crate::ml_engine::{FamilyDescriptor, FoldStrategy, ModelFamily, ParameterGrid, Scoring, SearchSettings};
use crate::partition::MissingValuePolicy;
use crate::types::record::serde_timestamp;
use crate::types::parse_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImputeConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub families: FamiliesConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl ImputeConfig {
    /// Load configuration with the standard lookup order:
    ///
    /// 1. `VOLVE_IMPUTE_CONFIG` environment variable
    /// 2. `./impute_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", defaults::CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let d = &self.dataset;

        if d.target_channel.trim().is_empty() {
            errors.push("dataset.target_channel must not be empty".to_string());
        }
        if d.dropped_channels.iter().any(|c| *c == d.target_channel) {
            errors.push(format!(
                "dataset.dropped_channels must not contain the target channel '{}'",
                d.target_channel
            ));
        }
        if let Some(start) = d.startup_boundary {
            if start >= d.cutover {
                errors.push(format!(
                    "dataset.startup_boundary ({start}) must be before dataset.cutover ({})",
                    d.cutover
                ));
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_search_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        let enabled = self.enabled_families();
        if enabled.is_empty() {
            errors.push("at least one model family must be enabled".to_string());
        }
        for desc in self.descriptors() {
            if let Err(e) = desc.validate() {
                errors.push(format!("families.{}.grid: {e}", desc.family.name()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn family(&self, family: ModelFamily) -> &FamilyConfig {
        match family {
            ModelFamily::RandomForest => &self.families.random_forest,
            ModelFamily::ExtraTrees => &self.families.extra_trees,
            ModelFamily::GradientBoosting => &self.families.gradient_boosting,
            ModelFamily::AdaBoost => &self.families.ada_boost,
        }
    }

    pub fn family_mut(&mut self, family: ModelFamily) -> &mut FamilyConfig {
        match family {
            ModelFamily::RandomForest => &mut self.families.random_forest,
            ModelFamily::ExtraTrees => &mut self.families.extra_trees,
            ModelFamily::GradientBoosting => &mut self.families.gradient_boosting,
            ModelFamily::AdaBoost => &mut self.families.ada_boost,
        }
    }

    /// Enabled families in registration order.
    pub fn enabled_families(&self) -> Vec<ModelFamily> {
        ModelFamily::ALL
            .into_iter()
            .filter(|f| self.family(*f).enabled)
            .collect()
    }

    /// Keep only the listed families enabled.
    pub fn restrict_to(&mut self, families: &[ModelFamily]) {
        for f in ModelFamily::ALL {
            self.family_mut(f).enabled = families.contains(&f);
        }
    }

    /// One search descriptor per enabled family, with configured grid and
    /// seed overrides applied.
    pub fn descriptors(&self) -> Vec<FamilyDescriptor> {
        self.enabled_families()
            .into_iter()
            .map(|f| {
                let fc = self.family(f);
                FamilyDescriptor::new(
                    f,
                    fc.grid.clone().unwrap_or_else(|| f.default_grid()),
                    self.search.scoring,
                    fc.seed.unwrap_or_else(|| f.default_seed()),
                )
            })
            .collect()
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            n_iter: self.search.n_iter,
            folds: self.search.folds,
            fold_strategy: self.search.fold_strategy,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Dataset
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Channel reconstructed over the failure window
    #[serde(default = "default_target_channel")]
    pub target_channel: String,

    /// Channels removed before modelling (failed together with the target)
    #[serde(default = "default_dropped_channels")]
    pub dropped_channels: Vec<String>,

    /// First operational timestamp; an empty string keeps the whole record
    #[serde(
        default = "default_startup_boundary",
        with = "serde_timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub startup_boundary: Option<NaiveDateTime>,

    /// First timestamp of the failure window
    #[serde(default = "default_cutover", with = "serde_timestamp")]
    pub cutover: NaiveDateTime,

    #[serde(default)]
    pub missing_values: MissingValuePolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            target_channel: default_target_channel(),
            dropped_channels: default_dropped_channels(),
            startup_boundary: default_startup_boundary(),
            cutover: default_cutover(),
            missing_values: MissingValuePolicy::default(),
        }
    }
}

fn default_target_channel() -> String {
    defaults::DEFAULT_TARGET_CHANNEL.to_string()
}

fn default_dropped_channels() -> Vec<String> {
    defaults::DEFAULT_DROPPED_CHANNELS.iter().map(|c| (*c).to_string()).collect()
}

fn default_startup_boundary() -> Option<NaiveDateTime> {
    parse_timestamp(defaults::STARTUP_BOUNDARY)
}

fn default_cutover() -> NaiveDateTime {
    parse_timestamp(defaults::CUTOVER).unwrap_or_default()
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Parameter combinations sampled per family
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,

    #[serde(default = "default_folds")]
    pub folds: usize,

    #[serde(default)]
    pub fold_strategy: FoldStrategy,

    #[serde(default)]
    pub scoring: Scoring,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: default_n_iter(),
            folds: default_folds(),
            fold_strategy: FoldStrategy::default(),
            scoring: Scoring::default(),
        }
    }
}

const fn default_n_iter() -> usize {
    defaults::SEARCH_N_ITER
}

const fn default_folds() -> usize {
    defaults::CV_FOLDS
}

// ============================================================================
// Families
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FamiliesConfig {
    #[serde(default)]
    pub random_forest: FamilyConfig,
    #[serde(default)]
    pub extra_trees: FamilyConfig,
    #[serde(default)]
    pub gradient_boosting: FamilyConfig,
    #[serde(default)]
    pub ada_boost: FamilyConfig,
}

/// Per-family overrides. Unset seed and grid use the family's built-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<ParameterGrid>,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
            grid: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Write comparison and reconstruction CSVs
    #[serde(default = "default_true")]
    pub write_csv: bool,

    /// Also write the full run report as JSON
    #[serde(default)]
    pub write_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_csv: true,
            write_json: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}
