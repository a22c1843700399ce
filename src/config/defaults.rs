//! System-wide default constants.
//!
//! The Volve production figures (channel names, dates, search grids) in one
//! place. Grouped by subsystem for easy discovery.

// ============================================================================
// Config loading
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "VOLVE_IMPUTE_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "impute_config.toml";

// ============================================================================
// Dataset
// ============================================================================

/// Channel reconstructed over the failure window.
pub const DEFAULT_TARGET_CHANNEL: &str = "AVG_DOWNHOLE_TEMPERATURE";

/// Channels that failed together with the target and must not be used as
/// features.
pub const DEFAULT_DROPPED_CHANNELS: [&str; 1] = ["AVG_DOWNHOLE_PRESSURE"];

/// First operational day of the well; earlier rows are startup noise.
pub const STARTUP_BOUNDARY: &str = "2007-05-17";

/// First day of the temperature sensor failure.
pub const CUTOVER: &str = "2010-01-14";

// ============================================================================
// Search
// ============================================================================

/// Parameter combinations sampled per family.
pub const SEARCH_N_ITER: usize = 1;

/// Cross-validation folds.
pub const CV_FOLDS: usize = 10;

/// Per-family search seeds.
pub const RANDOM_FOREST_SEED: u64 = 22;
pub const EXTRA_TREES_SEED: u64 = 32;
pub const GRADIENT_BOOSTING_SEED: u64 = 42;
pub const ADA_BOOST_SEED: u64 = 52;

// ============================================================================
// Search grids
// ============================================================================

pub const RF_N_ESTIMATORS: [i64; 4] = [5, 20, 50, 100];
pub const ET_N_ESTIMATORS: [i64; 3] = [150, 160, 170];
pub const GBR_N_ESTIMATORS: [i64; 3] = [100, 125, 150];
pub const ADA_N_ESTIMATORS: [i64; 3] = [100, 125, 150];

/// Ten depths evenly spaced over 5..=100.
pub const FOREST_MAX_DEPTHS: [i64; 10] = [5, 15, 26, 36, 47, 57, 68, 78, 89, 100];

/// Ten depths evenly spaced over 8..=32.
pub const GBR_MAX_DEPTHS: [i64; 10] = [8, 10, 13, 16, 18, 21, 24, 26, 29, 32];

pub const MIN_SAMPLES_SPLIT: [i64; 5] = [2, 3, 4, 5, 6];
pub const MIN_SAMPLES_LEAF: [i64; 4] = [1, 2, 3, 4];

pub const ADA_LEARNING_RATES: [f64; 4] = [0.1, 0.3, 0.7, 1.0];

// ============================================================================
// Output
// ============================================================================

/// Directory for the comparison and reconstruction CSVs.
pub const OUTPUT_DIR: &str = "output";

pub const COMPARISON_FILE: &str = "comparison.csv";
pub const RECONSTRUCTION_FILE: &str = "reconstruction.csv";
pub const REPORT_JSON_FILE: &str = "report.json";
