//! Impute config checks that run alongside deserialization.
//!
//! The raw document is read once as a `toml::Value` and every dotted path is
//! compared with what `ImputeConfig` understands, including the per-family
//! grid parameters. Unknown paths become warnings carrying the nearest known
//! path; loading still succeeds. Search settings the run cannot use are
//! reported as errors by `validate_search_ranges`.

use crate::ml_engine::ModelFamily;
use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const STATIC_KEYS: &[&str] = &[
    // [dataset]
    "dataset",
    "dataset.target_channel",
    "dataset.dropped_channels",
    "dataset.startup_boundary",
    "dataset.cutover",
    "dataset.missing_values",
    // [search]
    "search",
    "search.n_iter",
    "search.folds",
    "search.fold_strategy",
    "search.scoring",
    // [output]
    "output",
    "output.dir",
    "output.write_csv",
    "output.write_json",
    // [families]
    "families",
];

const FAMILY_KEYS: &[&str] = &["enabled", "seed", "grid"];

/// Returns the complete set of valid dotted key paths for `ImputeConfig`.
///
/// Family sections and their grid keys are generated from the registered
/// families, so `families.ada_boost.grid.loss` is known while
/// `families.random_forest.grid.loss` is not.
pub fn known_config_keys() -> HashSet<String> {
    let mut keys: HashSet<String> = STATIC_KEYS.iter().map(|k| (*k).to_string()).collect();
    for family in ModelFamily::ALL {
        let section = format!("families.{}", family.name());
        for k in FAMILY_KEYS {
            keys.insert(format!("{section}.{k}"));
        }
        for p in family.param_names() {
            keys.insert(format!("{section}.grid.{p}"));
        }
        keys.insert(section);
    }
    keys
}

// ============================================================================
// Key Paths and Suggestions
// ============================================================================

/// Dotted paths of every table and key in an impute config document, in
/// document order. `[families.ada_boost.grid]` with `loss = [...]` gives
/// `families`, `families.ada_boost`, `families.ada_boost.grid` and
/// `families.ada_boost.grid.loss`. Grid candidate arrays are leaves.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(value, prefix, &mut paths);
    paths
}

fn collect_paths(value: &toml::Value, prefix: &str, out: &mut Vec<String>) {
    let Some(table) = value.as_table() else {
        return;
    };
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        collect_paths(child, &path, out);
        out.push(path);
    }
}

/// Edit distance over chars, single rolling row.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// Nearest config path to a mistyped one, within three edits. Equal
/// distances resolve to the lexically smaller path.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every path in `raw_toml` that `ImputeConfig` does not read:
/// misspelled sections, unregistered families, and grid parameters the
/// family does not take. Malformed TOML yields no warnings; the serde pass
/// reports it.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    let mut unknown: Vec<String> = walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .collect();
    unknown.sort();

    unknown
        .into_iter()
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Search Range Validation
// ============================================================================

/// Fold counts above this leave very few rows per held-out fold.
const MAX_SENSIBLE_FOLDS: usize = 20;

/// Validate search settings on a parsed `ImputeConfig`.
///
/// Returns (errors, warnings): errors are settings the search cannot run
/// with; warnings are legal but probably unintended.
pub fn validate_search_ranges(
    config: &super::ImputeConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let s = &config.search;

    if s.n_iter == 0 {
        errors.push("search.n_iter must be at least 1".to_string());
    }
    if s.folds < 2 {
        errors.push(format!("search.folds = {} must be at least 2", s.folds));
    } else if s.folds > MAX_SENSIBLE_FOLDS {
        warnings.push(ValidationWarning {
            field: "search.folds".to_string(),
            message: format!(
                "search.folds = {} is unusually high (more than {MAX_SENSIBLE_FOLDS})",
                s.folds
            ),
            suggestion: None,
        });
    }

    for d in config.descriptors() {
        let combos = d.grid.combinations();
        if combos > 0 && s.n_iter > combos {
            warnings.push(ValidationWarning {
                field: format!("families.{}.grid", d.family.name()),
                message: format!(
                    "search.n_iter = {} exceeds the {} combinations in the {} grid; every combination will be tried",
                    s.n_iter,
                    combos,
                    d.family.name()
                ),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
