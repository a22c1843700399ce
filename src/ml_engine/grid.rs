//! Hyperparameter grids and sampled parameter sets.
//!
//! A grid maps each hyperparameter name to a finite candidate list. Names
//! are kept sorted so combination `i` always decodes to the same assignment
//! (mixed radix, last name varying fastest).

use super::family::ModelFamily;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Hyperparameter '{0}' has no candidate values")]
    EmptyGrid(String),

    #[error("{family} has no hyperparameter '{name}'")]
    UnknownParameter { family: ModelFamily, name: String },

    #[error("{family}: invalid value {value} for '{name}': {reason}")]
    InvalidParameter {
        family: ModelFamily,
        name: String,
        value: ParamValue,
        reason: String,
    },
}

/// A single candidate value. TOML integers, floats and strings map directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One concrete assignment drawn from a grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Hyperparameter name → candidate values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterGrid(BTreeMap<String, Vec<ParamValue>>);

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form used for the built-in grids.
    pub fn with<V: Into<ParamValue> + Clone>(mut self, name: &str, values: &[V]) -> Self {
        self.0
            .insert(name.to_string(), values.iter().cloned().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<ParamValue>) {
        self.0.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[ParamValue]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<ParamValue>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail if any hyperparameter has no candidates.
    pub fn check_non_empty(&self) -> Result<(), GridError> {
        match self.0.iter().find(|(_, values)| values.is_empty()) {
            Some((name, _)) => Err(GridError::EmptyGrid(name.clone())),
            None => Ok(()),
        }
    }

    /// Number of distinct combinations. A grid with no names has one (all
    /// defaults); saturates instead of overflowing.
    pub fn combinations(&self) -> usize {
        self.0
            .values()
            .fold(1usize, |acc, values| acc.saturating_mul(values.len()))
    }

    /// Decode combination `index` (must be `< combinations()`).
    pub fn combination(&self, mut index: usize) -> ParamSet {
        let mut assignment = BTreeMap::new();
        for (name, values) in self.0.iter().rev() {
            let radix = values.len();
            assignment.insert(name.clone(), values[index % radix].clone());
            index /= radix;
        }
        ParamSet(assignment)
    }

    /// Draw `n_iter` distinct combinations in random order. When `n_iter`
    /// exceeds the grid size every combination is returned once.
    pub fn sample<R: Rng + ?Sized>(&self, n_iter: usize, rng: &mut R) -> Result<Vec<ParamSet>, GridError> {
        self.check_non_empty()?;
        let total = self.combinations();
        let amount = if n_iter > total {
            warn!(requested = n_iter, available = total, "Sample count exceeds grid size, using every combination");
            total
        } else {
            n_iter
        };

        Ok(index::sample(rng, total, amount)
            .into_iter()
            .map(|i| self.combination(i))
            .collect())
    }
}
