//! K-fold row assignment for cross-validation.
//!
//! `Shuffled` permutes rows with a seeded RNG before cutting folds. On a time
//! series this lets the model see days after the held-out ones, so scores
//! are optimistic; `Contiguous` cuts the rows in time order instead.

use super::search::SearchError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldStrategy {
    #[default]
    Shuffled,
    Contiguous,
}

/// Row indices for one train/held-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct KFold {
    k: usize,
    strategy: FoldStrategy,
    seed: u64,
}

impl KFold {
    pub fn new(k: usize, strategy: FoldStrategy, seed: u64) -> Self {
        Self { k, strategy, seed }
    }

    /// Cut `n` rows into `k` folds. The first `n % k` folds hold one extra
    /// row. Every row is held out exactly once.
    pub fn split(&self, n: usize) -> Result<Vec<Fold>, SearchError> {
        if self.k < 2 {
            return Err(SearchError::InvalidFoldCount(self.k));
        }
        if n < self.k {
            return Err(SearchError::InsufficientData { rows: n, folds: self.k });
        }

        let mut order: Vec<usize> = (0..n).collect();
        if self.strategy == FoldStrategy::Shuffled {
            order.shuffle(&mut StdRng::seed_from_u64(self.seed));
        }

        let base = n / self.k;
        let extra = n % self.k;
        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for i in 0..self.k {
            let size = base + usize::from(i < extra);
            let end = start + size;
            let test = order[start..end].to_vec();
            let train = order[..start].iter().chain(&order[end..]).copied().collect();
            folds.push(Fold { train, test });
            start = end;
        }
        Ok(folds)
    }
}
