//! Imputation Pipeline Module
//!
//! ## Stage Sequence
//!
//! ```text
//! STAGE 1: Ingest          CSV → Dataset
//! STAGE 2: Startup         drop rows before the first operational day
//! STAGE 3: Channel drop    remove channels that failed with the target
//! STAGE 4: Partition       ground truth (< cutover) / to-impute (>= cutover)
//! STAGE 5: Search          one randomized k-fold search per family (parallel)
//! STAGE 6: Evaluate        in-sample R², MAE, MSE per family
//! STAGE 7: Impute          reconstruct the target over the to-impute segment
//! STAGE 8: Aggregate       per-family results → ComparisonTable
//! ```
//!
//! Every failure carries the stage it happened in. There is no fallback:
//! a failing family aborts the whole run.

mod coordinator;
mod outcome;

pub use coordinator::{ImputationPipeline, PipelineError};
pub use outcome::{FamilyOutcome, PipelineReport, PipelineStats};
