//! # Progress & Status Rollup
//!
//! Pure aggregation functions plus the [`RollupEngine`] that applies them up
//! the Objective tree through an [`OkrStore`](crate::store::OkrStore).
//!
//! Progress for an Objective:
//! 1. linked Key Results: `Σ(w·p) / Σw`, unweighted mean when `Σw <= 0`
//! 2. otherwise child Objectives: mean of their progress
//! 3. otherwise unchanged
//!
//! Results are clamped to `[0, 100]` and written only when they move by more
//! than [`PROGRESS_EPSILON`](crate::primitives::PROGRESS_EPSILON).

mod engine;
mod progress;
mod status;

pub use engine::{RollupEngine, RollupReport};
pub use progress::{
    clamp_progress, mean_progress, metric_progress, progress_changed, weighted_progress,
};
pub use status::aggregate_status;
