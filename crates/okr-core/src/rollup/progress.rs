//! Progress arithmetic: metric formulas, weighted aggregation, clamping.

use crate::MetricType;
use crate::primitives::{MAX_PROGRESS, MIN_PROGRESS, PROGRESS_EPSILON};

/// Clamp to `[0, 100]`. Non-finite input clamps to 0.
#[must_use]
pub fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_PROGRESS;
    }
    value.clamp(MIN_PROGRESS, MAX_PROGRESS)
}

/// Whether `new` differs from `old` enough to be written.
#[must_use]
pub fn progress_changed(old: f64, new: f64) -> bool {
    (new - old).abs() > PROGRESS_EPSILON
}

/// Progress of a Key Result given its metric and values.
///
/// Numeric metrics interpolate linearly from start to target, which also
/// covers decreasing targets. A zero-width range is all-or-nothing.
#[must_use]
pub fn metric_progress(metric: MetricType, start: f64, target: f64, current: f64) -> f64 {
    match metric {
        MetricType::Boolean => {
            if current >= 1.0 {
                MAX_PROGRESS
            } else {
                MIN_PROGRESS
            }
        }
        MetricType::Percentage | MetricType::Number | MetricType::Currency => {
            let span = target - start;
            if span == 0.0 {
                return if current == target {
                    MAX_PROGRESS
                } else {
                    MIN_PROGRESS
                };
            }
            clamp_progress((current - start) / span * MAX_PROGRESS)
        }
    }
}

/// Unweighted mean of the finite values, clamped. `None` when there are none.
#[must_use]
pub fn mean_progress<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|p| p.is_finite())
        .fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));
    if count == 0 {
        return None;
    }
    Some(clamp_progress(sum / count as f64))
}

/// `Σ(w·p) / Σw` over `(weight, progress)` pairs with finite values.
///
/// Falls back to the unweighted mean when the total weight is not positive.
/// `None` when no pair has a finite progress.
#[must_use]
pub fn weighted_progress<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let usable: Vec<(f64, f64)> = pairs
        .into_iter()
        .filter(|(w, p)| w.is_finite() && p.is_finite())
        .collect();
    if usable.is_empty() {
        return None;
    }

    let total_weight: f64 = usable.iter().map(|(w, _)| w).sum();
    if total_weight <= 0.0 {
        return mean_progress(usable.iter().map(|(_, p)| *p));
    }

    let weighted: f64 = usable.iter().map(|(w, p)| w * p).sum();
    Some(clamp_progress(weighted / total_weight))
}
