//! # Engine Primitives
//!
//! Hardcoded constants shared by the guard, lock and rollup components.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Lower bound of every progress value.
pub const MIN_PROGRESS: f64 = 0.0;

/// Upper bound of every progress value.
pub const MAX_PROGRESS: f64 = 100.0;

/// Minimum change in aggregate progress that triggers a write.
///
/// Smaller deltas are treated as "unchanged" so a rollup over an unchanged
/// tree performs no writes and appends no snapshots.
pub const PROGRESS_EPSILON: f64 = 0.01;

/// Weight assigned to an Objective/Key Result link when none is given.
pub const DEFAULT_LINK_WEIGHT: f64 = 1.0;

/// RBAC action that lets an actor mutate a locked Objective or Key Result.
pub const EDIT_LOCKED_ACTION: &str = "okr:edit_locked";

/// Snapshot label for status changes caused by a rollup cascade.
pub const TRIGGER_ROLLUP: &str = "rollup";

/// Snapshot label for status changes caused by a Key Result check-in.
pub const TRIGGER_CHECK_IN: &str = "check_in";

/// Snapshot label for status changes caused by an explicit lifecycle transition.
pub const TRIGGER_TRANSITION: &str = "transition";
