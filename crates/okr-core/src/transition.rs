//! # State Transition Validator
//!
//! Table-driven state machines:
//! - one lifecycle table shared by Objectives and Key Results
//! - one operational table for Initiatives
//!
//! A missing edge is an illegal transition. Self edges do not exist.
//!
//! Records created before the explicit lifecycle field existed are read
//! through [`TransitionValidator::derive_legacy_state`]; the tables never see
//! derived states as anything special.

use crate::events::ActivityAction;
use crate::{EntityKind, InitiativeStatus, LifecycleState, OkrError, OkrStatus};

use crate::InitiativeStatus as I;
use crate::LifecycleState as L;

/// Lifecycle edges for Objectives and Key Results.
const LIFECYCLE_TRANSITIONS: [(LifecycleState, &[LifecycleState]); 5] = [
    (L::Draft, &[L::Published, L::Completed, L::Cancelled]),
    (L::Published, &[L::Draft, L::Completed, L::Cancelled]),
    (L::Completed, &[L::Archived]),
    (L::Cancelled, &[L::Archived]),
    (L::Archived, &[]),
];

/// Operational edges for Initiatives.
const INITIATIVE_TRANSITIONS: [(InitiativeStatus, &[InitiativeStatus]); 4] = [
    (I::NotStarted, &[I::InProgress, I::Completed, I::Blocked]),
    (I::InProgress, &[I::Completed, I::Blocked]),
    (I::Blocked, &[I::InProgress, I::Completed]),
    (I::Completed, &[]),
];

/// Lifecycle and initiative state machine checks. Stateless.
pub struct TransitionValidator;

impl TransitionValidator {
    /// Legal lifecycle targets from `from`.
    #[must_use]
    pub fn allowed_transitions(from: LifecycleState) -> &'static [LifecycleState] {
        LIFECYCLE_TRANSITIONS
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// Legal initiative targets from `from`.
    #[must_use]
    pub fn allowed_initiative_transitions(from: InitiativeStatus) -> &'static [InitiativeStatus] {
        INITIATIVE_TRANSITIONS
            .iter()
            .find(|(status, _)| *status == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn is_legal(from: LifecycleState, to: LifecycleState) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    /// Validate a lifecycle transition for an Objective or Key Result.
    pub fn validate_lifecycle(
        kind: EntityKind,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), OkrError> {
        if Self::is_legal(from, to) {
            return Ok(());
        }
        Err(OkrError::BadRequest(format!(
            "illegal {} transition {} -> {} (allowed: {})",
            kind,
            from,
            to,
            Self::describe(Self::allowed_transitions(from))
        )))
    }

    /// Validate an Initiative status transition.
    pub fn validate_initiative(
        from: InitiativeStatus,
        to: InitiativeStatus,
    ) -> Result<(), OkrError> {
        let allowed = Self::allowed_initiative_transitions(from);
        if allowed.contains(&to) {
            return Ok(());
        }
        Err(OkrError::BadRequest(format!(
            "illegal {} transition {} -> {} (allowed: {})",
            EntityKind::Initiative,
            from,
            to,
            Self::describe(allowed)
        )))
    }

    /// Derive a lifecycle state from the legacy `(status, is_published)` pair.
    ///
    /// COMPLETED and CANCELLED statuses win over the publish flag.
    #[must_use]
    pub fn derive_legacy_state(status: OkrStatus, is_published: bool) -> LifecycleState {
        match status {
            OkrStatus::Completed => L::Completed,
            OkrStatus::Cancelled => L::Cancelled,
            _ if is_published => L::Published,
            _ => L::Draft,
        }
    }

    /// The explicit state when present, the legacy derivation otherwise.
    #[must_use]
    pub fn effective_state(
        state: Option<LifecycleState>,
        status: OkrStatus,
        is_published: bool,
    ) -> LifecycleState {
        state.unwrap_or_else(|| Self::derive_legacy_state(status, is_published))
    }

    /// Activity action recorded for a lifecycle transition.
    #[must_use]
    pub fn action_for(from: LifecycleState, to: LifecycleState) -> ActivityAction {
        match (from, to) {
            (_, L::Published) => ActivityAction::Published,
            (L::Published, L::Draft) => ActivityAction::Unpublished,
            (_, L::Completed) => ActivityAction::Completed,
            (_, L::Cancelled) => ActivityAction::Cancelled,
            _ => ActivityAction::StateChange,
        }
    }

    /// Operational status a lifecycle target forces, if any.
    #[must_use]
    pub fn aligned_status(to: LifecycleState) -> Option<OkrStatus> {
        match to {
            L::Completed => Some(OkrStatus::Completed),
            L::Cancelled => Some(OkrStatus::Cancelled),
            _ => None,
        }
    }

    fn describe<T: std::fmt::Display>(targets: &[T]) -> String {
        if targets.is_empty() {
            return "none, terminal".to_string();
        }
        targets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// TESTS
// =============================================================================
