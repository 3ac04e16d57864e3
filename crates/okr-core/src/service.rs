//! # Orchestration Service
//!
//! [`OkrService`] wraps a store, an RBAC oracle and a clock, and runs every
//! mutation through the same pipeline:
//!
//! 1. tenant isolation guard
//! 2. governance locks (cycle, then publish)
//! 3. transition validation, when the operation is a transition
//! 4. primary write
//! 5. rollup cascade
//! 6. activity outbox dispatch (best effort)
//!
//! Steps 1-3 abort before anything is written. A failure in 4 or 5 drops the
//! outbox so no notification is emitted for an operation that did not
//! complete.

use crate::clock::{Clock, SystemClock};
use crate::events::{ActivityAction, ActivityEvent, ActivitySink, DispatchSummary, Outbox};
use crate::governance::{Actor, GovernanceChecker, LockReport, LockTarget, Mutation, RbacOracle};
use crate::primitives::{TRIGGER_CHECK_IN, TRIGGER_ROLLUP, TRIGGER_TRANSITION};
use crate::rollup::{RollupEngine, RollupReport};
use crate::store::OkrStore;
use crate::tenant::TenantGuard;
use crate::transition::TransitionValidator;
use crate::{
    CheckIn, Confidence, Cycle, CycleId, EntityKind, Initiative, InitiativeId, InitiativeStatus,
    KeyResult, KeyResultId, LifecycleState, Objective, ObjectiveId, ObjectiveKeyResult, OkrError,
    OkrStatus, StatusSnapshot, TenantId, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// REQUESTS & RESULTS
// =============================================================================

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub rollup: RollupReport,
    pub dispatch: DispatchSummary,
}

/// Field changes for [`OkrService::update_objective`]. `None` leaves a field
/// as it is; the nested options clear a field with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectivePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub parent_id: Option<Option<ObjectiveId>>,
    pub cycle_id: Option<Option<CycleId>>,
}

/// Field changes for [`OkrService::update_key_result`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyResultPatch {
    pub title: Option<String>,
    pub start_value: Option<f64>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
}

/// A Key Result value update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub key_result_id: KeyResultId,
    pub value: f64,
    /// Optimistic concurrency token; compared with the stored version.
    #[serde(default)]
    pub expected_version: Option<u64>,
    /// New operational status reported together with the value.
    #[serde(default)]
    pub status: Option<OkrStatus>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
}

impl CheckInRequest {
    #[must_use]
    pub fn new(key_result_id: impl Into<KeyResultId>, value: f64) -> Self {
        Self {
            key_result_id: key_result_id.into(),
            value,
            expected_version: None,
            status: None,
            note: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OkrStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Governed access to an [`OkrStore`].
pub struct OkrService<S, R, C = SystemClock> {
    store: S,
    rbac: R,
    clock: C,
    sinks: Vec<Box<dyn ActivitySink>>,
}

impl<S: OkrStore, R: RbacOracle, C: Clock> OkrService<S, R, C> {
    #[must_use]
    pub fn new(store: S, rbac: R, clock: C) -> Self {
        Self {
            store,
            rbac,
            clock,
            sinks: Vec::new(),
        }
    }

    /// Register an activity sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl ActivitySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Point lookup. Records of other tenants are reported as missing.
    pub fn get_objective(&self, actor: &Actor, id: &ObjectiveId) -> Result<Objective, OkrError> {
        self.visible_objective(actor, id)
    }

    pub fn get_key_result(&self, actor: &Actor, id: &KeyResultId) -> Result<KeyResult, OkrError> {
        self.visible_key_result(actor, id)
    }

    pub fn get_initiative(&self, actor: &Actor, id: &InitiativeId) -> Result<Initiative, OkrError> {
        self.visible_initiative(actor, id)
    }

    /// Every objective the actor may read, ordered by id.
    pub fn list_objectives(&self, actor: &Actor) -> Result<Vec<Objective>, OkrError> {
        let filter = TenantGuard::build_tenant_filter(&actor.tenant);
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        self.store.objectives(&filter)
    }

    /// Key Results linked to a visible objective, with their weights.
    pub fn linked_key_results(
        &self,
        actor: &Actor,
        objective_id: &ObjectiveId,
    ) -> Result<Vec<(KeyResult, f64)>, OkrError> {
        self.visible_objective(actor, objective_id)?;
        self.store.linked_key_results(objective_id)
    }

    /// Status snapshots of a visible objective, oldest first.
    pub fn status_history(
        &self,
        actor: &Actor,
        objective_id: &ObjectiveId,
    ) -> Result<Vec<StatusSnapshot>, OkrError> {
        self.visible_objective(actor, objective_id)?;
        self.store.snapshots(objective_id.as_str())
    }

    /// Check-ins of a visible key result, oldest first.
    pub fn check_in_history(
        &self,
        actor: &Actor,
        key_result_id: &KeyResultId,
    ) -> Result<Vec<CheckIn>, OkrError> {
        self.visible_key_result(actor, key_result_id)?;
        self.store.check_ins(key_result_id)
    }

    /// Lock decisions an update of this objective would face, without writing.
    pub fn lock_report(&self, actor: &Actor, id: &ObjectiveId) -> Result<LockReport, OkrError> {
        let objective = self.visible_objective(actor, id)?;
        Self::guard_write(actor, objective.tenant_id.as_ref())?;
        let target = self.objective_target(&objective)?;
        GovernanceChecker::new(&self.rbac).check_all_locks(actor, &target, Mutation::Update)
    }

    // -------------------------------------------------------------------------
    // Objectives
    // -------------------------------------------------------------------------

    /// Create an objective in DRAFT. An absent tenant is stamped with the
    /// actor's; a different one is rejected.
    pub fn create_objective(
        &mut self,
        actor: &Actor,
        mut objective: Objective,
    ) -> Result<Outcome<Objective>, OkrError> {
        let tenant_id = Self::stamp_tenant(actor, objective.tenant_id.take())?;
        objective.tenant_id = Some(tenant_id);

        if self.store.objective(&objective.id)?.is_some() {
            return Err(Self::duplicate(EntityKind::Objective, &objective.id));
        }
        if let Some(parent_id) = &objective.parent_id {
            let parent = self.visible_objective(actor, parent_id)?;
            Self::guard_write(actor, parent.tenant_id.as_ref())?;
        }

        objective.state = Some(LifecycleState::Draft);
        objective.is_published = false;
        objective.version = 0;
        objective.progress = 0.0;

        let target = self.objective_target(&objective)?;
        GovernanceChecker::new(&self.rbac).check_all_locks(actor, &target, Mutation::Create)?;

        self.store.insert_objective(objective.clone())?;
        let rollup = match &objective.parent_id {
            Some(parent_id) => self.rollup(parent_id, TRIGGER_ROLLUP)?,
            None => RollupReport::default(),
        };

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Created,
            EntityKind::Objective,
            &objective.id,
            &objective.tenant_id,
            actor,
            None,
            Some(&objective),
        ));
        Ok(self.finish(objective, rollup, outbox))
    }

    /// Edit descriptive fields, re-parent, or move between cycles.
    pub fn update_objective(
        &mut self,
        actor: &Actor,
        id: &ObjectiveId,
        patch: ObjectivePatch,
    ) -> Result<Outcome<Objective>, OkrError> {
        let before = self.visible_objective(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        let checker = GovernanceChecker::new(&self.rbac);
        checker.check_all_locks(actor, &self.objective_target(&before)?, Mutation::Update)?;

        let mut after = before.clone();
        if let Some(title) = patch.title {
            after.title = title;
        }
        if let Some(description) = patch.description {
            after.description = Some(description);
        }
        if let Some(visibility) = patch.visibility {
            after.visibility = visibility;
        }
        if let Some(cycle_id) = patch.cycle_id {
            after.cycle_id = cycle_id;
        }
        if let Some(parent_id) = patch.parent_id {
            if let Some(new_parent) = &parent_id {
                let parent = self.visible_objective(actor, new_parent)?;
                Self::guard_write(actor, parent.tenant_id.as_ref())?;
                self.ensure_not_descendant(id, new_parent)?;
            }
            after.parent_id = parent_id;
        }
        if after.cycle_id != before.cycle_id {
            checker.check_cycle_lock(actor, &self.objective_target(&after)?)?;
        }
        after.version = before.version.saturating_add(1);

        self.store.update_objective(after.clone())?;

        let mut rollup = RollupReport::default();
        if after.parent_id != before.parent_id {
            if let Some(old_parent) = &before.parent_id {
                rollup.merge(self.rollup(old_parent, TRIGGER_ROLLUP)?);
            }
            if let Some(new_parent) = &after.parent_id {
                rollup.merge(self.rollup(new_parent, TRIGGER_ROLLUP)?);
            }
        }

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Updated,
            EntityKind::Objective,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, rollup, outbox))
    }

    /// Delete an objective and its whole subtree, then re-roll the former
    /// parent. Returns the removed ids, deepest first.
    pub fn delete_objective(
        &mut self,
        actor: &Actor,
        id: &ObjectiveId,
    ) -> Result<Outcome<Vec<ObjectiveId>>, OkrError> {
        let root = self.visible_objective(actor, id)?;
        let subtree = self.subtree(id)?;

        // Every member of the subtree is gated as if deleted directly.
        let checker = GovernanceChecker::new(&self.rbac);
        for objective_id in &subtree {
            let objective = self
                .store
                .objective(objective_id)?
                .ok_or_else(|| OkrError::not_found(EntityKind::Objective, objective_id))?;
            Self::guard_write(actor, objective.tenant_id.as_ref())?;
            checker.check_all_locks(actor, &self.objective_target(&objective)?, Mutation::Delete)?;
        }

        let mut outbox = Outbox::new();
        let mut removed = Vec::with_capacity(subtree.len());
        for objective_id in subtree.iter().rev() {
            if let Some(objective) = self.store.remove_objective(objective_id)? {
                outbox.push(self.event(
                    ActivityAction::Deleted,
                    EntityKind::Objective,
                    objective_id,
                    &objective.tenant_id,
                    actor,
                    Some(&objective),
                    None,
                ));
                removed.push(objective.id);
            }
        }

        let rollup = match &root.parent_id {
            Some(parent_id) => self.rollup(parent_id, TRIGGER_ROLLUP)?,
            None => RollupReport::default(),
        };
        Ok(self.finish(removed, rollup, outbox))
    }

    /// Move an objective along the lifecycle table.
    pub fn transition_objective(
        &mut self,
        actor: &Actor,
        id: &ObjectiveId,
        to: LifecycleState,
    ) -> Result<Outcome<Objective>, OkrError> {
        let before = self.visible_objective(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.objective_target(&before)?,
            Mutation::Transition,
        )?;
        let from = before.effective_state();
        TransitionValidator::validate_lifecycle(EntityKind::Objective, from, to)?;

        let mut after = before.clone();
        after.state = Some(to);
        after.is_published = Self::published_flag(to, before.is_published);
        if let Some(status) = TransitionValidator::aligned_status(to) {
            after.status = status;
        }
        after.version = before.version.saturating_add(1);
        self.store.update_objective(after.clone())?;

        let mut rollup = RollupReport::default();
        if after.status != before.status {
            self.store.append_snapshot(StatusSnapshot {
                entity_id: id.to_string(),
                recorded_at: self.clock.now(),
                status: after.status,
                progress: Some(after.progress),
                triggered_by: TRIGGER_TRANSITION.to_string(),
            })?;
            if let Some(parent_id) = &after.parent_id {
                rollup = self.rollup(parent_id, TRIGGER_TRANSITION)?;
            }
        }

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            TransitionValidator::action_for(from, to),
            EntityKind::Objective,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, rollup, outbox))
    }

    /// Force a progress and status recomputation of an objective and its
    /// ancestors.
    pub fn recalculate(
        &mut self,
        actor: &Actor,
        id: &ObjectiveId,
    ) -> Result<Outcome<RollupReport>, OkrError> {
        let objective = self.visible_objective(actor, id)?;
        Self::guard_write(actor, objective.tenant_id.as_ref())?;
        let rollup = self.rollup(id, TRIGGER_ROLLUP)?;
        Ok(self.finish(rollup, rollup, Outbox::new()))
    }

    // -------------------------------------------------------------------------
    // Key Results
    // -------------------------------------------------------------------------

    /// Create a key result in DRAFT, optionally linked to an objective.
    pub fn create_key_result(
        &mut self,
        actor: &Actor,
        mut key_result: KeyResult,
        link: Option<(ObjectiveId, f64)>,
    ) -> Result<Outcome<KeyResult>, OkrError> {
        let tenant_id = Self::stamp_tenant(actor, key_result.tenant_id.take())?;
        key_result.tenant_id = Some(tenant_id);

        if self.store.key_result(&key_result.id)?.is_some() {
            return Err(Self::duplicate(EntityKind::KeyResult, &key_result.id));
        }
        Self::require_finite("start_value", key_result.start_value)?;
        Self::require_finite("target_value", key_result.target_value)?;
        Self::require_finite("current_value", key_result.current_value)?;

        key_result.state = Some(LifecycleState::Draft);
        key_result.is_published = false;
        key_result.version = 0;
        key_result.progress = key_result.computed_progress();

        let mut cycles = Vec::new();
        if let Some((objective_id, weight)) = &link {
            let objective = self.visible_objective(actor, objective_id)?;
            Self::guard_write(actor, objective.tenant_id.as_ref())?;
            Self::require_finite("weight", *weight)?;
            cycles.extend(self.cycle_of(&objective)?);
        }
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &LockTarget::for_key_result(&key_result, cycles),
            Mutation::Create,
        )?;

        self.store.insert_key_result(key_result.clone())?;
        let mut rollup = RollupReport::default();
        if let Some((objective_id, weight)) = link {
            self.store.link(
                ObjectiveKeyResult::new(objective_id.clone(), key_result.id.clone())
                    .with_weight(weight),
            )?;
            rollup = self.rollup(&objective_id, TRIGGER_ROLLUP)?;
        }

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Created,
            EntityKind::KeyResult,
            &key_result.id,
            &key_result.tenant_id,
            actor,
            None,
            Some(&key_result),
        ));
        Ok(self.finish(key_result, rollup, outbox))
    }

    /// Edit a key result's definition. Changing start or target re-derives
    /// its progress and rolls up every linked objective.
    pub fn update_key_result(
        &mut self,
        actor: &Actor,
        id: &KeyResultId,
        patch: KeyResultPatch,
    ) -> Result<Outcome<KeyResult>, OkrError> {
        let before = self.visible_key_result(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.key_result_target(&before)?,
            Mutation::Update,
        )?;

        let mut after = before.clone();
        if let Some(title) = patch.title {
            after.title = title;
        }
        if let Some(unit) = patch.unit {
            after.unit = Some(unit);
        }
        if let Some(start) = patch.start_value {
            after.start_value = Self::require_finite("start_value", start)?;
        }
        if let Some(target) = patch.target_value {
            after.target_value = Self::require_finite("target_value", target)?;
        }
        after.progress = after.computed_progress();
        after.version = before.version.saturating_add(1);
        self.store.update_key_result(after.clone())?;

        let rollup = self.rollup_key_result(id, TRIGGER_ROLLUP)?;
        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Updated,
            EntityKind::KeyResult,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, rollup, outbox))
    }

    /// Record a new value for a key result and roll it up.
    pub fn check_in(
        &mut self,
        actor: &Actor,
        request: CheckInRequest,
    ) -> Result<Outcome<KeyResult>, OkrError> {
        let id = &request.key_result_id;
        let before = self.visible_key_result(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        if let Some(expected) = request.expected_version.filter(|v| *v != before.version) {
            return Err(OkrError::Conflict(format!(
                "{} '{}' is at version {}, expected {}",
                EntityKind::KeyResult,
                id,
                before.version,
                expected
            )));
        }
        let value = Self::require_finite("value", request.value)?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.key_result_target(&before)?,
            Mutation::CheckIn,
        )?;

        let mut after = before.clone();
        after.current_value = value;
        after.progress = after.computed_progress();
        if let Some(status) = request.status {
            after.status = status;
        }
        after.version = before.version.saturating_add(1);
        self.store.update_key_result(after.clone())?;

        let now = self.clock.now();
        self.store.append_check_in(CheckIn {
            key_result_id: id.clone(),
            user_id: actor.user_id.clone(),
            previous_value: before.current_value,
            new_value: value,
            note: request.note,
            confidence: request.confidence,
            recorded_at: now,
        })?;
        if after.status != before.status {
            self.store.append_snapshot(StatusSnapshot {
                entity_id: id.to_string(),
                recorded_at: now,
                status: after.status,
                progress: Some(after.progress),
                triggered_by: TRIGGER_CHECK_IN.to_string(),
            })?;
        }

        let rollup = self.rollup_key_result(id, TRIGGER_CHECK_IN)?;
        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::CheckedIn,
            EntityKind::KeyResult,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, rollup, outbox))
    }

    /// Move a key result along the lifecycle table.
    pub fn transition_key_result(
        &mut self,
        actor: &Actor,
        id: &KeyResultId,
        to: LifecycleState,
    ) -> Result<Outcome<KeyResult>, OkrError> {
        let before = self.visible_key_result(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.key_result_target(&before)?,
            Mutation::Transition,
        )?;
        let from = before.effective_state();
        TransitionValidator::validate_lifecycle(EntityKind::KeyResult, from, to)?;

        let mut after = before.clone();
        after.state = Some(to);
        after.is_published = Self::published_flag(to, before.is_published);
        if let Some(status) = TransitionValidator::aligned_status(to) {
            after.status = status;
        }
        after.version = before.version.saturating_add(1);
        self.store.update_key_result(after.clone())?;

        let mut rollup = RollupReport::default();
        if after.status != before.status {
            self.store.append_snapshot(StatusSnapshot {
                entity_id: id.to_string(),
                recorded_at: self.clock.now(),
                status: after.status,
                progress: Some(after.progress),
                triggered_by: TRIGGER_TRANSITION.to_string(),
            })?;
            rollup = self.rollup_key_result(id, TRIGGER_TRANSITION)?;
        }

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            TransitionValidator::action_for(from, to),
            EntityKind::KeyResult,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, rollup, outbox))
    }

    /// Delete a key result and re-roll every objective it was linked to.
    pub fn delete_key_result(
        &mut self,
        actor: &Actor,
        id: &KeyResultId,
    ) -> Result<Outcome<KeyResult>, OkrError> {
        let key_result = self.visible_key_result(actor, id)?;
        Self::guard_write(actor, key_result.tenant_id.as_ref())?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.key_result_target(&key_result)?,
            Mutation::Delete,
        )?;

        let linked = self.store.objectives_for_key_result(id)?;
        self.store.remove_key_result(id)?;
        let mut rollup = RollupReport::default();
        for objective_id in &linked {
            rollup.merge(self.rollup(objective_id, TRIGGER_ROLLUP)?);
        }

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Deleted,
            EntityKind::KeyResult,
            id,
            &key_result.tenant_id,
            actor,
            Some(&key_result),
            None,
        ));
        Ok(self.finish(key_result, rollup, outbox))
    }

    /// Link (or re-weight) a key result under an objective.
    pub fn link_key_result(
        &mut self,
        actor: &Actor,
        objective_id: &ObjectiveId,
        key_result_id: &KeyResultId,
        weight: f64,
    ) -> Result<Outcome<ObjectiveKeyResult>, OkrError> {
        let objective = self.visible_objective(actor, objective_id)?;
        let key_result = self.visible_key_result(actor, key_result_id)?;
        Self::guard_write(actor, objective.tenant_id.as_ref())?;
        Self::guard_write(actor, key_result.tenant_id.as_ref())?;
        let weight = Self::require_finite("weight", weight)?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.objective_target(&objective)?,
            Mutation::Update,
        )?;

        let link = ObjectiveKeyResult::new(objective_id.clone(), key_result_id.clone())
            .with_weight(weight);
        self.store.link(link.clone())?;
        let rollup = self.rollup(objective_id, TRIGGER_ROLLUP)?;

        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Updated,
            EntityKind::Objective,
            objective_id,
            &objective.tenant_id,
            actor,
            None,
            Some(&link),
        ));
        Ok(self.finish(link, rollup, outbox))
    }

    /// Remove a link and re-roll the objective.
    pub fn unlink_key_result(
        &mut self,
        actor: &Actor,
        objective_id: &ObjectiveId,
        key_result_id: &KeyResultId,
    ) -> Result<Outcome<()>, OkrError> {
        let objective = self.visible_objective(actor, objective_id)?;
        Self::guard_write(actor, objective.tenant_id.as_ref())?;
        GovernanceChecker::new(&self.rbac).check_all_locks(
            actor,
            &self.objective_target(&objective)?,
            Mutation::Update,
        )?;
        if !self.store.unlink(objective_id, key_result_id)? {
            return Err(OkrError::NotFound(format!(
                "link {} -> {}",
                objective_id, key_result_id
            )));
        }
        let rollup = self.rollup(objective_id, TRIGGER_ROLLUP)?;

        let mut outbox = Outbox::new();
        outbox.push(self.event::<ObjectiveKeyResult>(
            ActivityAction::Updated,
            EntityKind::Objective,
            objective_id,
            &objective.tenant_id,
            actor,
            None,
            None,
        ));
        Ok(self.finish((), rollup, outbox))
    }

    // -------------------------------------------------------------------------
    // Initiatives
    // -------------------------------------------------------------------------

    /// Create an initiative under exactly one objective or key result.
    pub fn create_initiative(
        &mut self,
        actor: &Actor,
        mut initiative: Initiative,
    ) -> Result<Outcome<Initiative>, OkrError> {
        let tenant_id = Self::stamp_tenant(actor, initiative.tenant_id.take())?;
        initiative.tenant_id = Some(tenant_id);

        let parent_tenant = match (&initiative.objective_id, &initiative.key_result_id) {
            (Some(objective_id), None) => self.visible_objective(actor, objective_id)?.tenant_id,
            (None, Some(key_result_id)) => {
                self.visible_key_result(actor, key_result_id)?.tenant_id
            }
            _ => {
                return Err(OkrError::BadRequest(format!(
                    "{} '{}' must belong to exactly one objective or key result",
                    EntityKind::Initiative,
                    initiative.id
                )));
            }
        };
        Self::guard_write(actor, parent_tenant.as_ref())?;
        if self.store.initiative(&initiative.id)?.is_some() {
            return Err(Self::duplicate(EntityKind::Initiative, &initiative.id));
        }
        initiative.status = InitiativeStatus::NotStarted;

        self.store.insert_initiative(initiative.clone())?;
        let mut outbox = Outbox::new();
        outbox.push(self.event(
            ActivityAction::Created,
            EntityKind::Initiative,
            &initiative.id,
            &initiative.tenant_id,
            actor,
            None,
            Some(&initiative),
        ));
        Ok(self.finish(initiative, RollupReport::default(), outbox))
    }

    /// Move an initiative along its operational table.
    pub fn transition_initiative(
        &mut self,
        actor: &Actor,
        id: &InitiativeId,
        to: InitiativeStatus,
    ) -> Result<Outcome<Initiative>, OkrError> {
        let before = self.visible_initiative(actor, id)?;
        Self::guard_write(actor, before.tenant_id.as_ref())?;
        TransitionValidator::validate_initiative(before.status, to)?;

        let mut after = before.clone();
        after.status = to;
        self.store.update_initiative(after.clone())?;

        let action = if to == InitiativeStatus::Completed {
            ActivityAction::Completed
        } else {
            ActivityAction::StateChange
        };
        let mut outbox = Outbox::new();
        outbox.push(self.event(
            action,
            EntityKind::Initiative,
            id,
            &after.tenant_id,
            actor,
            Some(&before),
            Some(&after),
        ));
        Ok(self.finish(after, RollupReport::default(), outbox))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn visible_objective(&self, actor: &Actor, id: &ObjectiveId) -> Result<Objective, OkrError> {
        let objective = self
            .store
            .objective(id)?
            .ok_or_else(|| OkrError::not_found(EntityKind::Objective, id))?;
        TenantGuard::ensure_visible(
            objective.tenant_id.as_ref(),
            &actor.tenant,
            &format!("{} '{}'", EntityKind::Objective, id),
        )?;
        Ok(objective)
    }

    fn visible_key_result(&self, actor: &Actor, id: &KeyResultId) -> Result<KeyResult, OkrError> {
        let key_result = self
            .store
            .key_result(id)?
            .ok_or_else(|| OkrError::not_found(EntityKind::KeyResult, id))?;
        TenantGuard::ensure_visible(
            key_result.tenant_id.as_ref(),
            &actor.tenant,
            &format!("{} '{}'", EntityKind::KeyResult, id),
        )?;
        Ok(key_result)
    }

    fn visible_initiative(&self, actor: &Actor, id: &InitiativeId) -> Result<Initiative, OkrError> {
        let initiative = self
            .store
            .initiative(id)?
            .ok_or_else(|| OkrError::not_found(EntityKind::Initiative, id))?;
        TenantGuard::ensure_visible(
            initiative.tenant_id.as_ref(),
            &actor.tenant,
            &format!("{} '{}'", EntityKind::Initiative, id),
        )?;
        Ok(initiative)
    }

    fn guard_write(actor: &Actor, resource_tenant: Option<&TenantId>) -> Result<(), OkrError> {
        TenantGuard::assert_can_mutate(&actor.tenant)?;
        TenantGuard::assert_same_tenant(resource_tenant, &actor.tenant)
    }

    /// Tenant for a new record: the actor's own, which a supplied value must
    /// match.
    fn stamp_tenant(actor: &Actor, supplied: Option<TenantId>) -> Result<TenantId, OkrError> {
        TenantGuard::assert_can_mutate(&actor.tenant)?;
        let own = actor
            .tenant
            .tenant_id()
            .cloned()
            .ok_or_else(|| OkrError::Forbidden("actor has no tenant".to_string()))?;
        let tenant = supplied.unwrap_or(own);
        TenantGuard::assert_same_tenant(Some(&tenant), &actor.tenant)?;
        Ok(tenant)
    }

    fn duplicate(kind: EntityKind, id: impl std::fmt::Display) -> OkrError {
        OkrError::Conflict(format!("{} '{}' already exists", kind, id))
    }

    fn require_finite(field: &str, value: f64) -> Result<f64, OkrError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(OkrError::BadRequest(format!("{} must be a finite number", field)))
        }
    }

    fn published_flag(to: LifecycleState, current: bool) -> bool {
        match to {
            LifecycleState::Published => true,
            LifecycleState::Draft => false,
            _ => current,
        }
    }

    /// The objective's cycle. A dangling cycle reference never locks.
    fn cycle_of(&self, objective: &Objective) -> Result<Option<Cycle>, OkrError> {
        match &objective.cycle_id {
            Some(cycle_id) => self.store.cycle(cycle_id),
            None => Ok(None),
        }
    }

    fn objective_target(&self, objective: &Objective) -> Result<LockTarget, OkrError> {
        Ok(LockTarget::for_objective(objective, self.cycle_of(objective)?))
    }

    /// A key result inherits the cycles of every objective it is linked to.
    fn key_result_target(&self, key_result: &KeyResult) -> Result<LockTarget, OkrError> {
        let mut cycles = BTreeMap::new();
        for objective_id in self.store.objectives_for_key_result(&key_result.id)? {
            if let Some(objective) = self.store.objective(&objective_id)? {
                if let Some(cycle) = self.cycle_of(&objective)? {
                    cycles.insert(cycle.id.clone(), cycle);
                }
            }
        }
        Ok(LockTarget::for_key_result(
            key_result,
            cycles.into_values().collect(),
        ))
    }

    /// Reject re-parenting `id` under itself or one of its descendants.
    fn ensure_not_descendant(
        &self,
        id: &ObjectiveId,
        new_parent: &ObjectiveId,
    ) -> Result<(), OkrError> {
        let mut visited = BTreeSet::new();
        let mut next = Some(new_parent.clone());
        while let Some(current) = next {
            if &current == id || !visited.insert(current.clone()) {
                return Err(OkrError::HierarchyCycle(id.clone()));
            }
            next = self.store.objective(&current)?.and_then(|o| o.parent_id);
        }
        Ok(())
    }

    /// `id` followed by its descendants in breadth-first order.
    fn subtree(&self, id: &ObjectiveId) -> Result<Vec<ObjectiveId>, OkrError> {
        let mut order = vec![id.clone()];
        let mut seen: BTreeSet<ObjectiveId> = order.iter().cloned().collect();
        let mut cursor = 0;
        while cursor < order.len() {
            let current = order[cursor].clone();
            cursor += 1;
            for child in self.store.children(&current)? {
                if !seen.insert(child.id.clone()) {
                    return Err(OkrError::HierarchyCycle(child.id));
                }
                order.push(child.id);
            }
        }
        Ok(order)
    }

    fn rollup(&mut self, id: &ObjectiveId, trigger: &str) -> Result<RollupReport, OkrError> {
        RollupEngine::new(&mut self.store, &self.clock, trigger).recalculate(id)
    }

    fn rollup_key_result(
        &mut self,
        id: &KeyResultId,
        trigger: &str,
    ) -> Result<RollupReport, OkrError> {
        RollupEngine::new(&mut self.store, &self.clock, trigger).recalculate_for_key_result(id)
    }

    fn event<T: Serialize>(
        &self,
        action: ActivityAction,
        entity: EntityKind,
        entity_id: impl ToString,
        tenant_id: &Option<TenantId>,
        actor: &Actor,
        before: Option<&T>,
        after: Option<&T>,
    ) -> ActivityEvent {
        ActivityEvent::new(
            action,
            entity,
            entity_id.to_string(),
            tenant_id.clone(),
            actor.user_id.clone(),
            before,
            after,
            self.clock.now(),
        )
    }

    fn finish<T>(&self, value: T, rollup: RollupReport, outbox: Outbox) -> Outcome<T> {
        let dispatch = outbox.dispatch(&self.sinks);
        Outcome {
            value,
            rollup,
            dispatch,
        }
    }
}
