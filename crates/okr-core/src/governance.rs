//! # Governance Lock Checker
//!
//! Two independent lock sources gate mutation of Objectives and Key Results:
//!
//! | Lock | Engaged when | Applies to |
//! |------|--------------|------------|
//! | Cycle | a referenced Cycle is LOCKED or ARCHIVED | every mutation |
//! | Publish | effective lifecycle state is not DRAFT | update, delete, check-in |
//!
//! A lock blocks a superuser unconditionally. Any other actor passes only if
//! the RBAC oracle grants [`EDIT_LOCKED_ACTION`] on the resource's own scope.
//! The cycle lock is evaluated first; both must pass.

use crate::primitives::EDIT_LOCKED_ACTION;
use crate::tenant::TenantIdentity;
use crate::{
    Cycle, EntityKind, KeyResult, LifecycleState, Objective, OkrError, TeamId, TenantId, UserId,
    WorkspaceId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// COLLABORATOR: RBAC ORACLE
// =============================================================================

/// Where a permission is evaluated: the resource's tenant, workspace and team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceScope {
    pub tenant_id: Option<TenantId>,
    pub workspace_id: Option<WorkspaceId>,
    pub team_id: Option<TeamId>,
}

/// External role/permission oracle. Opaque to the lock checker.
pub trait RbacOracle {
    /// Whether `actor_id` may perform `action` within `scope`.
    fn can_perform_action(&self, actor_id: &UserId, action: &str, scope: &ResourceScope) -> bool;
}

impl<T: RbacOracle + ?Sized> RbacOracle for &T {
    fn can_perform_action(&self, actor_id: &UserId, action: &str, scope: &ResourceScope) -> bool {
        (**self).can_perform_action(actor_id, action, scope)
    }
}

/// One permission grant in a [`StaticRbac`] table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub user: UserId,
    pub action: String,
    /// Restrict the grant to one tenant; `None` grants it in every tenant.
    #[serde(default)]
    pub tenant: Option<TenantId>,
}

/// Allow-list oracle backed by an in-memory grant table.
#[derive(Debug, Clone, Default)]
pub struct StaticRbac {
    elevated: BTreeSet<UserId>,
    grants: BTreeSet<Grant>,
}

impl StaticRbac {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant every action, in every scope, to `user`.
    #[must_use]
    pub fn with_elevated(mut self, user: impl Into<UserId>) -> Self {
        self.elevated.insert(user.into());
        self
    }

    #[must_use]
    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.insert(grant);
        self
    }
}

impl RbacOracle for StaticRbac {
    fn can_perform_action(&self, actor_id: &UserId, action: &str, scope: &ResourceScope) -> bool {
        if self.elevated.contains(actor_id) {
            return true;
        }
        self.grants.iter().any(|g| {
            &g.user == actor_id
                && g.action == action
                && g.tenant.as_ref().is_none_or(|t| scope.tenant_id.as_ref() == Some(t))
        })
    }
}

// =============================================================================
// ACTOR & MUTATION
// =============================================================================

/// The acting user and their tenant identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub tenant: TenantIdentity,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, tenant: TenantIdentity) -> Self {
        Self {
            user_id: user_id.into(),
            tenant,
        }
    }

    /// A normal actor scoped to `tenant`.
    #[must_use]
    pub fn tenant_user(user_id: impl Into<UserId>, tenant: impl Into<TenantId>) -> Self {
        Self::new(user_id, TenantIdentity::Tenant(tenant.into()))
    }
}

/// Kind of mutation being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Create,
    Update,
    Delete,
    CheckIn,
    /// Explicit lifecycle transition, gated on the source state: only a
    /// DRAFT resource moves freely.
    Transition,
}

impl Mutation {
    /// Only Create is exempt from the publish lock.
    #[must_use]
    pub fn subject_to_publish_lock(self) -> bool {
        !matches!(self, Mutation::Create)
    }
}

// =============================================================================
// DECISIONS
// =============================================================================

/// Source of a governance lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Cycle,
    Publish,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Cycle => f.write_str("cycle lock"),
            LockKind::Publish => f.write_str("publish lock"),
        }
    }
}

/// Outcome of a passing lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockDecision {
    /// The lock was not engaged.
    Unlocked,
    /// The lock was engaged and the actor's elevated permission bypassed it.
    Escalated(LockKind),
}

impl LockDecision {
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        matches!(self, LockDecision::Escalated(_))
    }
}

/// Combined result of [`GovernanceChecker::check_all_locks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReport {
    pub cycle: LockDecision,
    pub publish: LockDecision,
}

// =============================================================================
// LOCK TARGET
// =============================================================================

/// What the lock checker needs to know about a governed resource.
#[derive(Debug, Clone)]
pub struct LockTarget {
    pub kind: EntityKind,
    pub id: String,
    pub state: LifecycleState,
    pub scope: ResourceScope,
    /// Cycles the resource belongs to. An Objective has at most one; a Key
    /// Result inherits the cycles of every Objective it is linked to.
    pub cycles: Vec<Cycle>,
}

impl LockTarget {
    #[must_use]
    pub fn for_objective(objective: &Objective, cycle: Option<Cycle>) -> Self {
        Self {
            kind: EntityKind::Objective,
            id: objective.id.to_string(),
            state: objective.effective_state(),
            scope: objective.scope(),
            cycles: cycle.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn for_key_result(key_result: &KeyResult, cycles: Vec<Cycle>) -> Self {
        Self {
            kind: EntityKind::KeyResult,
            id: key_result.id.to_string(),
            state: key_result.effective_state(),
            scope: key_result.scope(),
            cycles,
        }
    }
}

// =============================================================================
// CHECKER
// =============================================================================

/// Evaluates governance locks against an RBAC oracle.
pub struct GovernanceChecker<'r, R: RbacOracle + ?Sized> {
    rbac: &'r R,
}

impl<'r, R: RbacOracle + ?Sized> GovernanceChecker<'r, R> {
    #[must_use]
    pub fn new(rbac: &'r R) -> Self {
        Self { rbac }
    }

    /// Publish lock: engaged for every state past DRAFT.
    pub fn check_publish_lock(
        &self,
        actor: &Actor,
        target: &LockTarget,
    ) -> Result<LockDecision, OkrError> {
        if !target.state.is_publish_locked() {
            return Ok(LockDecision::Unlocked);
        }
        self.escalate(
            actor,
            target,
            LockKind::Publish,
            &format!("{} '{}' is {}", target.kind, target.id, target.state),
        )
    }

    /// Cycle lock: engaged when any referenced cycle is LOCKED or ARCHIVED.
    pub fn check_cycle_lock(
        &self,
        actor: &Actor,
        target: &LockTarget,
    ) -> Result<LockDecision, OkrError> {
        let Some(cycle) = target.cycles.iter().find(|c| c.status.is_locking()) else {
            return Ok(LockDecision::Unlocked);
        };
        self.escalate(
            actor,
            target,
            LockKind::Cycle,
            &format!(
                "{} '{}' belongs to cycle '{}' which is {}",
                target.kind, target.id, cycle.id, cycle.status
            ),
        )
    }

    /// Cycle lock first, then publish lock (when the mutation is subject to it).
    pub fn check_all_locks(
        &self,
        actor: &Actor,
        target: &LockTarget,
        mutation: Mutation,
    ) -> Result<LockReport, OkrError> {
        let cycle = self.check_cycle_lock(actor, target)?;
        let publish = if mutation.subject_to_publish_lock() {
            self.check_publish_lock(actor, target)?
        } else {
            LockDecision::Unlocked
        };
        Ok(LockReport { cycle, publish })
    }

    fn escalate(
        &self,
        actor: &Actor,
        target: &LockTarget,
        kind: LockKind,
        detail: &str,
    ) -> Result<LockDecision, OkrError> {
        if actor.tenant.is_superuser() {
            return Err(OkrError::Forbidden(format!(
                "{}: {}; superuser identity is read-only",
                kind, detail
            )));
        }
        if self
            .rbac
            .can_perform_action(&actor.user_id, EDIT_LOCKED_ACTION, &target.scope)
        {
            tracing::info!(
                target: "okr_core::governance",
                lock = %kind,
                actor = %actor.user_id,
                entity = %target.kind,
                entity_id = %target.id,
                "governance lock bypassed by elevated permission"
            );
            return Ok(LockDecision::Escalated(kind));
        }
        Err(OkrError::Forbidden(format!(
            "{}: {}; '{}' requires {}",
            kind, detail, actor.user_id, EDIT_LOCKED_ACTION
        )))
    }
}

// =============================================================================
// TESTS
// =============================================================================
