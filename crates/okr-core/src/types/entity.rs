//! Entities of the OKR data model.
//!
//! Objectives form a tree through `parent_id`; the tree is never owned, it is
//! resolved by lookup in the store arena. Key Results attach to Objectives
//! through weighted [`ObjectiveKeyResult`] links.

use super::{
    Confidence, CycleId, CycleStatus, InitiativeId, InitiativeStatus, KeyResultId,
    LifecycleState, MetricType, ObjectiveId, OkrStatus, TeamId, TenantId, UserId, Visibility,
    WorkspaceId,
};
use crate::governance::ResourceScope;
use crate::primitives::DEFAULT_LINK_WEIGHT;
use crate::rollup::metric_progress;
use crate::transition::TransitionValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// OBJECTIVE
// =============================================================================

/// A goal node. Aggregates progress and status from its Key Results, or from
/// its child Objectives when it has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: UserId,
    /// `None` marks a system/global record.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub parent_id: Option<ObjectiveId>,
    #[serde(default)]
    pub cycle_id: Option<CycleId>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: OkrStatus,
    /// Explicit lifecycle state. Records that predate it carry `None` and are
    /// read through [`Objective::effective_state`].
    #[serde(default)]
    pub state: Option<LifecycleState>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub version: u64,
}

impl Objective {
    /// Create a new DRAFT objective with zero progress.
    #[must_use]
    pub fn new(
        id: impl Into<ObjectiveId>,
        title: impl Into<String>,
        owner_id: impl Into<UserId>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            owner_id: owner_id.into(),
            tenant_id,
            workspace_id: None,
            team_id: None,
            parent_id: None,
            cycle_id: None,
            progress: 0.0,
            status: OkrStatus::OnTrack,
            state: Some(LifecycleState::Draft),
            is_published: false,
            visibility: Visibility::default(),
            version: 0,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ObjectiveId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_cycle(mut self, cycle_id: impl Into<CycleId>) -> Self {
        self.cycle_id = Some(cycle_id.into());
        self
    }

    /// Lifecycle state, derived from legacy fields when the explicit one is absent.
    #[must_use]
    pub fn effective_state(&self) -> LifecycleState {
        TransitionValidator::effective_state(self.state, self.status, self.is_published)
    }

    /// RBAC scope of this objective.
    #[must_use]
    pub fn scope(&self) -> ResourceScope {
        ResourceScope {
            tenant_id: self.tenant_id.clone(),
            workspace_id: self.workspace_id.clone(),
            team_id: self.team_id.clone(),
        }
    }
}

// =============================================================================
// KEY RESULT
// =============================================================================

/// A measurable metric contributing to one or more Objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: KeyResultId,
    pub title: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub start_value: f64,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: OkrStatus,
    #[serde(default)]
    pub state: Option<LifecycleState>,
    #[serde(default)]
    pub is_published: bool,
    /// Incremented on every write; check-ins may assert it.
    #[serde(default)]
    pub version: u64,
}

impl KeyResult {
    /// Create a new DRAFT key result whose progress reflects its start value.
    #[must_use]
    pub fn new(
        id: impl Into<KeyResultId>,
        title: impl Into<String>,
        owner_id: impl Into<UserId>,
        tenant_id: Option<TenantId>,
        metric_type: MetricType,
        start_value: f64,
        target_value: f64,
    ) -> Self {
        let mut kr = Self {
            id: id.into(),
            title: title.into(),
            owner_id: owner_id.into(),
            tenant_id,
            workspace_id: None,
            team_id: None,
            metric_type,
            start_value,
            target_value,
            current_value: start_value,
            unit: None,
            progress: 0.0,
            status: OkrStatus::OnTrack,
            state: Some(LifecycleState::Draft),
            is_published: false,
            version: 0,
        };
        kr.progress = kr.computed_progress();
        kr
    }

    /// Progress implied by the current value, per the metric formula.
    #[must_use]
    pub fn computed_progress(&self) -> f64 {
        metric_progress(
            self.metric_type,
            self.start_value,
            self.target_value,
            self.current_value,
        )
    }

    #[must_use]
    pub fn effective_state(&self) -> LifecycleState {
        TransitionValidator::effective_state(self.state, self.status, self.is_published)
    }

    #[must_use]
    pub fn scope(&self) -> ResourceScope {
        ResourceScope {
            tenant_id: self.tenant_id.clone(),
            workspace_id: self.workspace_id.clone(),
            team_id: self.team_id.clone(),
        }
    }
}

// =============================================================================
// JUNCTION
// =============================================================================

/// Weighted many-to-many link between an Objective and a Key Result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveKeyResult {
    pub objective_id: ObjectiveId,
    pub key_result_id: KeyResultId,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    DEFAULT_LINK_WEIGHT
}

impl ObjectiveKeyResult {
    /// Link with the default weight of 1.0.
    #[must_use]
    pub fn new(
        objective_id: impl Into<ObjectiveId>,
        key_result_id: impl Into<KeyResultId>,
    ) -> Self {
        Self {
            objective_id: objective_id.into(),
            key_result_id: key_result_id.into(),
            weight: DEFAULT_LINK_WEIGHT,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// =============================================================================
// INITIATIVE
// =============================================================================

/// Work item attached to exactly one Objective or one Key Result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: InitiativeId,
    pub title: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub objective_id: Option<ObjectiveId>,
    #[serde(default)]
    pub key_result_id: Option<KeyResultId>,
    #[serde(default)]
    pub status: InitiativeStatus,
}

// =============================================================================
// CYCLE
// =============================================================================

/// Time-boxed planning period whose status may lock its Objectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub status: CycleStatus,
}

impl Cycle {
    #[must_use]
    pub fn new(
        id: impl Into<CycleId>,
        name: impl Into<String>,
        tenant_id: Option<TenantId>,
        status: CycleStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tenant_id,
            status,
        }
    }
}

// =============================================================================
// APPEND-ONLY RECORDS
// =============================================================================

/// Timestamped status/progress record used for trend queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub entity_id: String,
    pub recorded_at: DateTime<Utc>,
    pub status: OkrStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    pub triggered_by: String,
}

/// A Key Result value update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub key_result_id: KeyResultId,
    pub user_id: UserId,
    pub previous_value: f64,
    pub new_value: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    pub recorded_at: DateTime<Utc>,
}
