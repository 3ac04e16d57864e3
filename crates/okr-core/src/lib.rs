//! # okr-core
//!
//! The governance and rollup engine for multi-tenant OKR tracking.
//!
//! This crate holds the logic that must stay correct regardless of how the
//! application around it is delivered:
//! - `tenant`: three-valued actor identity and isolation checks
//! - `transition`: table-driven lifecycle and initiative state machines
//! - `governance`: publish and cycle locks with RBAC escalation
//! - `rollup`: weighted progress and status aggregation up the Objective tree
//! - `service`: the orchestration pipeline that runs them around each write
//!
//! ## Architectural Constraints
//!
//! - Synchronous and request-scoped: no async, no network, no background work
//! - Persistence, RBAC and activity logging are collaborator traits
//! - `BTreeMap`/`BTreeSet` only, so iteration and rollup order are deterministic
//! - Notifications are side effects drained after the core operation succeeds

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod events;
pub mod governance;
pub mod primitives;
pub mod rollup;
pub mod service;
pub mod store;
pub mod tenant;
pub mod transition;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CheckIn, Confidence, Cycle, CycleId, CycleStatus, EntityKind, ErrorKind, Initiative,
    InitiativeId, InitiativeStatus, KeyResult, KeyResultId, LifecycleState, MetricType, Objective,
    ObjectiveId, ObjectiveKeyResult, OkrError, OkrStatus, StatusSnapshot, TeamId, TenantId, UserId,
    Visibility, WorkspaceId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use events::{
    ActivityAction, ActivityEvent, ActivitySink, DispatchSummary, Outbox, SinkError, TracingSink,
};
pub use governance::{
    Actor, GovernanceChecker, Grant, LockDecision, LockKind, LockReport, LockTarget, Mutation,
    RbacOracle, ResourceScope, StaticRbac,
};
pub use rollup::{RollupEngine, RollupReport, aggregate_status, metric_progress, weighted_progress};
pub use service::{CheckInRequest, KeyResultPatch, ObjectivePatch, OkrService, Outcome};
pub use store::{MemoryStore, OkrStore, SerializableStore};
pub use tenant::{TenantFilter, TenantGuard, TenantIdentity, TenantViolation};
pub use transition::TransitionValidator;
