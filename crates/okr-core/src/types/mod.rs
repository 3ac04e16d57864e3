//! # Core Type Definitions
//!
//! This module contains the vocabulary shared by every component:
//! - Identifiers (`TenantId`, `ObjectiveId`, `KeyResultId`, ...)
//! - Operational and lifecycle enums (`OkrStatus`, `LifecycleState`, ...)
//! - Entities (`Objective`, `KeyResult`, `Cycle`, ...) in [`entity`]
//! - Error types (`OkrError`, `ErrorKind`)
//!
//! All enums serialize as `SCREAMING_SNAKE_CASE` and implement `Ord`, so they
//! can key `BTreeMap`s and produce deterministic listings.

mod entity;

pub use entity::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Isolation boundary. Resources without one are system/global.
    TenantId
);
string_id!(
    /// Identifier of an Objective node.
    ObjectiveId
);
string_id!(
    /// Identifier of a Key Result.
    KeyResultId
);
string_id!(
    /// Identifier of an Initiative.
    InitiativeId
);
string_id!(
    /// Identifier of a planning Cycle.
    CycleId
);
string_id!(
    /// Identifier of a user (owner or acting user).
    UserId
);
string_id!(WorkspaceId);
string_id!(TeamId);

// =============================================================================
// ENUM PARSING
// =============================================================================

/// Normalize user input to the canonical `SCREAMING_SNAKE_CASE` form.
fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

// =============================================================================
// OPERATIONAL STATUS
// =============================================================================

/// Operational health of an Objective or Key Result.
///
/// Distinct from [`LifecycleState`]: status is recomputed by the rollup,
/// lifecycle state only moves through explicit transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OkrStatus {
    #[default]
    OnTrack,
    AtRisk,
    OffTrack,
    Completed,
    Cancelled,
}

impl OkrStatus {
    /// All statuses in declaration order.
    pub const ALL: [OkrStatus; 5] = [
        OkrStatus::OnTrack,
        OkrStatus::AtRisk,
        OkrStatus::OffTrack,
        OkrStatus::Completed,
        OkrStatus::Cancelled,
    ];

    /// Values older records stored in `status` that are no longer accepted.
    const DEPRECATED: [&'static str; 3] = ["ACTIVE", "DRAFT", "BEHIND"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OkrStatus::OnTrack => "ON_TRACK",
            OkrStatus::AtRisk => "AT_RISK",
            OkrStatus::OffTrack => "OFF_TRACK",
            OkrStatus::Completed => "COMPLETED",
            OkrStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OkrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OkrStatus {
    type Err = OkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        if Self::DEPRECATED.contains(&key.as_str()) {
            return Err(OkrError::BadRequest(format!(
                "deprecated status value '{}': lifecycle phases belong in state, \
                 use ON_TRACK, AT_RISK, OFF_TRACK, COMPLETED or CANCELLED",
                s.trim()
            )));
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| OkrError::BadRequest(format!("unknown status '{}'", s.trim())))
    }
}

// =============================================================================
// LIFECYCLE STATE
// =============================================================================

/// Governance phase of an Objective or Key Result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    #[default]
    Draft,
    Published,
    Completed,
    Cancelled,
    Archived,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::Draft,
        LifecycleState::Published,
        LifecycleState::Completed,
        LifecycleState::Cancelled,
        LifecycleState::Archived,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Draft => "DRAFT",
            LifecycleState::Published => "PUBLISHED",
            LifecycleState::Completed => "COMPLETED",
            LifecycleState::Cancelled => "CANCELLED",
            LifecycleState::Archived => "ARCHIVED",
        }
    }

    /// Anything past DRAFT is publish-locked.
    #[must_use]
    pub fn is_publish_locked(&self) -> bool {
        !matches!(self, LifecycleState::Draft)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = OkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == key)
            .ok_or_else(|| OkrError::BadRequest(format!("unknown lifecycle state '{}'", s.trim())))
    }
}

// =============================================================================
// INITIATIVE STATUS
// =============================================================================

/// Operational status of an Initiative. Has its own state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitiativeStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl InitiativeStatus {
    pub const ALL: [InitiativeStatus; 4] = [
        InitiativeStatus::NotStarted,
        InitiativeStatus::InProgress,
        InitiativeStatus::Completed,
        InitiativeStatus::Blocked,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InitiativeStatus::NotStarted => "NOT_STARTED",
            InitiativeStatus::InProgress => "IN_PROGRESS",
            InitiativeStatus::Completed => "COMPLETED",
            InitiativeStatus::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for InitiativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitiativeStatus {
    type Err = OkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| {
                OkrError::BadRequest(format!("unknown initiative status '{}'", s.trim()))
            })
    }
}

// =============================================================================
// CYCLE STATUS
// =============================================================================

/// Status of a planning Cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    #[default]
    Draft,
    Active,
    Locked,
    Archived,
}

impl CycleStatus {
    /// LOCKED and ARCHIVED cycles block mutation of their Objectives.
    #[must_use]
    pub fn is_locking(&self) -> bool {
        matches!(self, CycleStatus::Locked | CycleStatus::Archived)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Draft => "DRAFT",
            CycleStatus::Active => "ACTIVE",
            CycleStatus::Locked => "LOCKED",
            CycleStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// METRICS, VISIBILITY, CONFIDENCE
// =============================================================================

/// How a Key Result's values translate into progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    Percentage,
    #[default]
    Number,
    Currency,
    Boolean,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Private,
    #[default]
    Team,
    Organization,
}

/// Confidence reported with a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Kind of governed entity, used in error messages and activity events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Objective,
    KeyResult,
    Initiative,
    Cycle,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Objective => "objective",
            EntityKind::KeyResult => "key result",
            EntityKind::Initiative => "initiative",
            EntityKind::Cycle => "cycle",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the governance and rollup engine.
///
/// Guards and validators return these before any write happens. The rollup
/// cascade propagates `Storage` and `HierarchyCycle` to the caller instead of
/// leaving a silent partial rollup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OkrError {
    /// Tenant mismatch, read-only actor, or a governance lock without escalation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Illegal transition, deprecated enum value, or invalid linkage.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Entity is missing or invisible to the acting tenant.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency token did not match.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A parent chain loops back on itself.
    #[error("Cyclic objective hierarchy detected at {0}")]
    HierarchyCycle(ObjectiveId),

    /// The persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse error classification for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Forbidden,
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl OkrError {
    /// Classify the error for mapping onto a transport status.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OkrError::Forbidden(_) => ErrorKind::Forbidden,
            OkrError::BadRequest(_) => ErrorKind::BadRequest,
            OkrError::NotFound(_) => ErrorKind::NotFound,
            OkrError::Conflict(_) => ErrorKind::Conflict,
            OkrError::HierarchyCycle(_) | OkrError::Storage(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        OkrError::NotFound(format!("{} '{}'", kind, id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
