//! # Persistence Collaborator
//!
//! [`OkrStore`] is the seam between the engine and whatever holds the data.
//! The engine only needs point lookups, tree navigation, idempotent field
//! writes, and append-only trend records.
//!
//! [`MemoryStore`] is the arena implementation used by the CLI and tests.

mod memory;

pub use memory::{MemoryStore, SerializableStore};

use crate::{
    CheckIn, Cycle, CycleId, Initiative, InitiativeId, KeyResult, KeyResultId, Objective,
    ObjectiveId, ObjectiveKeyResult, OkrError, OkrStatus, StatusSnapshot, TenantFilter,
};

/// Storage operations required by the rollup engine and the service layer.
///
/// Lookups return `Ok(None)` for missing records; `Err` is reserved for
/// storage failures. Writes against missing records return `NotFound`.
pub trait OkrStore {
    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    fn objective(&self, id: &ObjectiveId) -> Result<Option<Objective>, OkrError>;

    fn key_result(&self, id: &KeyResultId) -> Result<Option<KeyResult>, OkrError>;

    fn cycle(&self, id: &CycleId) -> Result<Option<Cycle>, OkrError>;

    fn initiative(&self, id: &InitiativeId) -> Result<Option<Initiative>, OkrError>;

    /// All objectives admitted by `filter`, ordered by id.
    fn objectives(&self, filter: &TenantFilter) -> Result<Vec<Objective>, OkrError>;

    /// Direct children of an objective, ordered by id.
    fn children(&self, id: &ObjectiveId) -> Result<Vec<Objective>, OkrError>;

    /// Key Results linked to an objective together with their link weight.
    fn linked_key_results(&self, id: &ObjectiveId) -> Result<Vec<(KeyResult, f64)>, OkrError>;

    /// Reverse lookup: objectives a Key Result is linked to.
    fn objectives_for_key_result(&self, id: &KeyResultId) -> Result<Vec<ObjectiveId>, OkrError>;

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    fn insert_objective(&mut self, objective: Objective) -> Result<(), OkrError>;

    fn insert_key_result(&mut self, key_result: KeyResult) -> Result<(), OkrError>;

    fn insert_cycle(&mut self, cycle: Cycle) -> Result<(), OkrError>;

    fn insert_initiative(&mut self, initiative: Initiative) -> Result<(), OkrError>;

    /// Replace an existing objective.
    fn update_objective(&mut self, objective: Objective) -> Result<(), OkrError>;

    /// Replace an existing key result.
    fn update_key_result(&mut self, key_result: KeyResult) -> Result<(), OkrError>;

    /// Replace an existing initiative.
    fn update_initiative(&mut self, initiative: Initiative) -> Result<(), OkrError>;

    /// Set the rolled-up progress of an objective.
    fn set_objective_progress(&mut self, id: &ObjectiveId, progress: f64) -> Result<(), OkrError>;

    /// Set the rolled-up status of an objective.
    fn set_objective_status(&mut self, id: &ObjectiveId, status: OkrStatus) -> Result<(), OkrError>;

    /// Create or re-weight a link. Both ends must exist.
    fn link(&mut self, link: ObjectiveKeyResult) -> Result<(), OkrError>;

    /// Remove a link. Returns `false` when it did not exist.
    fn unlink(&mut self, objective_id: &ObjectiveId, key_result_id: &KeyResultId)
    -> Result<bool, OkrError>;

    /// Remove one objective with its links and initiatives. Children are left
    /// to the caller.
    fn remove_objective(&mut self, id: &ObjectiveId) -> Result<Option<Objective>, OkrError>;

    /// Remove one key result with its links and initiatives.
    fn remove_key_result(&mut self, id: &KeyResultId) -> Result<Option<KeyResult>, OkrError>;

    // -------------------------------------------------------------------------
    // Append-only records
    // -------------------------------------------------------------------------

    fn append_snapshot(&mut self, snapshot: StatusSnapshot) -> Result<(), OkrError>;

    /// Snapshots of one entity, oldest first.
    fn snapshots(&self, entity_id: &str) -> Result<Vec<StatusSnapshot>, OkrError>;

    fn append_check_in(&mut self, check_in: CheckIn) -> Result<(), OkrError>;

    /// Check-ins of one key result, oldest first.
    fn check_ins(&self, id: &KeyResultId) -> Result<Vec<CheckIn>, OkrError>;
}
