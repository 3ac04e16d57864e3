//! In-memory arena store.
//!
//! Uses `BTreeMap` exclusively so iteration order, and therefore rollup and
//! serialization order, is deterministic.

use super::OkrStore;
use crate::{
    CheckIn, Cycle, CycleId, EntityKind, Initiative, InitiativeId, KeyResult, KeyResultId,
    Objective, ObjectiveId, ObjectiveKeyResult, OkrError, OkrStatus, StatusSnapshot, TenantFilter,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arena of OKR records indexed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objectives: BTreeMap<ObjectiveId, Objective>,
    key_results: BTreeMap<KeyResultId, KeyResult>,
    /// (objective, key result) -> weight
    links: BTreeMap<(ObjectiveId, KeyResultId), f64>,
    cycles: BTreeMap<CycleId, Cycle>,
    initiatives: BTreeMap<InitiativeId, Initiative>,
    snapshots: Vec<StatusSnapshot>,
    check_ins: Vec<CheckIn>,
    /// Number of mutating calls since creation.
    writes: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutating calls performed so far. A rollup over an unchanged tree must
    /// leave this untouched.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    #[must_use]
    pub fn objective_count(&self) -> usize {
        self.objectives.len()
    }

    #[must_use]
    pub fn key_result_count(&self) -> usize {
        self.key_results.len()
    }

    fn bump(&mut self) {
        self.writes = self.writes.saturating_add(1);
    }

    fn drop_initiatives(&mut self, matches: impl Fn(&Initiative) -> bool) {
        self.initiatives.retain(|_, i| !matches(i));
    }
}

impl OkrStore for MemoryStore {
    fn objective(&self, id: &ObjectiveId) -> Result<Option<Objective>, OkrError> {
        Ok(self.objectives.get(id).cloned())
    }

    fn key_result(&self, id: &KeyResultId) -> Result<Option<KeyResult>, OkrError> {
        Ok(self.key_results.get(id).cloned())
    }

    fn cycle(&self, id: &CycleId) -> Result<Option<Cycle>, OkrError> {
        Ok(self.cycles.get(id).cloned())
    }

    fn initiative(&self, id: &InitiativeId) -> Result<Option<Initiative>, OkrError> {
        Ok(self.initiatives.get(id).cloned())
    }

    fn objectives(&self, filter: &TenantFilter) -> Result<Vec<Objective>, OkrError> {
        Ok(self
            .objectives
            .values()
            .filter(|o| filter.admits(o.tenant_id.as_ref()))
            .cloned()
            .collect())
    }

    fn children(&self, id: &ObjectiveId) -> Result<Vec<Objective>, OkrError> {
        Ok(self
            .objectives
            .values()
            .filter(|o| o.parent_id.as_ref() == Some(id))
            .cloned()
            .collect())
    }

    fn linked_key_results(&self, id: &ObjectiveId) -> Result<Vec<(KeyResult, f64)>, OkrError> {
        Ok(self
            .links
            .iter()
            .filter(|((objective_id, _), _)| objective_id == id)
            .filter_map(|((_, kr_id), weight)| {
                self.key_results.get(kr_id).map(|kr| (kr.clone(), *weight))
            })
            .collect())
    }

    fn objectives_for_key_result(&self, id: &KeyResultId) -> Result<Vec<ObjectiveId>, OkrError> {
        Ok(self
            .links
            .keys()
            .filter(|(_, kr_id)| kr_id == id)
            .map(|(objective_id, _)| objective_id.clone())
            .collect())
    }

    fn insert_objective(&mut self, objective: Objective) -> Result<(), OkrError> {
        self.objectives.insert(objective.id.clone(), objective);
        self.bump();
        Ok(())
    }

    fn insert_key_result(&mut self, key_result: KeyResult) -> Result<(), OkrError> {
        self.key_results.insert(key_result.id.clone(), key_result);
        self.bump();
        Ok(())
    }

    fn insert_cycle(&mut self, cycle: Cycle) -> Result<(), OkrError> {
        self.cycles.insert(cycle.id.clone(), cycle);
        self.bump();
        Ok(())
    }

    fn insert_initiative(&mut self, initiative: Initiative) -> Result<(), OkrError> {
        self.initiatives.insert(initiative.id.clone(), initiative);
        self.bump();
        Ok(())
    }

    fn update_objective(&mut self, objective: Objective) -> Result<(), OkrError> {
        let slot = self
            .objectives
            .get_mut(&objective.id)
            .ok_or_else(|| OkrError::not_found(EntityKind::Objective, &objective.id))?;
        *slot = objective;
        self.bump();
        Ok(())
    }

    fn update_key_result(&mut self, key_result: KeyResult) -> Result<(), OkrError> {
        let slot = self
            .key_results
            .get_mut(&key_result.id)
            .ok_or_else(|| OkrError::not_found(EntityKind::KeyResult, &key_result.id))?;
        *slot = key_result;
        self.bump();
        Ok(())
    }

    fn update_initiative(&mut self, initiative: Initiative) -> Result<(), OkrError> {
        let slot = self
            .initiatives
            .get_mut(&initiative.id)
            .ok_or_else(|| OkrError::not_found(EntityKind::Initiative, &initiative.id))?;
        *slot = initiative;
        self.bump();
        Ok(())
    }

    fn set_objective_progress(&mut self, id: &ObjectiveId, progress: f64) -> Result<(), OkrError> {
        let objective = self
            .objectives
            .get_mut(id)
            .ok_or_else(|| OkrError::not_found(EntityKind::Objective, id))?;
        objective.progress = progress;
        self.bump();
        Ok(())
    }

    fn set_objective_status(
        &mut self,
        id: &ObjectiveId,
        status: OkrStatus,
    ) -> Result<(), OkrError> {
        let objective = self
            .objectives
            .get_mut(id)
            .ok_or_else(|| OkrError::not_found(EntityKind::Objective, id))?;
        objective.status = status;
        self.bump();
        Ok(())
    }

    fn link(&mut self, link: ObjectiveKeyResult) -> Result<(), OkrError> {
        if !self.objectives.contains_key(&link.objective_id) {
            return Err(OkrError::not_found(EntityKind::Objective, &link.objective_id));
        }
        if !self.key_results.contains_key(&link.key_result_id) {
            return Err(OkrError::not_found(EntityKind::KeyResult, &link.key_result_id));
        }
        self.links
            .insert((link.objective_id, link.key_result_id), link.weight);
        self.bump();
        Ok(())
    }

    fn unlink(
        &mut self,
        objective_id: &ObjectiveId,
        key_result_id: &KeyResultId,
    ) -> Result<bool, OkrError> {
        let removed = self
            .links
            .remove(&(objective_id.clone(), key_result_id.clone()))
            .is_some();
        if removed {
            self.bump();
        }
        Ok(removed)
    }

    fn remove_objective(&mut self, id: &ObjectiveId) -> Result<Option<Objective>, OkrError> {
        let Some(objective) = self.objectives.remove(id) else {
            return Ok(None);
        };
        self.links.retain(|(objective_id, _), _| objective_id != id);
        self.drop_initiatives(|i| i.objective_id.as_ref() == Some(id));
        self.bump();
        Ok(Some(objective))
    }

    fn remove_key_result(&mut self, id: &KeyResultId) -> Result<Option<KeyResult>, OkrError> {
        let Some(key_result) = self.key_results.remove(id) else {
            return Ok(None);
        };
        self.links.retain(|(_, kr_id), _| kr_id != id);
        self.drop_initiatives(|i| i.key_result_id.as_ref() == Some(id));
        self.bump();
        Ok(Some(key_result))
    }

    fn append_snapshot(&mut self, snapshot: StatusSnapshot) -> Result<(), OkrError> {
        self.snapshots.push(snapshot);
        self.bump();
        Ok(())
    }

    fn snapshots(&self, entity_id: &str) -> Result<Vec<StatusSnapshot>, OkrError> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| s.entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn append_check_in(&mut self, check_in: CheckIn) -> Result<(), OkrError> {
        self.check_ins.push(check_in);
        self.bump();
        Ok(())
    }

    fn check_ins(&self, id: &KeyResultId) -> Result<Vec<CheckIn>, OkrError> {
        Ok(self
            .check_ins
            .iter()
            .filter(|c| &c.key_result_id == id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Flat, serde-friendly form of a [`MemoryStore`] (the CLI data file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableStore {
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    #[serde(default)]
    pub links: Vec<ObjectiveKeyResult>,
    #[serde(default)]
    pub initiatives: Vec<Initiative>,
    #[serde(default)]
    pub snapshots: Vec<StatusSnapshot>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
}

impl From<&MemoryStore> for SerializableStore {
    fn from(store: &MemoryStore) -> Self {
        Self {
            cycles: store.cycles.values().cloned().collect(),
            objectives: store.objectives.values().cloned().collect(),
            key_results: store.key_results.values().cloned().collect(),
            links: store
                .links
                .iter()
                .map(|((objective_id, key_result_id), weight)| ObjectiveKeyResult {
                    objective_id: objective_id.clone(),
                    key_result_id: key_result_id.clone(),
                    weight: *weight,
                })
                .collect(),
            initiatives: store.initiatives.values().cloned().collect(),
            snapshots: store.snapshots.clone(),
            check_ins: store.check_ins.clone(),
        }
    }
}

impl From<SerializableStore> for MemoryStore {
    /// Loading does not count as writes. Links whose ends are missing are
    /// dropped.
    fn from(data: SerializableStore) -> Self {
        let mut store = MemoryStore::new();
        store.cycles = data.cycles.into_iter().map(|c| (c.id.clone(), c)).collect();
        store.objectives = data
            .objectives
            .into_iter()
            .map(|o| (o.id.clone(), o))
            .collect();
        store.key_results = data
            .key_results
            .into_iter()
            .map(|kr| (kr.id.clone(), kr))
            .collect();
        store.initiatives = data
            .initiatives
            .into_iter()
            .map(|i| (i.id.clone(), i))
            .collect();
        for link in data.links {
            if store.objectives.contains_key(&link.objective_id)
                && store.key_results.contains_key(&link.key_result_id)
            {
                store
                    .links
                    .insert((link.objective_id, link.key_result_id), link.weight);
            }
        }
        store.snapshots = data.snapshots;
        store.check_ins = data.check_ins;
        store
    }
}

// =============================================================================
// TESTS
// =============================================================================
