//! Cascading recomputation of Objective progress and status.

use super::{aggregate_status, mean_progress, progress_changed, weighted_progress};
use crate::clock::Clock;
use crate::store::OkrStore;
use crate::{EntityKind, KeyResultId, Objective, ObjectiveId, OkrError, OkrStatus, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a recomputation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupReport {
    /// Objectives evaluated, counted once per cascade step.
    pub visited: usize,
    pub progress_writes: usize,
    pub status_writes: usize,
}

impl RollupReport {
    /// Accumulate another report into this one.
    pub fn merge(&mut self, other: RollupReport) {
        self.visited += other.visited;
        self.progress_writes += other.progress_writes;
        self.status_writes += other.status_writes;
    }

    /// `true` when nothing was written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.progress_writes == 0 && self.status_writes == 0
    }
}

/// Recomputes aggregates for an Objective and walks up to the root.
///
/// Both cascades are iterative and carry a visited set; a parent chain that
/// loops back fails with [`OkrError::HierarchyCycle`]. A parent id that
/// resolves to nothing fails with `NotFound`. Storage errors propagate.
pub struct RollupEngine<'a, S: OkrStore + ?Sized, C: Clock + ?Sized> {
    store: &'a mut S,
    clock: &'a C,
    trigger: &'a str,
}

impl<'a, S: OkrStore + ?Sized, C: Clock + ?Sized> RollupEngine<'a, S, C> {
    /// `trigger` labels the status snapshots this engine appends.
    pub fn new(store: &'a mut S, clock: &'a C, trigger: &'a str) -> Self {
        Self {
            store,
            clock,
            trigger,
        }
    }

    /// Progress cascade followed by status cascade.
    pub fn recalculate(&mut self, id: &ObjectiveId) -> Result<RollupReport, OkrError> {
        let mut report = self.recalculate_progress(id)?;
        report.merge(self.recalculate_status(id)?);
        Ok(report)
    }

    /// Run [`Self::recalculate`] for every Objective a Key Result is linked to.
    pub fn recalculate_for_key_result(
        &mut self,
        id: &KeyResultId,
    ) -> Result<RollupReport, OkrError> {
        let mut report = RollupReport::default();
        for objective_id in self.store.objectives_for_key_result(id)? {
            report.merge(self.recalculate(&objective_id)?);
        }
        Ok(report)
    }

    /// Recompute progress of `id` and every ancestor.
    ///
    /// The walk always continues to the root: an ancestor may be stale even
    /// when this node's value did not move.
    pub fn recalculate_progress(&mut self, id: &ObjectiveId) -> Result<RollupReport, OkrError> {
        let mut report = RollupReport::default();
        let mut visited = BTreeSet::new();
        let mut next = Some(id.clone());

        while let Some(current) = next {
            let objective = self.step(&mut visited, current)?;
            report.visited += 1;

            if let Some(progress) = self.aggregate_progress(&objective)? {
                if progress_changed(objective.progress, progress) {
                    self.store.set_objective_progress(&objective.id, progress)?;
                    report.progress_writes += 1;
                    tracing::debug!(
                        target: "okr_core::rollup",
                        objective = %objective.id,
                        from = objective.progress,
                        to = progress,
                        "progress updated"
                    );
                }
            }
            next = objective.parent_id;
        }
        Ok(report)
    }

    /// Recompute status of `id`, continuing to the parent only on change.
    ///
    /// Every change appends a [`StatusSnapshot`] carrying the current progress.
    pub fn recalculate_status(&mut self, id: &ObjectiveId) -> Result<RollupReport, OkrError> {
        let mut report = RollupReport::default();
        let mut visited = BTreeSet::new();
        let mut next = Some(id.clone());

        while let Some(current) = next {
            let objective = self.step(&mut visited, current)?;
            report.visited += 1;

            let statuses = self.child_statuses(&objective)?;
            let Some(status) = aggregate_status(&statuses) else {
                break;
            };
            if status == objective.status {
                break;
            }

            self.store.set_objective_status(&objective.id, status)?;
            self.store.append_snapshot(StatusSnapshot {
                entity_id: objective.id.to_string(),
                recorded_at: self.clock.now(),
                status,
                progress: Some(objective.progress),
                triggered_by: self.trigger.to_string(),
            })?;
            report.status_writes += 1;
            tracing::debug!(
                target: "okr_core::rollup",
                objective = %objective.id,
                from = %objective.status,
                to = %status,
                trigger = self.trigger,
                "status updated"
            );
            next = objective.parent_id;
        }
        Ok(report)
    }

    fn step(
        &self,
        visited: &mut BTreeSet<ObjectiveId>,
        id: ObjectiveId,
    ) -> Result<Objective, OkrError> {
        if visited.contains(&id) {
            tracing::warn!(target: "okr_core::rollup", objective = %id, "cyclic parent chain");
            return Err(OkrError::HierarchyCycle(id));
        }
        let objective = self
            .store
            .objective(&id)?
            .ok_or_else(|| OkrError::not_found(EntityKind::Objective, &id))?;
        visited.insert(id);
        Ok(objective)
    }

    /// Key Results take priority; child Objectives are the fallback. `None`
    /// leaves progress unchanged.
    fn aggregate_progress(&self, objective: &Objective) -> Result<Option<f64>, OkrError> {
        let linked = self.store.linked_key_results(&objective.id)?;
        if !linked.is_empty() {
            return Ok(weighted_progress(
                linked.iter().map(|(kr, weight)| (*weight, kr.progress)),
            ));
        }
        let children = self.store.children(&objective.id)?;
        Ok(mean_progress(children.iter().map(|c| c.progress)))
    }

    fn child_statuses(&self, objective: &Objective) -> Result<Vec<OkrStatus>, OkrError> {
        let linked = self.store.linked_key_results(&objective.id)?;
        if !linked.is_empty() {
            return Ok(linked.iter().map(|(kr, _)| kr.status).collect());
        }
        Ok(self
            .store
            .children(&objective.id)?
            .iter()
            .map(|c| c.status)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::primitives::TRIGGER_ROLLUP;
    use crate::store::MemoryStore;
    use crate::{KeyResult, MetricType, ObjectiveKeyResult, TenantId};

    fn tenant() -> Option<TenantId> {
        Some(TenantId::new("org-a"))
    }

    fn kr(store: &mut MemoryStore, id: &str, current: f64, status: OkrStatus) {
        let mut kr = KeyResult::new(id, id, "u1", tenant(), MetricType::Number, 0.0, 100.0);
        kr.current_value = current;
        kr.progress = kr.computed_progress();
        kr.status = status;
        store.insert_key_result(kr).expect("insert kr");
    }

    fn objective(store: &mut MemoryStore, id: &str, parent: Option<&str>) {
        let mut o = Objective::new(id, id, "u1", tenant());
        o.parent_id = parent.map(ObjectiveId::new);
        store.insert_objective(o).expect("insert objective");
    }

    fn link(store: &mut MemoryStore, o: &str, k: &str, weight: f64) {
        store
            .link(ObjectiveKeyResult::new(o, k).with_weight(weight))
            .expect("link");
    }

    fn progress(store: &MemoryStore, id: &str) -> f64 {
        store
            .objective(&ObjectiveId::new(id))
            .expect("lookup")
            .map(|o| o.progress)
            .unwrap_or(f64::NAN)
    }

    fn status(store: &MemoryStore, id: &str) -> OkrStatus {
        store
            .objective(&ObjectiveId::new(id))
            .expect("lookup")
            .map(|o| o.status)
            .unwrap_or_default()
    }

    /// root <- mid <- leaf, leaf has two key results.
    fn chain() -> MemoryStore {
        let mut store = MemoryStore::new();
        objective(&mut store, "root", None);
        objective(&mut store, "mid", Some("root"));
        objective(&mut store, "leaf", Some("mid"));
        kr(&mut store, "kr-a", 80.0, OkrStatus::OnTrack);
        kr(&mut store, "kr-b", 40.0, OkrStatus::OnTrack);
        link(&mut store, "leaf", "kr-a", 1.0);
        link(&mut store, "leaf", "kr-b", 1.0);
        store
    }

    #[test]
    fn progress_cascades_to_root() {
        let mut store = chain();
        let clock = FixedClock::at_epoch_seconds(0);
        let report = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_progress(&ObjectiveId::new("leaf"))
            .expect("rollup");

        assert_eq!(report.visited, 3);
        assert_eq!(report.progress_writes, 3);
        assert_eq!(progress(&store, "leaf"), 60.0);
        assert_eq!(progress(&store, "mid"), 60.0);
        assert_eq!(progress(&store, "root"), 60.0);
    }

    #[test]
    fn second_run_writes_nothing() {
        let mut store = chain();
        let clock = FixedClock::at_epoch_seconds(0);
        RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate(&ObjectiveId::new("leaf"))
            .expect("first");
        let writes = store.write_count();

        let report = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate(&ObjectiveId::new("leaf"))
            .expect("second");
        assert!(report.is_noop());
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn status_stops_when_unchanged() {
        let mut store = chain();
        kr(&mut store, "kr-c", 0.0, OkrStatus::OffTrack);
        link(&mut store, "leaf", "kr-c", 1.0);
        // mid already reports AT_RISK so the cascade stops there.
        let mut mid = store
            .objective(&ObjectiveId::new("mid"))
            .expect("lookup")
            .expect("mid");
        mid.status = OkrStatus::AtRisk;
        store.update_objective(mid).expect("update");

        let clock = FixedClock::at_epoch_seconds(42);
        let report = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_status(&ObjectiveId::new("leaf"))
            .expect("rollup");

        // 1 of 3 key results OFF_TRACK -> AT_RISK on leaf; mid already AT_RISK.
        assert_eq!(status(&store, "leaf"), OkrStatus::AtRisk);
        assert_eq!(report.status_writes, 1);
        assert_eq!(report.visited, 2);
        assert_eq!(status(&store, "root"), OkrStatus::OnTrack);

        let history = store.snapshots("leaf").expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].triggered_by, TRIGGER_ROLLUP);
        assert_eq!(history[0].recorded_at.timestamp(), 42);
    }

    #[test]
    fn key_results_take_priority_over_children() {
        let mut store = MemoryStore::new();
        objective(&mut store, "parent", None);
        objective(&mut store, "child", Some("parent"));
        let mut child = store
            .objective(&ObjectiveId::new("child"))
            .expect("lookup")
            .expect("child");
        child.progress = 10.0;
        store.update_objective(child).expect("update");
        kr(&mut store, "kr", 90.0, OkrStatus::OnTrack);
        link(&mut store, "parent", "kr", 1.0);

        let clock = FixedClock::at_epoch_seconds(0);
        RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_progress(&ObjectiveId::new("parent"))
            .expect("rollup");
        assert_eq!(progress(&store, "parent"), 90.0);
    }

    #[test]
    fn leaf_without_inputs_is_unchanged() {
        let mut store = MemoryStore::new();
        objective(&mut store, "lonely", None);
        let clock = FixedClock::at_epoch_seconds(0);
        let report = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate(&ObjectiveId::new("lonely"))
            .expect("rollup");
        assert!(report.is_noop());
        assert_eq!(progress(&store, "lonely"), 0.0);
    }

    #[test]
    fn cyclic_parent_chain_is_an_error() {
        let mut store = MemoryStore::new();
        objective(&mut store, "a", Some("b"));
        objective(&mut store, "b", Some("a"));
        let clock = FixedClock::at_epoch_seconds(0);
        let err = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_progress(&ObjectiveId::new("a"))
            .expect_err("cycle");
        assert_eq!(err, OkrError::HierarchyCycle(ObjectiveId::new("a")));
    }

    #[test]
    fn dangling_parent_is_not_found() {
        let mut store = MemoryStore::new();
        objective(&mut store, "orphan", Some("gone"));
        let clock = FixedClock::at_epoch_seconds(0);
        let err = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_progress(&ObjectiveId::new("orphan"))
            .expect_err("dangling");
        assert_eq!(err, OkrError::NotFound("objective 'gone'".to_string()));
    }

    #[test]
    fn shared_key_result_rolls_every_objective() {
        let mut store = MemoryStore::new();
        objective(&mut store, "o1", None);
        objective(&mut store, "o2", None);
        kr(&mut store, "shared", 50.0, OkrStatus::OnTrack);
        link(&mut store, "o1", "shared", 1.0);
        link(&mut store, "o2", "shared", 3.0);

        let clock = FixedClock::at_epoch_seconds(0);
        let report = RollupEngine::new(&mut store, &clock, TRIGGER_ROLLUP)
            .recalculate_for_key_result(&KeyResultId::new("shared"))
            .expect("rollup");
        assert_eq!(report.progress_writes, 2);
        assert_eq!(progress(&store, "o1"), 50.0);
        assert_eq!(progress(&store, "o2"), 50.0);
    }
}
