//! # Governance Scenario Tests (T0-T4)
//!
//! Each tier builds on the one before it. If any tier fails, writes can no
//! longer be trusted to respect isolation, lifecycle or rollup invariants.
//!
//! ## Tiers
//! - T0: Tenant isolation
//! - T1: Lifecycle transitions
//! - T2: Governance locks
//! - T3: Rollup arithmetic
//! - T4: Orchestrated operations

use okr_core::{
    Actor, ActivityEvent, ActivitySink, CheckInRequest, Cycle, CycleStatus, EntityKind, ErrorKind,
    FixedClock, Initiative, InitiativeId, InitiativeStatus, KeyResult, KeyResultId,
    LifecycleState, MemoryStore, MetricType, Objective, ObjectiveId, ObjectiveKeyResult,
    ObjectivePatch, OkrError, OkrService, OkrStatus, OkrStore, SinkError, StaticRbac, TenantId,
    TenantIdentity, TransitionValidator,
};

const ORG_A: &str = "org-a";

type Service = OkrService<MemoryStore, StaticRbac, FixedClock>;

fn org_a() -> Option<TenantId> {
    Some(TenantId::new(ORG_A))
}

fn member() -> Actor {
    Actor::tenant_user("alice", ORG_A)
}

fn lead() -> Actor {
    Actor::tenant_user("lead", ORG_A)
}

fn outsider() -> Actor {
    Actor::tenant_user("bob", "org-b")
}

fn superuser() -> Actor {
    Actor::new("root", TenantIdentity::Superuser)
}

fn service(store: MemoryStore) -> Service {
    OkrService::new(
        store,
        StaticRbac::new().with_elevated("lead"),
        FixedClock::at_epoch_seconds(1_700_000_000),
    )
}

fn add_objective(store: &mut MemoryStore, id: &str, parent: Option<&str>) {
    let mut objective = Objective::new(id, id, "alice", org_a());
    objective.parent_id = parent.map(ObjectiveId::new);
    store.insert_objective(objective).expect("insert objective");
}

fn add_key_result(store: &mut MemoryStore, id: &str, objective: &str) {
    let kr = KeyResult::new(id, id, "alice", org_a(), MetricType::Number, 0.0, 100.0);
    store.insert_key_result(kr).expect("insert key result");
    store
        .link(ObjectiveKeyResult::new(objective, id))
        .expect("link");
}

/// company <- team <- squad, squad measured by kr-a and kr-b.
fn okr_tree() -> MemoryStore {
    let mut store = MemoryStore::new();
    add_objective(&mut store, "company", None);
    add_objective(&mut store, "team", Some("company"));
    add_objective(&mut store, "squad", Some("team"));
    add_key_result(&mut store, "kr-a", "squad");
    add_key_result(&mut store, "kr-b", "squad");
    store
}

fn objective(svc: &Service, id: &str) -> Objective {
    svc.store()
        .objective(&ObjectiveId::new(id))
        .expect("lookup")
        .expect("present")
}

// =============================================================================
// TIER T0: TENANT ISOLATION
// =============================================================================

mod t0_tenant_isolation {
    use super::*;
    use okr_core::TenantGuard;

    /// T0.1: Global resources are immutable to tenant actors.
    #[test]
    fn global_resource_rejected() {
        let actor = TenantIdentity::Tenant(TenantId::new(ORG_A));
        assert!(TenantGuard::assert_same_tenant(None, &actor).is_err());
    }

    /// T0.2: Superusers are read-only even inside a tenant.
    #[test]
    fn superuser_rejected_on_tenant_resource() {
        let resource = TenantId::new(ORG_A);
        assert!(
            TenantGuard::assert_same_tenant(Some(&resource), &TenantIdentity::Superuser).is_err()
        );
    }

    /// T0.3: Same tenant passes.
    #[test]
    fn same_tenant_accepted() {
        let resource = TenantId::new(ORG_A);
        let actor = TenantIdentity::Tenant(TenantId::new(ORG_A));
        assert!(TenantGuard::assert_same_tenant(Some(&resource), &actor).is_ok());
    }

    /// T0.4: Cross-tenant reads look like missing records.
    #[test]
    fn cross_tenant_get_is_not_found() {
        let svc = service(okr_tree());
        let err = svc
            .get_objective(&outsider(), &ObjectiveId::new("company"))
            .expect_err("hidden");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(svc.get_objective(&superuser(), &ObjectiveId::new("company")).is_ok());
    }

    /// T0.5: Superusers may not create.
    #[test]
    fn superuser_cannot_create() {
        let mut svc = service(MemoryStore::new());
        let err = svc
            .create_objective(&superuser(), Objective::new("x", "X", "root", None))
            .expect_err("read-only");
        assert!(err.to_string().contains("SUPERUSER_MUTATION"));
        assert_eq!(svc.store().objective_count(), 0);
    }

    /// T0.6: Actors without a tenant see nothing.
    #[test]
    fn no_tenant_lists_nothing() {
        let svc = service(okr_tree());
        let nobody = Actor::new("ghost", TenantIdentity::NoTenant);
        assert!(svc.list_objectives(&nobody).expect("list").is_empty());
        assert_eq!(svc.list_objectives(&member()).expect("list").len(), 3);
        assert!(svc.list_objectives(&outsider()).expect("list").is_empty());
    }

    /// T0.7: A supplied tenant that differs from the actor's is rejected.
    #[test]
    fn create_for_other_tenant_rejected() {
        let mut svc = service(MemoryStore::new());
        let foreign = Objective::new("x", "X", "alice", Some(TenantId::new("org-b")));
        let err = svc.create_objective(&member(), foreign).expect_err("foreign");
        assert!(err.to_string().contains("CROSS_TENANT_ACCESS"));
    }
}

// =============================================================================
// TIER T1: LIFECYCLE TRANSITIONS
// =============================================================================

mod t1_lifecycle {
    use super::*;
    use okr_core::LifecycleState as L;

    /// T1.1: DRAFT -> ARCHIVED is illegal for both governed kinds.
    #[test]
    fn draft_to_archived_illegal() {
        for kind in [EntityKind::Objective, EntityKind::KeyResult] {
            let err = TransitionValidator::validate_lifecycle(kind, L::Draft, L::Archived)
                .expect_err("illegal");
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        }
    }

    /// T1.2: COMPLETED -> ARCHIVED is legal; ARCHIVED is terminal.
    #[test]
    fn completed_archives_and_archive_is_terminal() {
        let kind = EntityKind::Objective;
        assert!(TransitionValidator::validate_lifecycle(kind, L::Completed, L::Archived).is_ok());
        for to in LifecycleState::ALL {
            assert!(!TransitionValidator::is_legal(L::Archived, to));
        }
    }

    /// T1.3: Legacy records derive their lifecycle state.
    #[test]
    fn legacy_derivation() {
        assert_eq!(
            TransitionValidator::derive_legacy_state(OkrStatus::OnTrack, true),
            L::Published
        );
        assert_eq!(
            TransitionValidator::derive_legacy_state(OkrStatus::Completed, true),
            L::Completed
        );
    }

    /// T1.4: Completing an objective aligns its status and rolls up.
    #[test]
    fn completion_rolls_status_up() {
        let mut svc = service(okr_tree());
        let outcome = svc
            .transition_objective(&member(), &ObjectiveId::new("squad"), L::Completed)
            .expect("complete");

        assert_eq!(outcome.value.status, OkrStatus::Completed);
        assert_eq!(outcome.rollup.status_writes, 2);
        assert_eq!(objective(&svc, "team").status, OkrStatus::Completed);
        assert_eq!(objective(&svc, "company").status, OkrStatus::Completed);

        let history = svc
            .status_history(&member(), &ObjectiveId::new("squad"))
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].triggered_by, "transition");
    }

    /// T1.5: Illegal service transitions write nothing.
    #[test]
    fn illegal_transition_writes_nothing() {
        let mut svc = service(okr_tree());
        let writes = svc.store().write_count();
        let err = svc
            .transition_objective(&member(), &ObjectiveId::new("squad"), L::Archived)
            .expect_err("illegal");
        assert!(err.to_string().contains("DRAFT -> ARCHIVED"));
        assert_eq!(svc.store().write_count(), writes);
    }

    /// T1.6: Initiatives follow their own table.
    #[test]
    fn initiative_lifecycle() {
        let mut svc = service(okr_tree());
        let initiative = Initiative {
            id: InitiativeId::new("i1"),
            title: "Launch".to_string(),
            tenant_id: None,
            objective_id: Some(ObjectiveId::new("squad")),
            key_result_id: None,
            status: InitiativeStatus::Completed,
        };
        let created = svc
            .create_initiative(&member(), initiative)
            .expect("create");
        assert_eq!(created.value.status, InitiativeStatus::NotStarted);
        assert_eq!(created.value.tenant_id, org_a());

        let id = InitiativeId::new("i1");
        svc.transition_initiative(&member(), &id, InitiativeStatus::Blocked)
            .expect("block");
        assert!(
            svc.transition_initiative(&member(), &id, InitiativeStatus::NotStarted)
                .is_err()
        );
        svc.transition_initiative(&member(), &id, InitiativeStatus::Completed)
            .expect("complete");
        assert_eq!(
            svc.get_initiative(&member(), &id).expect("get").status,
            InitiativeStatus::Completed
        );
    }

    /// T1.7: An initiative needs exactly one parent.
    #[test]
    fn initiative_requires_single_parent() {
        let mut svc = service(okr_tree());
        let both = Initiative {
            id: InitiativeId::new("i2"),
            title: "Both".to_string(),
            tenant_id: None,
            objective_id: Some(ObjectiveId::new("squad")),
            key_result_id: Some(KeyResultId::new("kr-a")),
            status: InitiativeStatus::NotStarted,
        };
        let err = svc.create_initiative(&member(), both).expect_err("both");
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let neither = Initiative {
            id: InitiativeId::new("i3"),
            title: "Neither".to_string(),
            tenant_id: None,
            objective_id: None,
            key_result_id: None,
            status: InitiativeStatus::NotStarted,
        };
        assert!(svc.create_initiative(&member(), neither).is_err());
    }
}

// =============================================================================
// TIER T2: GOVERNANCE LOCKS
// =============================================================================

mod t2_governance_locks {
    use super::*;

    fn locked_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_cycle(Cycle::new("q1", "Q1", org_a(), CycleStatus::Locked))
            .expect("cycle");
        let objective = Objective::new("o", "Locked goal", "alice", org_a()).with_cycle("q1");
        store.insert_objective(objective).expect("objective");
        store
    }

    fn retitle() -> ObjectivePatch {
        ObjectivePatch {
            title: Some("Renamed".to_string()),
            ..ObjectivePatch::default()
        }
    }

    /// T2.1: A LOCKED cycle blocks updates without elevation.
    #[test]
    fn locked_cycle_blocks_member() {
        let mut svc = service(locked_store());
        let err = svc
            .update_objective(&member(), &ObjectiveId::new("o"), retitle())
            .expect_err("locked");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("cycle lock"));
    }

    /// T2.2: Elevated actors pass the cycle lock.
    #[test]
    fn locked_cycle_allows_elevated() {
        let mut svc = service(locked_store());
        let outcome = svc
            .update_objective(&lead(), &ObjectiveId::new("o"), retitle())
            .expect("elevated");
        assert_eq!(outcome.value.title, "Renamed");
        assert_eq!(outcome.value.version, 1);
    }

    /// T2.3: Creating inside a locked cycle is gated too.
    #[test]
    fn create_in_locked_cycle_requires_elevation() {
        let mut svc = service(locked_store());
        let fresh = || Objective::new("n", "New", "alice", None).with_cycle("q1");
        assert!(svc.create_objective(&member(), fresh()).is_err());
        assert!(svc.create_objective(&lead(), fresh()).is_ok());
    }

    /// T2.4: Once published, only an elevated actor can take it back to DRAFT.
    #[test]
    fn publish_lock_guards_unpublish() {
        let mut svc = service(okr_tree());
        let id = ObjectiveId::new("squad");

        let published = svc
            .transition_objective(&member(), &id, LifecycleState::Published)
            .expect("publish from draft");
        assert!(published.value.is_published);

        let err = svc
            .update_objective(&member(), &id, retitle())
            .expect_err("publish locked");
        assert!(err.to_string().contains("publish lock"));

        let writes = svc.store().write_count();
        let err = svc
            .transition_objective(&member(), &id, LifecycleState::Draft)
            .expect_err("member cannot unpublish");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("publish lock"));
        assert_eq!(svc.store().write_count(), writes);
        assert_eq!(objective(&svc, "squad").effective_state(), LifecycleState::Published);

        let unpublished = svc
            .transition_objective(&lead(), &id, LifecycleState::Draft)
            .expect("lead unpublishes");
        assert!(!unpublished.value.is_published);
        assert!(svc.update_objective(&member(), &id, retitle()).is_ok());
    }

    /// T2.5: A published key result is locked for check-ins and for leaving
    /// its state, unless elevated.
    #[test]
    fn published_key_result_check_in() {
        let mut svc = service(okr_tree());
        let kr = KeyResultId::new("kr-a");
        svc.transition_key_result(&member(), &kr, LifecycleState::Published)
            .expect("publish");

        assert!(svc.check_in(&member(), CheckInRequest::new("kr-a", 10.0)).is_err());
        assert!(svc.check_in(&lead(), CheckInRequest::new("kr-a", 10.0)).is_ok());

        let err = svc
            .transition_key_result(&member(), &kr, LifecycleState::Draft)
            .expect_err("member cannot unpublish");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(
            svc.transition_key_result(&member(), &kr, LifecycleState::Completed)
                .is_err()
        );
        let completed = svc
            .transition_key_result(&lead(), &kr, LifecycleState::Completed)
            .expect("lead completes");
        assert_eq!(completed.value.effective_state(), LifecycleState::Completed);

        assert!(
            svc.transition_key_result(&member(), &kr, LifecycleState::Archived)
                .is_err()
        );
        assert!(
            svc.transition_key_result(&lead(), &kr, LifecycleState::Archived)
                .is_ok()
        );
    }

    /// T2.6: Lock report shows escalation without writing.
    #[test]
    fn lock_report_is_read_only() {
        let svc = service(locked_store());
        let report = svc
            .lock_report(&lead(), &ObjectiveId::new("o"))
            .expect("report");
        assert!(report.cycle.is_escalated());
        assert!(!report.publish.is_escalated());
        assert!(svc.lock_report(&member(), &ObjectiveId::new("o")).is_err());
    }

    /// T2.7: Deleting a parent checks the locks of every descendant.
    #[test]
    fn cascade_delete_respects_descendant_locks() {
        let mut store = locked_store();
        add_objective(&mut store, "parent", None);
        let mut child = store
            .objective(&ObjectiveId::new("o"))
            .expect("lookup")
            .expect("present");
        child.parent_id = Some(ObjectiveId::new("parent"));
        child.state = Some(LifecycleState::Published);
        child.is_published = true;
        store.update_objective(child).expect("re-parent");
        let mut svc = service(store);

        let err = svc
            .delete_objective(&member(), &ObjectiveId::new("o"))
            .expect_err("direct delete locked");
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let writes = svc.store().write_count();
        let err = svc
            .delete_objective(&member(), &ObjectiveId::new("parent"))
            .expect_err("descendant locked");
        assert!(err.to_string().contains("cycle lock"));
        assert!(err.to_string().contains("'o'"));
        assert_eq!(svc.store().write_count(), writes);
        assert_eq!(svc.store().objective_count(), 2);

        let outcome = svc
            .delete_objective(&lead(), &ObjectiveId::new("parent"))
            .expect("elevated delete");
        assert_eq!(
            outcome.value,
            vec![ObjectiveId::new("o"), ObjectiveId::new("parent")]
        );
        assert_eq!(svc.store().objective_count(), 0);
    }
}

// =============================================================================
// TIER T3: ROLLUP ARITHMETIC
// =============================================================================

mod t3_rollup {
    use super::*;
    use okr_core::{aggregate_status, weighted_progress};

    /// T3.1: Equal weights average.
    #[test]
    fn weights_one_one() {
        assert_eq!(weighted_progress([(1.0, 80.0), (1.0, 40.0)]), Some(60.0));
    }

    /// T3.2: Half OFF_TRACK is OFF_TRACK; one OFF_TRACK alone too.
    #[test]
    fn off_track_thresholds() {
        use okr_core::OkrStatus::{OffTrack, OnTrack};
        assert_eq!(
            aggregate_status(&[OffTrack, OffTrack, OnTrack, OnTrack]),
            Some(OffTrack)
        );
        assert_eq!(aggregate_status(&[OffTrack]), Some(OffTrack));
    }

    /// T3.3: Re-running a rollup over an unchanged tree writes nothing.
    #[test]
    fn rerun_is_idempotent() {
        let mut svc = service(okr_tree());
        svc.check_in(&member(), CheckInRequest::new("kr-a", 50.0))
            .expect("check-in");
        let writes = svc.store().write_count();

        let outcome = svc
            .recalculate(&member(), &ObjectiveId::new("squad"))
            .expect("rollup");
        assert!(outcome.value.is_noop());
        assert_eq!(svc.store().write_count(), writes);
    }

    /// T3.4: Link weights skew the objective's progress.
    #[test]
    fn link_weight_changes_progress() {
        let mut svc = service(okr_tree());
        svc.check_in(&member(), CheckInRequest::new("kr-a", 100.0))
            .expect("check-in");
        assert_eq!(objective(&svc, "squad").progress, 50.0);

        svc.link_key_result(
            &member(),
            &ObjectiveId::new("squad"),
            &KeyResultId::new("kr-a"),
            3.0,
        )
        .expect("re-weight");
        assert_eq!(objective(&svc, "squad").progress, 75.0);

        svc.unlink_key_result(&member(), &ObjectiveId::new("squad"), &KeyResultId::new("kr-b"))
            .expect("unlink");
        assert_eq!(objective(&svc, "squad").progress, 100.0);
    }
}

// =============================================================================
// TIER T4: ORCHESTRATED OPERATIONS
// =============================================================================

mod t4_orchestration {
    use super::*;

    struct Broken;

    impl ActivitySink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn record(&self, _event: &ActivityEvent) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("audit offline".to_string()))
        }
    }

    /// T4.1: A check-in moves progress on its objective and every ancestor.
    #[test]
    fn check_in_cascades_to_root() {
        let mut svc = service(okr_tree());
        let outcome = svc
            .check_in(&member(), CheckInRequest::new("kr-a", 80.0).with_note("good week"))
            .expect("check-in");

        assert_eq!(outcome.value.progress, 80.0);
        assert_eq!(outcome.value.version, 1);
        assert_eq!(outcome.rollup.progress_writes, 3);
        for id in ["squad", "team", "company"] {
            assert_eq!(objective(&svc, id).progress, 40.0);
        }

        let history = svc
            .check_in_history(&member(), &KeyResultId::new("kr-a"))
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_value, 0.0);
        assert_eq!(history[0].new_value, 80.0);
        assert_eq!(history[0].note.as_deref(), Some("good week"));
    }

    /// T4.2: A reported status rolls up and leaves snapshots.
    #[test]
    fn check_in_status_rolls_up() {
        let mut svc = service(okr_tree());
        svc.check_in(
            &member(),
            CheckInRequest::new("kr-a", 5.0).with_status(OkrStatus::OffTrack),
        )
        .expect("check-in");

        // 1 of 2 key results OFF_TRACK hits the inclusive half threshold.
        for id in ["squad", "team", "company"] {
            assert_eq!(objective(&svc, id).status, OkrStatus::OffTrack);
        }
        let history = svc
            .status_history(&member(), &ObjectiveId::new("company"))
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].triggered_by, "check_in");
        assert_eq!(history[0].recorded_at.timestamp(), 1_700_000_000);
    }

    /// T4.3: Deleting an objective re-rolls its former parent.
    #[test]
    fn delete_rerolls_former_parent() {
        let mut store = MemoryStore::new();
        add_objective(&mut store, "parent", None);
        add_objective(&mut store, "a", Some("parent"));
        add_objective(&mut store, "b", Some("parent"));
        add_objective(&mut store, "b-child", Some("b"));
        add_key_result(&mut store, "kr-a", "a");
        add_key_result(&mut store, "kr-b", "b");
        let mut svc = service(store);

        svc.check_in(&member(), CheckInRequest::new("kr-a", 80.0))
            .expect("a");
        svc.check_in(&member(), CheckInRequest::new("kr-b", 20.0))
            .expect("b");
        assert_eq!(objective(&svc, "parent").progress, 50.0);

        let outcome = svc
            .delete_objective(&member(), &ObjectiveId::new("b"))
            .expect("delete");
        assert_eq!(
            outcome.value,
            vec![ObjectiveId::new("b-child"), ObjectiveId::new("b")]
        );
        assert_eq!(objective(&svc, "parent").progress, 80.0);
        assert_eq!(svc.store().objective_count(), 2);
    }

    /// T4.4: A cyclic parent chain is reported, not looped on.
    #[test]
    fn cyclic_chain_is_reported() {
        let mut store = MemoryStore::new();
        add_objective(&mut store, "x", Some("y"));
        add_objective(&mut store, "y", Some("x"));
        let mut svc = service(store);

        let err = svc
            .recalculate(&member(), &ObjectiveId::new("x"))
            .expect_err("cycle");
        assert_eq!(err, OkrError::HierarchyCycle(ObjectiveId::new("x")));
    }

    /// T4.5: Re-parenting under a descendant is rejected.
    #[test]
    fn reparent_under_descendant_rejected() {
        let mut svc = service(okr_tree());
        let patch = ObjectivePatch {
            parent_id: Some(Some(ObjectiveId::new("squad"))),
            ..ObjectivePatch::default()
        };
        let err = svc
            .update_objective(&member(), &ObjectiveId::new("company"), patch)
            .expect_err("cycle");
        assert!(matches!(err, OkrError::HierarchyCycle(_)));
    }

    /// T4.6: A failing sink never fails the mutation.
    #[test]
    fn failing_sink_is_swallowed() {
        let mut svc = service(MemoryStore::new()).with_sink(Broken);
        let outcome = svc
            .create_objective(&member(), Objective::new("n", "New", "alice", None))
            .expect("create");
        assert_eq!(outcome.dispatch.failed, 1);
        assert_eq!(outcome.dispatch.delivered, 0);
        assert_eq!(outcome.value.tenant_id, org_a());
        assert_eq!(outcome.value.state, Some(LifecycleState::Draft));
    }

    /// T4.7: A stale version token conflicts before any write.
    #[test]
    fn stale_version_conflicts() {
        let mut svc = service(okr_tree());
        let writes = svc.store().write_count();
        let err = svc
            .check_in(&member(), CheckInRequest::new("kr-a", 30.0).expecting_version(7))
            .expect_err("stale");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(svc.store().write_count(), writes);

        assert!(
            svc.check_in(&member(), CheckInRequest::new("kr-a", 30.0).expecting_version(0))
                .is_ok()
        );
    }

    /// T4.8: Non-finite check-in values are rejected.
    #[test]
    fn non_finite_value_rejected() {
        let mut svc = service(okr_tree());
        let err = svc
            .check_in(&member(), CheckInRequest::new("kr-a", f64::NAN))
            .expect_err("nan");
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    /// T4.9: Deleting a key result re-rolls every linked objective.
    #[test]
    fn delete_key_result_rerolls() {
        let mut svc = service(okr_tree());
        svc.check_in(&member(), CheckInRequest::new("kr-a", 60.0))
            .expect("check-in");
        assert_eq!(objective(&svc, "squad").progress, 30.0);

        svc.delete_key_result(&member(), &KeyResultId::new("kr-b"))
            .expect("delete");
        assert_eq!(objective(&svc, "squad").progress, 60.0);
        assert_eq!(objective(&svc, "company").progress, 60.0);
    }

    /// T4.10: A new key result linked on creation rolls up immediately.
    #[test]
    fn create_linked_key_result() {
        let mut svc = service(okr_tree());
        let mut kr = KeyResult::new("kr-c", "Done", "alice", None, MetricType::Boolean, 0.0, 1.0);
        kr.current_value = 1.0;
        let outcome = svc
            .create_key_result(&member(), kr, Some((ObjectiveId::new("squad"), 2.0)))
            .expect("create");

        assert_eq!(outcome.value.progress, 100.0);
        // (0 + 0 + 2 * 100) / 4
        assert_eq!(objective(&svc, "squad").progress, 50.0);
    }
}
