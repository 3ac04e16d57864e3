//! # CLI Command Implementations
//!
//! Each command runs one service call as the CLI actor and renders the
//! result as text or, with `--json`, as pretty JSON.

use super::CliService;
use crate::error::AppError;
use okr_core::{
    Actor, CheckInRequest, KeyResultId, LifecycleState, LockDecision, Objective, ObjectiveId,
    OkrStatus, RollupReport,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

// =============================================================================
// OUTPUT
// =============================================================================

fn emit(out: &mut dyn Write, text: &str) -> Result<(), AppError> {
    out.write_all(text.as_bytes()).map_err(AppError::Output)
}

fn emit_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), AppError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    emit(out, &text)
}

fn rollup_line(report: &RollupReport) -> String {
    format!(
        "Rollup:   {} visited, {} progress writes, {} status writes\n",
        report.visited, report.progress_writes, report.status_writes
    )
}

fn decision_label(decision: LockDecision) -> String {
    match decision {
        LockDecision::Unlocked => "unlocked".to_string(),
        LockDecision::Escalated(kind) => format!("escalated ({})", kind),
    }
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

#[derive(Serialize)]
struct LinkedKeyResultView {
    id: KeyResultId,
    title: String,
    weight: f64,
    progress: f64,
    status: OkrStatus,
    state: LifecycleState,
    version: u64,
}

#[derive(Serialize)]
struct ObjectiveView {
    #[serde(flatten)]
    objective: Objective,
    key_results: Vec<LinkedKeyResultView>,
}

/// List visible objectives as a parent/child tree.
pub fn cmd_show(
    service: &CliService,
    actor: &Actor,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let mut views = Vec::new();
    for objective in service.list_objectives(actor)? {
        let key_results = service
            .linked_key_results(actor, &objective.id)?
            .into_iter()
            .map(|(kr, weight)| LinkedKeyResultView {
                state: kr.effective_state(),
                id: kr.id,
                title: kr.title,
                weight,
                progress: kr.progress,
                status: kr.status,
                version: kr.version,
            })
            .collect();
        views.push(ObjectiveView {
            objective,
            key_results,
        });
    }

    if json {
        return emit_json(out, &views);
    }

    let mut text = format!("Objectives ({})\n", views.len());
    text.push_str("==============\n");

    let visible: BTreeSet<&ObjectiveId> = views.iter().map(|v| &v.objective.id).collect();
    let mut children: BTreeMap<Option<&ObjectiveId>, Vec<&ObjectiveView>> = BTreeMap::new();
    for view in &views {
        // Parents the actor cannot see are rendered as roots.
        let parent = view
            .objective
            .parent_id
            .as_ref()
            .filter(|p| visible.contains(p));
        children.entry(parent).or_default().push(view);
    }

    let mut stack: Vec<(&ObjectiveView, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|v| (*v, 0)).collect())
        .unwrap_or_default();
    let mut printed = BTreeSet::new();
    while let Some((view, depth)) = stack.pop() {
        let o = &view.objective;
        if !printed.insert(&o.id) {
            continue;
        }
        let indent = "  ".repeat(depth);
        text.push_str(&format!(
            "{}{} [{}] {} {:.1}%  {}\n",
            indent,
            o.id,
            o.effective_state(),
            o.status,
            o.progress,
            o.title
        ));
        for kr in &view.key_results {
            text.push_str(&format!(
                "{}  - {} [{}] {} {:.1}% (weight {}, v{})  {}\n",
                indent, kr.id, kr.state, kr.status, kr.progress, kr.weight, kr.version, kr.title
            ));
        }
        if let Some(kids) = children.get(&Some(&o.id)) {
            stack.extend(kids.iter().rev().map(|v| (*v, depth + 1)));
        }
    }
    emit(out, &text)
}

// =============================================================================
// ROLLUP COMMAND
// =============================================================================

/// Force a recomputation from `objective` to its root.
pub fn cmd_rollup(
    service: &mut CliService,
    actor: &Actor,
    json: bool,
    objective: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let id = ObjectiveId::new(objective);
    let outcome = service.recalculate(actor, &id)?;
    let after = service.get_objective(actor, &id)?;

    if json {
        return emit_json(
            out,
            &serde_json::json!({
                "objective": after,
                "rollup": outcome.rollup,
            }),
        );
    }

    let mut text = format!("Objective {}\n", after.id);
    text.push_str(&format!("Progress: {:.1}%\n", after.progress));
    text.push_str(&format!("Status:   {}\n", after.status));
    text.push_str(&rollup_line(&outcome.rollup));
    emit(out, &text)
}

// =============================================================================
// CHECK-IN COMMAND
// =============================================================================

/// Arguments of `okr check-in`.
#[derive(Debug, Clone)]
pub struct CheckInArgs {
    pub key_result: String,
    pub value: f64,
    pub expected_version: Option<u64>,
    pub status: Option<String>,
    pub note: Option<String>,
}

/// Record a key result value and print the cascaded result.
pub fn cmd_check_in(
    service: &mut CliService,
    actor: &Actor,
    json: bool,
    args: CheckInArgs,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let mut request = CheckInRequest::new(args.key_result.as_str(), args.value);
    if let Some(version) = args.expected_version {
        request = request.expecting_version(version);
    }
    if let Some(status) = &args.status {
        request = request.with_status(status.parse::<OkrStatus>()?);
    }
    if let Some(note) = args.note {
        request = request.with_note(note);
    }

    let outcome = service.check_in(actor, request)?;
    if json {
        return emit_json(out, &outcome);
    }

    let kr = &outcome.value;
    let mut text = format!("Key Result {}\n", kr.id);
    text.push_str(&format!(
        "Value:    {} (target {})\n",
        kr.current_value, kr.target_value
    ));
    text.push_str(&format!("Progress: {:.1}%\n", kr.progress));
    text.push_str(&format!("Status:   {}\n", kr.status));
    text.push_str(&format!("Version:  {}\n", kr.version));
    text.push_str(&rollup_line(&outcome.rollup));
    emit(out, &text)
}

// =============================================================================
// TRANSITION COMMAND
// =============================================================================

/// Move an objective or a key result to `to`.
pub fn cmd_transition(
    service: &mut CliService,
    actor: &Actor,
    json: bool,
    objective: Option<String>,
    key_result: Option<String>,
    to: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let to: LifecycleState = to.parse()?;

    let (id, state, status, rollup) = match (objective, key_result) {
        (Some(objective), _) => {
            let outcome = service.transition_objective(actor, &ObjectiveId::new(objective), to)?;
            if json {
                return emit_json(out, &outcome);
            }
            let o = &outcome.value;
            (o.id.to_string(), o.effective_state(), o.status, outcome.rollup)
        }
        (None, Some(key_result)) => {
            let outcome =
                service.transition_key_result(actor, &KeyResultId::new(key_result), to)?;
            if json {
                return emit_json(out, &outcome);
            }
            let kr = &outcome.value;
            (kr.id.to_string(), kr.effective_state(), kr.status, outcome.rollup)
        }
        (None, None) => {
            return Err(okr_core::OkrError::BadRequest(
                "transition needs --objective or --key-result".to_string(),
            )
            .into());
        }
    };

    let mut text = format!("{} -> {}\n", id, state);
    text.push_str(&format!("Status:   {}\n", status));
    text.push_str(&rollup_line(&rollup));
    emit(out, &text)
}

// =============================================================================
// LOCKS COMMAND
// =============================================================================

/// Report the lock decisions for editing `objective`.
pub fn cmd_locks(
    service: &CliService,
    actor: &Actor,
    json: bool,
    objective: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let report = service.lock_report(actor, &ObjectiveId::new(objective))?;
    if json {
        return emit_json(out, &report);
    }

    let mut text = format!("Locks for {}\n", objective);
    text.push_str(&format!("Cycle:    {}\n", decision_label(report.cycle)));
    text.push_str(&format!("Publish:  {}\n", decision_label(report.publish)));
    emit(out, &text)
}
