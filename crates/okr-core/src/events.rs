//! # Activity Outbox
//!
//! Activity and audit notifications are side effects, not part of the
//! transactional core. Operations push [`ActivityEvent`]s into a
//! request-scoped [`Outbox`]; the outbox is drained into the registered
//! [`ActivitySink`]s only after the primary write and the rollup succeeded.
//!
//! A failing sink is logged and counted. It never fails the operation.

use crate::{EntityKind, TenantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// EVENTS
// =============================================================================

/// Named action recorded for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Completed,
    Cancelled,
    Published,
    Unpublished,
    StateChange,
    CheckedIn,
}

impl ActivityAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "CREATED",
            ActivityAction::Updated => "UPDATED",
            ActivityAction::Deleted => "DELETED",
            ActivityAction::Completed => "COMPLETED",
            ActivityAction::Cancelled => "CANCELLED",
            ActivityAction::Published => "PUBLISHED",
            ActivityAction::Unpublished => "UNPUBLISHED",
            ActivityAction::StateChange => "STATE_CHANGE",
            ActivityAction::CheckedIn => "CHECKED_IN",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A before/after notification for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub action: ActivityAction,
    pub entity: EntityKind,
    pub entity_id: String,
    pub tenant_id: Option<TenantId>,
    pub actor_id: UserId,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Build an event, serializing the before/after snapshots.
    ///
    /// A snapshot that fails to serialize is recorded as `null`; the event
    /// itself is never lost.
    pub fn new<T: Serialize>(
        action: ActivityAction,
        entity: EntityKind,
        entity_id: impl Into<String>,
        tenant_id: Option<TenantId>,
        actor_id: UserId,
        before: Option<&T>,
        after: Option<&T>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let snapshot = |value: Option<&T>| {
            value.map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
        };
        Self {
            action,
            entity,
            entity_id: entity_id.into(),
            tenant_id,
            actor_id,
            before: snapshot(before),
            after: snapshot(after),
            recorded_at,
        }
    }
}

// =============================================================================
// SINKS
// =============================================================================

/// Errors a sink may report. Logged, never propagated.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Receiver of activity notifications (activity feed, audit trail, ...).
pub trait ActivitySink {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn record(&self, event: &ActivityEvent) -> Result<(), SinkError>;
}

/// Emits every event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record(&self, event: &ActivityEvent) -> Result<(), SinkError> {
        tracing::info!(
            target: "okr_core::activity",
            action = event.action.as_str(),
            entity = %event.entity,
            entity_id = %event.entity_id,
            tenant = event.tenant_id.as_ref().map_or("<global>", TenantId::as_str),
            actor = %event.actor_id,
            "activity"
        );
        Ok(())
    }
}

// =============================================================================
// OUTBOX
// =============================================================================

/// Result of draining an outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Successful (event, sink) deliveries.
    pub delivered: usize,
    /// Failed (event, sink) deliveries.
    pub failed: usize,
}

/// Request-scoped queue of pending activity events.
///
/// Dropping an outbox without draining it discards its events, which is what
/// happens when the surrounding operation fails.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<ActivityEvent>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ActivityEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Deliver every event to every sink, in order.
    pub fn dispatch(self, sinks: &[Box<dyn ActivitySink>]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for event in &self.events {
            for sink in sinks {
                match sink.record(event) {
                    Ok(()) => summary.delivered += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::warn!(
                            target: "okr_core::activity",
                            sink = sink.name(),
                            action = event.action.as_str(),
                            entity_id = %event.entity_id,
                            "activity notification dropped: {}",
                            e
                        );
                    }
                }
            }
        }
        summary
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording(RefCell<Vec<ActivityAction>>);

    impl ActivitySink for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn record(&self, event: &ActivityEvent) -> Result<(), SinkError> {
            self.0.borrow_mut().push(event.action);
            Ok(())
        }
    }

    struct Broken;

    impl ActivitySink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn record(&self, _event: &ActivityEvent) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("audit store offline".into()))
        }
    }

    fn event(action: ActivityAction) -> ActivityEvent {
        ActivityEvent::new::<serde_json::Value>(
            action,
            EntityKind::Objective,
            "o1",
            Some(TenantId::new("org-a")),
            UserId::new("u1"),
            None,
            None,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn dispatch_counts_failures_without_stopping() {
        let mut outbox = Outbox::new();
        outbox.push(event(ActivityAction::Created));
        outbox.push(event(ActivityAction::Published));
        assert_eq!(outbox.len(), 2);

        let sinks: Vec<Box<dyn ActivitySink>> = vec![Box::new(Broken), Box::new(TracingSink)];
        let summary = outbox.dispatch(&sinks);
        assert_eq!(summary, DispatchSummary { delivered: 2, failed: 2 });
    }

    #[test]
    fn dispatch_preserves_order() {
        let recording = std::rc::Rc::new(Recording(RefCell::new(Vec::new())));

        struct Shared(std::rc::Rc<Recording>);
        impl ActivitySink for Shared {
            fn name(&self) -> &str {
                "shared"
            }
            fn record(&self, event: &ActivityEvent) -> Result<(), SinkError> {
                self.0.record(event)
            }
        }

        let mut outbox = Outbox::new();
        outbox.push(event(ActivityAction::Updated));
        outbox.push(event(ActivityAction::Deleted));
        let sinks: Vec<Box<dyn ActivitySink>> = vec![Box::new(Shared(recording.clone()))];
        outbox.dispatch(&sinks);

        assert_eq!(
            *recording.0.borrow(),
            vec![ActivityAction::Updated, ActivityAction::Deleted]
        );
    }

    #[test]
    fn snapshots_are_serialized() {
        let after = serde_json::json!({"progress": 60.0});
        let e = ActivityEvent::new(
            ActivityAction::Updated,
            EntityKind::Objective,
            "o1",
            None,
            UserId::new("u1"),
            None,
            Some(&after),
            DateTime::<Utc>::UNIX_EPOCH,
        );
        assert_eq!(e.after, Some(after));
        assert_eq!(e.before, None);
    }
}
