//! Lifecycle notifications emitted by the aggregate engine.
//!
//! # Responsibility
//! - Define the before/after save and delete event contract.
//! - Provide sinks for no-op, log-based and in-memory recording delivery.
//!
//! # Invariants
//! - Sinks are observers only; they cannot veto or alter persistence.
//! - The engine receives its sink at construction, never from global state.
//! - One engine call publishes its before/after pair under one operation id.

use crate::mapping::Identifier;
use log::info;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Lifecycle point of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BeforeSave,
    AfterSave,
    BeforeDelete,
    AfterDelete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeSave => "before_save",
            Self::AfterSave => "after_save",
            Self::BeforeDelete => "before_delete",
            Self::AfterDelete => "after_delete",
        }
    }
}

/// One notification, borrowing the entity for the duration of `publish`.
#[derive(Clone, Copy)]
pub struct AggregateEvent<'a> {
    pub kind: EventKind,
    pub operation_id: Uuid,
    /// Root table of the aggregate.
    pub table: &'static str,
    /// `None` before the first insert and for table-wide deletes.
    pub identifier: Option<Identifier>,
    /// `None` for deletes addressed by identifier or table-wide deletes.
    pub entity: Option<&'a dyn Any>,
}

impl<'a> AggregateEvent<'a> {
    /// Downcasts the carried entity.
    pub fn entity_as<T: 'static>(&self) -> Option<&'a T> {
        self.entity.and_then(|entity| entity.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for AggregateEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateEvent")
            .field("kind", &self.kind)
            .field("operation_id", &self.operation_id)
            .field("table", &self.table)
            .field("identifier", &self.identifier)
            .field("has_entity", &self.entity.is_some())
            .finish()
    }
}

/// Receiver of engine lifecycle events.
pub trait EventSink {
    fn publish(&self, event: &AggregateEvent<'_>);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn publish(&self, event: &AggregateEvent<'_>) {
        (**self).publish(event);
    }
}

/// Delivers to both sinks, first `A` then `B`.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn publish(&self, event: &AggregateEvent<'_>) {
        self.0.publish(event);
        self.1.publish(event);
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: &AggregateEvent<'_>) {}
}

/// Writes one metadata-only log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn publish(&self, event: &AggregateEvent<'_>) {
        info!(
            "event=aggregate_event module=events kind={} op={} table={} id={}",
            event.kind.as_str(),
            event.operation_id,
            event.table,
            event
                .identifier
                .map_or_else(|| "none".to_string(), |id| id.to_string())
        );
    }
}

/// Owned snapshot of one published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub operation_id: Uuid,
    pub table: String,
    pub identifier: Option<Identifier>,
    pub had_entity: bool,
}

impl From<&AggregateEvent<'_>> for RecordedEvent {
    fn from(event: &AggregateEvent<'_>) -> Self {
        Self {
            kind: event.kind,
            operation_id: event.operation_id,
            table: event.table.to_string(),
            identifier: event.identifier,
            had_entity: event.entity.is_some(),
        }
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events published so far, in publish order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|event| event.kind).collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &AggregateEvent<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent::from(event));
    }
}
