//! Aggregate persistence engine.
//!
//! # Responsibility
//! - Save, load and delete an aggregate root together with its owned
//!   children by composing data access primitives in dependency order.
//! - Assign generated identifiers back onto the in-memory graph.
//! - Publish before/after lifecycle events to the injected sink.
//!
//! # Invariants
//! - After a successful `save`, every entity in the graph carries the
//!   identifier of its persisted row.
//! - A child row exists iff its parent currently references it.
//! - The engine holds no state between calls and never begins transactions;
//!   callers wrap a call in `db::with_transaction` for all-or-nothing writes.

use crate::access::DataAccessStrategy;
use crate::events::{AggregateEvent, EventKind, EventSink};
use crate::mapping::{Entity, Identifier};
use log::{error, info};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

pub(crate) mod cascade;
mod error;

pub use error::{EngineError, EngineResult, ErrorKind};

/// Entry point for aggregate persistence.
///
/// Generic over the storage strategy and the event sink so callers can pass
/// owned values or references (both traits are implemented for `&T`).
pub struct AggregateTemplate<D, S> {
    access: D,
    sink: S,
}

impl<D: DataAccessStrategy, S: EventSink> AggregateTemplate<D, S> {
    pub fn new(access: D, sink: S) -> Self {
        Self { access, sink }
    }

    pub fn access(&self) -> &D {
        &self.access
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Inserts or updates `entity` and rewrites all of its owned children.
    ///
    /// Returns the root identifier, which is also assigned onto `entity`.
    ///
    /// # Errors
    /// - `OptimisticFailure` when an entity with an identifier has no row.
    /// - `Storage` when any primitive fails; earlier writes are left to the
    ///   caller's transaction.
    pub fn save<E: Entity>(&self, entity: &mut E) -> EngineResult<Identifier> {
        let table = E::entity_type().table();
        let op = Uuid::new_v4();
        self.run("aggregate_save", table.name, op, || {
            self.publish(
                EventKind::BeforeSave,
                op,
                table.name,
                entity.id(),
                Some(&*entity as &dyn Any),
            );

            let access = self.dyn_access();
            let record = cascade::record_of(&*entity);
            let id = match entity.id() {
                None => {
                    let id = access
                        .insert(table, &record)
                        .map_err(EngineError::storage(table.name, "insert", None))?;
                    entity.set_id(id);
                    id
                }
                Some(id) => {
                    let updated = access
                        .update(table, id, &record)
                        .map_err(EngineError::storage(table.name, "update", Some(id)))?;
                    if !updated {
                        return Err(EngineError::OptimisticFailure {
                            table: table.name,
                            identifier: id,
                            operation: "update",
                        });
                    }
                    id
                }
            };

            cascade::rewrite_relations(access, entity, id)?;

            self.publish(
                EventKind::AfterSave,
                op,
                table.name,
                Some(id),
                Some(&*entity as &dyn Any),
            );
            Ok(id)
        })
    }

    /// Loads one aggregate, or `None` when no row has `id`.
    pub fn find_by_id<E: Entity>(&self, id: Identifier) -> EngineResult<Option<E>> {
        let table = E::entity_type().table();
        self.run("aggregate_find_by_id", table.name, Uuid::new_v4(), || {
            let access = self.dyn_access();
            let record = access
                .find_by_id(table, id)
                .map_err(EngineError::storage(table.name, "find_by_id", Some(id)))?;
            record
                .map(|record| cascade::hydrate::<E>(access, &record))
                .transpose()
        })
    }

    /// Loads every aggregate of type `E`, ordered by identifier.
    pub fn find_all<E: Entity>(&self) -> EngineResult<Vec<E>> {
        let table = E::entity_type().table();
        self.run("aggregate_find_all", table.name, Uuid::new_v4(), || {
            let access = self.dyn_access();
            let records = access
                .find_all(table)
                .map_err(EngineError::storage(table.name, "find_all", None))?;
            records
                .iter()
                .map(|record| cascade::hydrate::<E>(access, record))
                .collect()
        })
    }

    /// Loads the aggregates whose identifiers appear in `ids`.
    ///
    /// Results follow the first occurrence of each identifier in `ids`.
    /// Unknown identifiers are skipped and duplicates yield one aggregate.
    pub fn find_all_by_id<E: Entity>(&self, ids: &[Identifier]) -> EngineResult<Vec<E>> {
        let table = E::entity_type().table();
        self.run("aggregate_find_all_by_id", table.name, Uuid::new_v4(), || {
            let mut seen = HashSet::with_capacity(ids.len());
            let requested: Vec<Identifier> =
                ids.iter().copied().filter(|id| seen.insert(*id)).collect();
            if requested.is_empty() {
                return Ok(Vec::new());
            }

            let access = self.dyn_access();
            let records = access
                .find_all_by_id(table, &requested)
                .map_err(EngineError::storage(table.name, "find_all_by_id", None))?;
            let mut by_id = HashMap::with_capacity(records.len());
            for record in records {
                by_id.insert(record.identifier(table.id_column)?, record);
            }

            requested
                .iter()
                .filter_map(|id| by_id.get(id))
                .map(|record| cascade::hydrate::<E>(access, record))
                .collect()
        })
    }

    /// Deletes `entity` and all of its owned children.
    ///
    /// # Errors
    /// - `IdentifierMissing` when `entity` was never saved; nothing is written.
    /// - `OptimisticFailure` when no root row has the entity's identifier.
    pub fn delete<E: Entity>(&self, entity: &E) -> EngineResult<()> {
        let table = E::entity_type().table();
        let id = entity
            .id()
            .ok_or(EngineError::IdentifierMissing { table: table.name })?;
        self.delete_root::<E>(id, Some(entity))
    }

    /// Deletes the aggregate stored under `id` and all of its owned children.
    pub fn delete_by_id<E: Entity>(&self, id: Identifier) -> EngineResult<()> {
        self.delete_root::<E>(id, None)
    }

    /// Deletes every aggregate of type `E`, one bulk delete per table.
    pub fn delete_all<E: Entity>(&self) -> EngineResult<()> {
        let table = E::entity_type().table();
        let op = Uuid::new_v4();
        self.run("aggregate_delete_all", table.name, op, || {
            self.publish(EventKind::BeforeDelete, op, table.name, None, None);
            cascade::delete_all::<E>(self.dyn_access(), &mut HashSet::new())?;
            self.publish(EventKind::AfterDelete, op, table.name, None, None);
            Ok(())
        })
    }

    pub fn exists_by_id<E: Entity>(&self, id: Identifier) -> EngineResult<bool> {
        let table = E::entity_type().table();
        self.access
            .exists_by_id(table, id)
            .map_err(EngineError::storage(table.name, "exists_by_id", Some(id)))
    }

    /// Number of rows in the root table of `E`.
    pub fn count<E: Entity>(&self) -> EngineResult<u64> {
        let table = E::entity_type().table();
        self.access
            .count(table)
            .map_err(EngineError::storage(table.name, "count", None))
    }

    fn delete_root<E: Entity>(&self, id: Identifier, entity: Option<&E>) -> EngineResult<()> {
        let entity_type = E::entity_type();
        let table = entity_type.table();
        let op = Uuid::new_v4();
        let as_any = entity.map(|entity| entity as &dyn Any);
        self.run("aggregate_delete", table.name, op, || {
            self.publish(EventKind::BeforeDelete, op, table.name, Some(id), as_any);

            let access = self.dyn_access();
            for relation in entity_type.relations() {
                relation.delete_owned(access, id)?;
            }
            let removed = access
                .delete(table, id)
                .map_err(EngineError::storage(table.name, "delete", Some(id)))?;
            if removed == 0 {
                return Err(EngineError::OptimisticFailure {
                    table: table.name,
                    identifier: id,
                    operation: "delete",
                });
            }

            self.publish(EventKind::AfterDelete, op, table.name, Some(id), as_any);
            Ok(())
        })
    }

    fn dyn_access(&self) -> &dyn DataAccessStrategy {
        &self.access
    }

    fn publish(
        &self,
        kind: EventKind,
        operation_id: Uuid,
        table: &'static str,
        identifier: Option<Identifier>,
        entity: Option<&dyn Any>,
    ) {
        self.sink.publish(&AggregateEvent {
            kind,
            operation_id,
            table,
            identifier,
            entity,
        });
    }

    fn run<T>(
        &self,
        event: &str,
        table: &str,
        op: Uuid,
        work: impl FnOnce() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let started_at = Instant::now();
        let result = work();
        match &result {
            Ok(_) => info!(
                "event={} module=engine status=ok op={} table={} duration_ms={}",
                event,
                op,
                table,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={} module=engine status=error op={} table={} duration_ms={} error_code={} error={}",
                event,
                op,
                table,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }
}
