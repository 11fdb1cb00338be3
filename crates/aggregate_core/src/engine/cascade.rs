//! Recursive traversal of owned relations.
//!
//! # Invariants
//! - Writes go parent first: a child row is inserted only after the row it
//!   references exists and its identifier is known.
//! - Deletes go children first: descendant rows disappear before the row
//!   they reference.
//! - Depth is unbounded; every level reuses the same functions through the
//!   child type's own relations. Row-driven walks end with the data, the
//!   table-wide walk of `delete_all` visits each table once.

use super::{EngineError, EngineResult};
use crate::access::DataAccessStrategy;
use crate::mapping::{ChildTable, Entity, Identifier, Record};
use log::debug;
use std::collections::HashSet;

/// Writes the plain columns of `entity` into a fresh record for its table.
pub(crate) fn record_of<E: Entity>(entity: &E) -> Record {
    let table = E::entity_type().table();
    let mut record = Record::new(table.name);
    entity.write_columns(&mut record);
    record
}

/// Replaces the persisted children of every relation of `entity`.
///
/// Each relation first drops all rows tied to `id`, then inserts the
/// currently referenced children. No diffing against stored state.
pub(crate) fn rewrite_relations<E: Entity>(
    access: &dyn DataAccessStrategy,
    entity: &mut E,
    id: Identifier,
) -> EngineResult<()> {
    for relation in E::entity_type().relations() {
        relation.delete_owned(access, id)?;
        relation.insert_owned(entity, id, access)?;
    }
    Ok(())
}

/// Inserts one owned child and, recursively, its own children.
pub(crate) fn insert_owned<C: Entity>(
    access: &dyn DataAccessStrategy,
    child_table: ChildTable,
    parent_id: Identifier,
    position: Option<usize>,
    child: &mut C,
) -> EngineResult<()> {
    let table = child_table.table;
    let mut record = record_of(child);
    if let Some(id) = child.id() {
        record.set(table.id_column, id);
    }
    record.set(child_table.back_reference, parent_id);
    if let (Some(key_column), Some(position)) = (child_table.key_column, position) {
        record.set(key_column, position as i64);
    }

    let id = access
        .insert(table, &record)
        .map_err(EngineError::storage(table.name, "insert", child.id()))?;
    child.set_id(id);
    debug!(
        "event=child_insert module=engine table={} id={} parent_id={}",
        table.name, id, parent_id
    );

    for relation in C::entity_type().relations() {
        relation.insert_owned(child, id, access)?;
    }
    Ok(())
}

/// Deletes all rows of `C` owned by `parent_id`, descendants first.
pub(crate) fn delete_owned<C: Entity>(
    access: &dyn DataAccessStrategy,
    child_table: ChildTable,
    parent_id: Identifier,
) -> EngineResult<()> {
    let entity_type = C::entity_type();
    let table = child_table.table;

    if entity_type.has_relations() {
        let rows = access
            .find_all_by_parent_id(child_table, parent_id)
            .map_err(EngineError::storage(table.name, "find_all_by_parent_id", Some(parent_id)))?;
        for row in rows {
            let child_id = row.identifier(table.id_column)?;
            for relation in entity_type.relations() {
                relation.delete_owned(access, child_id)?;
            }
        }
    }

    let removed = access
        .delete_by_parent_id(child_table, parent_id)
        .map_err(EngineError::storage(table.name, "delete_by_parent_id", Some(parent_id)))?;
    debug!(
        "event=child_delete module=engine table={} parent_id={} rows={}",
        table.name, parent_id, removed
    );
    Ok(())
}

/// Deletes every row of `C` and of all tables it owns, deepest first.
///
/// `cleared` holds the tables already visited in this call. A table is
/// cleared once, so types that own children of their own type terminate.
pub(crate) fn delete_all<C: Entity>(
    access: &dyn DataAccessStrategy,
    cleared: &mut HashSet<&'static str>,
) -> EngineResult<()> {
    let entity_type = C::entity_type();
    let table = entity_type.table();
    if !cleared.insert(table.name) {
        return Ok(());
    }

    for relation in entity_type.relations() {
        relation.delete_all_owned(access, cleared)?;
    }

    let removed = access
        .delete_all(table)
        .map_err(EngineError::storage(table.name, "delete_all", None))?;
    debug!(
        "event=table_clear module=engine table={} rows={}",
        table.name, removed
    );
    Ok(())
}

/// Builds one entity from its row and hydrates its relations.
pub(crate) fn hydrate<E: Entity>(
    access: &dyn DataAccessStrategy,
    record: &Record,
) -> EngineResult<E> {
    let entity_type = E::entity_type();
    let id = record.identifier(entity_type.table().id_column)?;
    let mut entity = E::read_columns(record)?;
    entity.set_id(id);

    for relation in entity_type.relations() {
        relation.load_owned(&mut entity, id, access)?;
    }
    Ok(entity)
}

/// Loads all children of `C` owned by `parent_id`, in storage order.
pub(crate) fn load_owned<C: Entity>(
    access: &dyn DataAccessStrategy,
    child_table: ChildTable,
    parent_id: Identifier,
) -> EngineResult<Vec<C>> {
    let table = child_table.table;
    let rows = access
        .find_all_by_parent_id(child_table, parent_id)
        .map_err(EngineError::storage(table.name, "find_all_by_parent_id", Some(parent_id)))?;

    rows.iter().map(|row| hydrate::<C>(access, row)).collect()
}
