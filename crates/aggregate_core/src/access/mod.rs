//! Data access strategy: single-table storage primitives.
//!
//! # Responsibility
//! - Define the primitives the engine composes into aggregate operations.
//! - Keep SQL text and driver details out of the engine.
//!
//! # Invariants
//! - Each call touches exactly one table.
//! - Implementations never cascade; ordering is the engine's job.

use crate::db::DbResult;
use crate::mapping::{ChildTable, Identifier, Record, Table};

mod sqlite;

pub use sqlite::SqliteDataAccessStrategy;

/// Storage primitives consumed by the aggregate engine.
pub trait DataAccessStrategy {
    /// Inserts one row and returns its identifier.
    ///
    /// When `record` carries a non-null identifier column that value is used,
    /// otherwise the storage-generated identifier is returned.
    fn insert(&self, table: Table, record: &Record) -> DbResult<Identifier>;
    /// Updates one row by identifier. Returns `false` when no row matched.
    fn update(&self, table: Table, id: Identifier, record: &Record) -> DbResult<bool>;
    fn delete(&self, table: Table, id: Identifier) -> DbResult<usize>;
    fn delete_all(&self, table: Table) -> DbResult<usize>;
    fn delete_by_parent_id(&self, child: ChildTable, parent_id: Identifier) -> DbResult<usize>;
    fn find_by_id(&self, table: Table, id: Identifier) -> DbResult<Option<Record>>;
    /// All rows ordered by identifier.
    fn find_all(&self, table: Table) -> DbResult<Vec<Record>>;
    /// Rows whose identifier is in `ids`, ordered by identifier.
    fn find_all_by_id(&self, table: Table, ids: &[Identifier]) -> DbResult<Vec<Record>>;
    /// Child rows of one parent, ordered by key column when present.
    fn find_all_by_parent_id(
        &self,
        child: ChildTable,
        parent_id: Identifier,
    ) -> DbResult<Vec<Record>>;
    fn count(&self, table: Table) -> DbResult<u64>;
    fn exists_by_id(&self, table: Table, id: Identifier) -> DbResult<bool>;
}

impl<T: DataAccessStrategy + ?Sized> DataAccessStrategy for &T {
    fn insert(&self, table: Table, record: &Record) -> DbResult<Identifier> {
        (**self).insert(table, record)
    }

    fn update(&self, table: Table, id: Identifier, record: &Record) -> DbResult<bool> {
        (**self).update(table, id, record)
    }

    fn delete(&self, table: Table, id: Identifier) -> DbResult<usize> {
        (**self).delete(table, id)
    }

    fn delete_all(&self, table: Table) -> DbResult<usize> {
        (**self).delete_all(table)
    }

    fn delete_by_parent_id(&self, child: ChildTable, parent_id: Identifier) -> DbResult<usize> {
        (**self).delete_by_parent_id(child, parent_id)
    }

    fn find_by_id(&self, table: Table, id: Identifier) -> DbResult<Option<Record>> {
        (**self).find_by_id(table, id)
    }

    fn find_all(&self, table: Table) -> DbResult<Vec<Record>> {
        (**self).find_all(table)
    }

    fn find_all_by_id(&self, table: Table, ids: &[Identifier]) -> DbResult<Vec<Record>> {
        (**self).find_all_by_id(table, ids)
    }

    fn find_all_by_parent_id(
        &self,
        child: ChildTable,
        parent_id: Identifier,
    ) -> DbResult<Vec<Record>> {
        (**self).find_all_by_parent_id(child, parent_id)
    }

    fn count(&self, table: Table) -> DbResult<u64> {
        (**self).count(table)
    }

    fn exists_by_id(&self, table: Table, id: Identifier) -> DbResult<bool> {
        (**self).exists_by_id(table, id)
    }
}
