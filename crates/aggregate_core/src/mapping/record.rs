//! Column/value map exchanged with the data access strategy.

use super::{Identifier, MappingError, MappingResult};
use rusqlite::types::{FromSql, Value, ValueRef};
use std::collections::BTreeMap;

/// Ordered column values of one table row.
///
/// Columns are kept sorted so generated statements are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    table: String,
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Sets one column, replacing any previous value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.values.insert(column.to_string(), value.into());
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Decodes one column through rusqlite's `FromSql`.
    pub fn get<T: FromSql>(&self, column: &str) -> MappingResult<T> {
        let value = self
            .values
            .get(column)
            .ok_or_else(|| MappingError::MissingColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })?;

        T::column_result(ValueRef::from(value)).map_err(|err| MappingError::InvalidColumn {
            table: self.table.clone(),
            column: column.to_string(),
            message: err.to_string(),
        })
    }

    /// Reads a non-null identifier column.
    pub fn identifier(&self, column: &str) -> MappingResult<Identifier> {
        self.get::<Identifier>(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
