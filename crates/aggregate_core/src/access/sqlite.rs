//! SQLite implementation of the storage primitives.
//!
//! # Invariants
//! - Table and column names are validated before they reach SQL text and
//!   are always double-quoted.
//! - Values are always bound as parameters.
//! - The strategy borrows a connection; a `rusqlite::Transaction` works too,
//!   which is how callers scope one engine call in a transaction.

use super::DataAccessStrategy;
use crate::db::{DbError, DbResult};
use crate::mapping::{ChildTable, Identifier, Record, Table};
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Params};

/// Bound parameters per `IN (...)` statement.
const IN_CHUNK_SIZE: usize = 500;

static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// SQLite-backed data access strategy.
pub struct SqliteDataAccessStrategy<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDataAccessStrategy<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }

    fn query_records(
        &self,
        table: &str,
        sql: &str,
        params: impl Params,
    ) -> DbResult<Vec<Record>> {
        trace!("event=sql_query module=access table={table}");
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new(table);
            for (index, column) in columns.iter().enumerate() {
                record.set(column, row.get::<_, Value>(index)?);
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl DataAccessStrategy for SqliteDataAccessStrategy<'_> {
    fn insert(&self, table: Table, record: &Record) -> DbResult<Identifier> {
        let table_name = quote(table.name)?;
        let mut columns = Vec::with_capacity(record.len());
        let mut placeholders = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (index, (column, value)) in record.columns().enumerate() {
            columns.push(quote(column)?);
            placeholders.push(format!("?{}", index + 1));
            values.push(value.clone());
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {table_name} DEFAULT VALUES;")
        } else {
            format!(
                "INSERT INTO {table_name} ({}) VALUES ({});",
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        trace!("event=sql_exec module=access op=insert table={}", table.name);
        self.conn.execute(&sql, params_from_iter(values))?;

        match record.value(table.id_column) {
            Some(Value::Integer(id)) => Ok(*id),
            _ => Ok(self.conn.last_insert_rowid()),
        }
    }

    fn update(&self, table: Table, id: Identifier, record: &Record) -> DbResult<bool> {
        let id_column = quote(table.id_column)?;
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (column, value) in record.columns() {
            if column == table.id_column {
                continue;
            }
            values.push(value.clone());
            assignments.push(format!("{} = ?{}", quote(column)?, values.len()));
        }
        if assignments.is_empty() {
            // Nothing to change, but the row must still exist.
            assignments.push(format!("{id_column} = {id_column}"));
        }
        values.push(Value::Integer(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE {id_column} = ?{};",
            quote(table.name)?,
            assignments.join(", "),
            values.len()
        );
        trace!("event=sql_exec module=access op=update table={}", table.name);
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }

    fn delete(&self, table: Table, id: Identifier) -> DbResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1;",
            quote(table.name)?,
            quote(table.id_column)?
        );
        trace!("event=sql_exec module=access op=delete table={}", table.name);
        Ok(self.conn.execute(&sql, [id])?)
    }

    fn delete_all(&self, table: Table) -> DbResult<usize> {
        let sql = format!("DELETE FROM {};", quote(table.name)?);
        trace!("event=sql_exec module=access op=delete_all table={}", table.name);
        Ok(self.conn.execute(&sql, [])?)
    }

    fn delete_by_parent_id(&self, child: ChildTable, parent_id: Identifier) -> DbResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1;",
            quote(child.table.name)?,
            quote(child.back_reference)?
        );
        trace!(
            "event=sql_exec module=access op=delete_by_parent_id table={}",
            child.table.name
        );
        Ok(self.conn.execute(&sql, [parent_id])?)
    }

    fn find_by_id(&self, table: Table, id: Identifier) -> DbResult<Option<Record>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1;",
            quote(table.name)?,
            quote(table.id_column)?
        );
        let mut records = self.query_records(table.name, &sql, [id])?;
        Ok(records.pop())
    }

    fn find_all(&self, table: Table) -> DbResult<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} ASC;",
            quote(table.name)?,
            quote(table.id_column)?
        );
        self.query_records(table.name, &sql, [])
    }

    fn find_all_by_id(&self, table: Table, ids: &[Identifier]) -> DbResult<Vec<Record>> {
        let table_name = quote(table.name)?;
        let id_column = quote(table.id_column)?;
        let mut records = Vec::new();
        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT * FROM {table_name} WHERE {id_column} IN ({placeholders}) ORDER BY {id_column} ASC;"
            );
            records.extend(self.query_records(table.name, &sql, params_from_iter(chunk))?);
        }
        Ok(records)
    }

    fn find_all_by_parent_id(
        &self,
        child: ChildTable,
        parent_id: Identifier,
    ) -> DbResult<Vec<Record>> {
        let id_column = quote(child.table.id_column)?;
        let order_by = match child.key_column {
            Some(key) => format!("{} ASC, {id_column} ASC", quote(key)?),
            None => format!("{id_column} ASC"),
        };
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {order_by};",
            quote(child.table.name)?,
            quote(child.back_reference)?
        );
        self.query_records(child.table.name, &sql, [parent_id])
    }

    fn count(&self, table: Table) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {};", quote(table.name)?);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        row_count(count)
    }

    fn exists_by_id(&self, table: Table, id: Identifier) -> DbResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
            quote(table.name)?,
            quote(table.id_column)?
        );
        let exists: i64 = self.conn.query_row(&sql, [id], |row| row.get(0))?;
        Ok(exists == 1)
    }
}

fn row_count(count: i64) -> DbResult<u64> {
    u64::try_from(count)
        .map_err(|_| DbError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}

fn quote(name: &str) -> DbResult<String> {
    if SQL_IDENTIFIER.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{quote, row_count, SqliteDataAccessStrategy};
    use crate::access::DataAccessStrategy;
    use crate::db::DbError;
    use crate::mapping::{ChildTable, Record, Table};
    use rusqlite::Connection;

    const PARENT: Table = Table::new("parent", "id");
    const ITEM: Table = Table::new("item", "id");
    const ITEMS: ChildTable = ChildTable {
        table: ITEM,
        back_reference: "parent",
        key_column: Some("position"),
    };

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             CREATE TABLE item (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent INTEGER NOT NULL,
                position INTEGER,
                label TEXT
             );",
        )
        .unwrap();
        conn
    }

    fn item(parent: i64, position: i64, label: &str) -> Record {
        Record::new("item")
            .with("parent", parent)
            .with("position", position)
            .with("label", label.to_string())
    }

    #[test]
    fn quote_rejects_unsafe_names() {
        assert_eq!(quote("lego_set").unwrap(), "\"lego_set\"");
        assert!(matches!(
            quote("x; DROP TABLE y"),
            Err(DbError::InvalidIdentifier(_))
        ));
        assert!(quote("1abc").is_err());
        assert!(quote("").is_err());
    }

    #[test]
    fn negative_row_count_is_an_error() {
        assert_eq!(row_count(3).unwrap(), 3);
        assert!(matches!(
            row_count(-1),
            Err(DbError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, -1)))
        ));
    }

    #[test]
    fn insert_returns_generated_or_supplied_identifier() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);

        let generated = access
            .insert(PARENT, &Record::new("parent").with("name", "a".to_string()))
            .unwrap();
        let supplied = access
            .insert(
                PARENT,
                &Record::new("parent")
                    .with("id", 23_i64)
                    .with("name", "b".to_string()),
            )
            .unwrap();

        assert!(generated > 0);
        assert_eq!(supplied, 23);
        assert_eq!(access.count(PARENT).unwrap(), 2);
    }

    #[test]
    fn insert_without_columns_uses_default_values() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);

        let id = access.insert(PARENT, &Record::new("parent")).unwrap();
        let loaded = access.find_by_id(PARENT, id).unwrap().unwrap();
        assert_eq!(loaded.get::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn update_reports_missing_rows() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        let id = access
            .insert(PARENT, &Record::new("parent").with("name", "a".to_string()))
            .unwrap();

        assert!(access
            .update(PARENT, id, &Record::new("parent").with("name", "b".to_string()))
            .unwrap());
        assert!(access.update(PARENT, id, &Record::new("parent")).unwrap());
        assert!(!access
            .update(PARENT, id + 100, &Record::new("parent").with("name", "c".to_string()))
            .unwrap());

        let loaded = access.find_by_id(PARENT, id).unwrap().unwrap();
        assert_eq!(loaded.get::<String>("name").unwrap(), "b");
    }

    #[test]
    fn find_all_by_id_skips_unknown_and_handles_empty_input() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        let first = access.insert(PARENT, &Record::new("parent")).unwrap();
        let second = access.insert(PARENT, &Record::new("parent")).unwrap();

        assert!(access.find_all_by_id(PARENT, &[]).unwrap().is_empty());

        let found = access
            .find_all_by_id(PARENT, &[second, 999, first])
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.identifier("id").unwrap()).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn find_all_by_id_spans_multiple_chunks() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        let ids: Vec<i64> = (0..1_200)
            .map(|_| access.insert(PARENT, &Record::new("parent")).unwrap())
            .collect();

        assert_eq!(access.find_all_by_id(PARENT, &ids).unwrap().len(), 1_200);
    }

    #[test]
    fn children_are_ordered_by_key_column_and_deleted_by_parent() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        access.insert(ITEM, &item(1, 2, "c")).unwrap();
        access.insert(ITEM, &item(1, 0, "a")).unwrap();
        access.insert(ITEM, &item(2, 0, "other")).unwrap();
        access.insert(ITEM, &item(1, 1, "b")).unwrap();

        let labels: Vec<String> = access
            .find_all_by_parent_id(ITEMS, 1)
            .unwrap()
            .iter()
            .map(|r| r.get("label").unwrap())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);

        assert_eq!(access.delete_by_parent_id(ITEMS, 1).unwrap(), 3);
        assert_eq!(access.delete_by_parent_id(ITEMS, 1).unwrap(), 0);
        assert_eq!(access.count(ITEM).unwrap(), 1);
    }

    #[test]
    fn delete_and_exists_by_id() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        let id = access.insert(PARENT, &Record::new("parent")).unwrap();

        assert!(access.exists_by_id(PARENT, id).unwrap());
        assert_eq!(access.delete(PARENT, id).unwrap(), 1);
        assert!(!access.exists_by_id(PARENT, id).unwrap());
        assert_eq!(access.delete(PARENT, id).unwrap(), 0);
        assert!(access.find_by_id(PARENT, id).unwrap().is_none());
    }

    #[test]
    fn invalid_table_name_never_reaches_sqlite() {
        let conn = setup();
        let access = SqliteDataAccessStrategy::new(&conn);
        let bad = Table::new("parent; DELETE FROM item", "id");

        assert!(matches!(
            access.find_all(bad),
            Err(DbError::InvalidIdentifier(_))
        ));
    }
}
