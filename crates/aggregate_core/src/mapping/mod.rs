//! Statically typed mapping metadata.
//!
//! # Responsibility
//! - Describe which table an entity type maps to and which column holds its
//!   identifier.
//! - Describe owned child relations (single or collection valued) and the
//!   back-reference column that ties a child row to its parent.
//! - Convert entities to and from column/value records.
//!
//! # Invariants
//! - Every entity type has exactly one identifier property, enforced by
//!   `EntityType::builder` taking it as a mandatory argument.
//! - Descriptor tables are built once per type and live for the process.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity;
pub mod record;
pub mod relation;

pub use entity::{properties_of, Entity, EntityType, EntityTypeBuilder};
pub use record::Record;
pub use relation::{OneToMany, OneToOne, Relation};

/// Row identifier. `None` on an entity means "not inserted yet".
pub type Identifier = i64;

pub type MappingResult<T> = Result<T, MappingError>;

/// Table an entity type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table {
    pub name: &'static str,
    pub id_column: &'static str,
}

impl Table {
    pub const fn new(name: &'static str, id_column: &'static str) -> Self {
        Self { name, id_column }
    }
}

/// Child table seen from one owning relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildTable {
    pub table: Table,
    /// Foreign key column holding the parent identifier.
    pub back_reference: &'static str,
    /// Stores the element position for ordered collections.
    pub key_column: Option<&'static str>,
}

/// One persistent property of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    /// Column in the owning table, or the back-reference column in the child
    /// table for relation properties.
    pub column: &'static str,
    pub is_identifier: bool,
    pub referenced_type: Option<&'static str>,
    pub is_collection: bool,
}

impl PropertyDescriptor {
    pub fn is_reference(&self) -> bool {
        self.referenced_type.is_some()
    }
}

#[derive(Debug)]
pub enum MappingError {
    MissingColumn {
        table: String,
        column: String,
    },
    InvalidColumn {
        table: String,
        column: String,
        message: String,
    },
    /// A single-valued relation found more than one child row.
    AmbiguousChild {
        table: &'static str,
        parent_id: Identifier,
        rows: usize,
    },
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn { table, column } => {
                write!(f, "column `{column}` missing from `{table}` record")
            }
            Self::InvalidColumn {
                table,
                column,
                message,
            } => write!(f, "cannot decode `{table}.{column}`: {message}"),
            Self::AmbiguousChild {
                table,
                parent_id,
                rows,
            } => write!(
                f,
                "single-valued relation `{table}` has {rows} rows for parent {parent_id}"
            ),
        }
    }
}

impl Error for MappingError {}
