//! Aggregate persistence core.
//!
//! Maps an aggregate root and the child entities it owns onto relational
//! tables, and back. Saves, loads and deletes cascade through owned
//! relations in dependency-safe order.

pub mod access;
pub mod config;
pub mod db;
pub mod engine;
pub mod events;
pub mod logging;
pub mod mapping;

pub use access::{DataAccessStrategy, SqliteDataAccessStrategy};
pub use config::{ConfigError, StoreConfig};
pub use db::{
    open_db, open_db_in_memory, open_with_config, with_transaction, DbError, Migration,
    TransactionError,
};
pub use engine::{AggregateTemplate, EngineError, EngineResult, ErrorKind};
pub use events::{
    AggregateEvent, EventKind, EventSink, LoggingSink, NoopSink, RecordedEvent, RecordingSink,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use mapping::{
    properties_of, ChildTable, Entity, EntityType, Identifier, MappingError, MappingResult,
    OneToMany, OneToOne, PropertyDescriptor, Record, Table,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
