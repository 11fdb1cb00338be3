use crate::db::{DbError, TransactionError};
use crate::mapping::{Identifier, MappingError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse classification of [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IdentifierMissing,
    OptimisticFailure,
    StorageFailure,
    MappingFailure,
}

/// Failure of one engine call.
///
/// The engine does no local recovery. Writes issued before the failure stay
/// in the caller's transaction until it is rolled back.
#[derive(Debug)]
pub enum EngineError {
    /// Operation needs an identifier the entity does not carry.
    IdentifierMissing { table: &'static str },
    /// An update or delete expected to hit one row hit none.
    OptimisticFailure {
        table: &'static str,
        identifier: Identifier,
        operation: &'static str,
    },
    /// The data access strategy rejected a primitive.
    Storage {
        table: &'static str,
        operation: &'static str,
        identifier: Option<Identifier>,
        source: DbError,
    },
    /// Begin or commit of the caller's transaction failed.
    Transaction(TransactionError),
    Mapping(MappingError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdentifierMissing { .. } => ErrorKind::IdentifierMissing,
            Self::OptimisticFailure { .. } => ErrorKind::OptimisticFailure,
            Self::Storage { .. } | Self::Transaction(_) => ErrorKind::StorageFailure,
            Self::Mapping(_) => ErrorKind::MappingFailure,
        }
    }

    /// True when the failed call issued no write at all.
    ///
    /// Separates "nothing persisted" from a storage-layer rejection that may
    /// follow earlier writes of the same call.
    pub fn is_nothing_persisted(&self) -> bool {
        match self {
            Self::IdentifierMissing { .. } => true,
            // A root update is the first statement `save` issues.
            Self::OptimisticFailure { operation, .. } => *operation == "update",
            Self::Storage { .. } | Self::Transaction(_) | Self::Mapping(_) => false,
        }
    }

    pub(crate) fn storage(
        table: &'static str,
        operation: &'static str,
        identifier: Option<Identifier>,
    ) -> impl FnOnce(DbError) -> Self {
        move |source| Self::Storage {
            table,
            operation,
            identifier,
            source,
        }
    }

    /// Short stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::IdentifierMissing => "identifier_missing",
            ErrorKind::OptimisticFailure => "optimistic_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::MappingFailure => "mapping_failure",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentifierMissing { table } => {
                write!(f, "entity mapped to `{table}` has no identifier")
            }
            Self::OptimisticFailure {
                table,
                identifier,
                operation,
            } => write!(
                f,
                "{operation} on `{table}` affected no row for identifier {identifier}"
            ),
            Self::Storage {
                table,
                operation,
                identifier: Some(identifier),
                source,
            } => write!(
                f,
                "{operation} on `{table}` failed for identifier {identifier}: {source}"
            ),
            Self::Storage {
                table,
                operation,
                identifier: None,
                source,
            } => write!(f, "{operation} on `{table}` failed: {source}"),
            Self::Transaction(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            Self::Transaction(err) => Some(err),
            Self::Mapping(err) => Some(err),
            Self::IdentifierMissing { .. } | Self::OptimisticFailure { .. } => None,
        }
    }
}

impl From<MappingError> for EngineError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

impl From<TransactionError> for EngineError {
    fn from(value: TransactionError) -> Self {
        Self::Transaction(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorKind};
    use crate::db::{DbError, TransactionError};

    #[test]
    fn only_writeless_failures_report_nothing_persisted() {
        assert!(EngineError::IdentifierMissing { table: "lego_set" }.is_nothing_persisted());
        assert!(EngineError::OptimisticFailure {
            table: "lego_set",
            identifier: 1,
            operation: "update",
        }
        .is_nothing_persisted());
        assert!(!EngineError::OptimisticFailure {
            table: "lego_set",
            identifier: 1,
            operation: "delete",
        }
        .is_nothing_persisted());
        assert!(!EngineError::Storage {
            table: "manual",
            operation: "insert",
            identifier: None,
            source: DbError::InvalidIdentifier("manual!".to_string()),
        }
        .is_nothing_persisted());
    }

    #[test]
    fn transaction_failure_is_a_storage_failure() {
        let err = EngineError::from(TransactionError {
            stage: "commit",
            source: DbError::InvalidIdentifier("x".to_string()),
        });

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(err.code(), "storage_failure");
        assert!(err.to_string().starts_with("transaction commit failed"));
    }
}
