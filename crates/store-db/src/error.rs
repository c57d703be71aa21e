//! # Database Errors
//!
//! ```text
//! sqlx::Error ──► DbError ──► (inside a unit) DbError::in_unit ──► ApiError
//!                   │
//!                   ├─ client-facing: NotFound, Duplicate, MissingReference,
//!                   │                 Constraint, Rejected, StaleVersion,
//!                   │                 TransactionFailed
//!                   └─ server-side:   Connection, Migration, Query, PoolExhausted
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A looked-up or referenced row does not exist. The API shows
    /// `"{entity} not found"`.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index refused the write; `column` is `table.column` as
    /// SQLite reports it.
    #[error("{column} already exists")]
    Duplicate { column: String },

    /// A foreign key pointed at nothing. Repositories check references up
    /// front, so this only surfaces on a race.
    #[error("Referenced record does not exist")]
    MissingReference,

    /// A CHECK constraint refused the row.
    #[error("Constraint failed: {0}")]
    Constraint(String),

    /// A business rule refused the write; the message is shown to clients.
    #[error("{0}")]
    Rejected(String),

    /// Inventory row changed since the caller read its version.
    #[error("Inventory record was modified by another request")]
    StaleVersion,

    /// A unit failed for an unclassified reason and was rolled back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        DbError::Rejected(message.into())
    }

    /// Whether the error already tells the client what went wrong.
    fn is_classified(&self) -> bool {
        matches!(
            self,
            DbError::NotFound { .. }
                | DbError::Duplicate { .. }
                | DbError::Rejected(_)
                | DbError::StaleVersion
                | DbError::TransactionFailed(_)
                | DbError::Connection(_)
                | DbError::PoolExhausted
        )
    }

    /// Classifies the failure that ended unit `unit`: classified errors pass
    /// through, everything else becomes [`DbError::TransactionFailed`].
    pub fn in_unit(self, unit: &str) -> Self {
        if self.is_classified() {
            self
        } else {
            DbError::TransactionFailed(format!("{unit}: {self}"))
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => DbError::Duplicate {
                    column: db_err
                        .message()
                        .rsplit(": ")
                        .next()
                        .unwrap_or("value")
                        .to_string(),
                },
                ErrorKind::ForeignKeyViolation => DbError::MissingReference,
                ErrorKind::CheckViolation => DbError::Constraint(db_err.message().to_string()),
                _ => DbError::Query(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::Connection("pool is closed".to_string()),
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}
