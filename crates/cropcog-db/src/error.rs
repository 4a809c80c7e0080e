//! # Database Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / mongodb::error::Error / codec error                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorised, never retried                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller (service layer) ← Decides what the fault means to its users    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Categories
//! - `Connection` - the store is unreachable, timed out, or the handle is closed
//! - `Conflict` - the store rejected a write with a constraint violation
//! - everything else describes a malformed request or document
//!
//! A missing key is never an error: reads return `None`, deletes are no-ops.

use thiserror::Error;

/// Placeholder used when a store error carries no collection or key context.
const UNKNOWN: &str = "unknown";

/// MongoDB server code for a duplicate key on a unique index.
pub(crate) const MONGO_DUPLICATE_KEY: i32 = 11000;

/// Document store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The store is unreachable or the connection is unusable.
    ///
    /// ## When This Occurs
    /// - Server selection / connect timeout
    /// - Pool closed or exhausted
    /// - Socket or DNS failure
    /// - Authentication rejected
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A write violated a uniqueness or other constraint.
    ///
    /// ## When This Occurs
    /// - `insert` with a key that already exists
    /// - Any unique index the store enforces on non-key fields
    #[error("Conflict in {collection} for key '{key}': {message}")]
    Conflict {
        collection: String,
        key: String,
        message: String,
    },

    /// A document could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The store rejected the request for a reason other than a constraint.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The caller passed an argument the store cannot act on.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a Conflict error.
    pub fn conflict(
        collection: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DbError::Conflict {
            collection: collection.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// True when the store could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }

    /// True when the store rejected a write with a constraint violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }

    /// Fills in the collection and key of a Conflict raised without them.
    ///
    /// Other variants are returned untouched.
    pub(crate) fn in_context(self, collection: &str, key: Option<&str>) -> Self {
        match self {
            DbError::Conflict {
                collection: c,
                key: k,
                message,
            } => DbError::Conflict {
                collection: if c == UNKNOWN { collection.to_string() } else { c },
                key: match key {
                    Some(key) if k == UNKNOWN => key.to_string(),
                    _ => k,
                },
                message,
            },
            other => other,
        }
    }
}

// =============================================================================
// SQLite (sqlx)
// =============================================================================

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (constraint)   → DbError::Conflict
/// sqlx::Error::Database (busy/locked)  → DbError::Connection
/// sqlx::Error::Pool* / Io / Tls        → DbError::Connection
/// sqlx::Error::Decode / ColumnDecode   → DbError::Serialization
/// Other                                → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    DbError::conflict(UNKNOWN, UNKNOWN, db_err.message())
                }
                _ => {
                    // SQLITE_BUSY (5) and SQLITE_LOCKED (6): the file is held elsewhere
                    let code = db_err.code();
                    if matches!(code.as_deref(), Some("5") | Some("6")) {
                        DbError::Connection(db_err.message().to_string())
                    } else {
                        DbError::QueryFailed(db_err.message().to_string())
                    }
                }
            },

            sqlx::Error::PoolTimedOut => {
                DbError::Connection("Timed out waiting for a pooled connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::Connection("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::Connection(e.to_string()),

            sqlx::Error::Tls(e) => DbError::Connection(e.to_string()),

            sqlx::Error::WorkerCrashed => {
                DbError::Connection("Database worker thread crashed".to_string())
            }

            sqlx::Error::Configuration(e) => DbError::Connection(e.to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Serialization(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

// =============================================================================
// MongoDB
// =============================================================================

/// Convert MongoDB driver errors to DbError.
///
/// ## Error Mapping
/// ```text
/// Write / Command error code 11000         → DbError::Conflict
/// ServerSelection / Io / DnsResolve /
///   ConnectionPoolCleared / Authentication → DbError::Connection
/// BsonSerialization / BsonDeserialization  → DbError::Serialization
/// InvalidArgument                          → DbError::InvalidArgument
/// Other                                    → DbError::QueryFailed
/// ```
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_err))
                if write_err.code == MONGO_DUPLICATE_KEY =>
            {
                DbError::conflict(UNKNOWN, UNKNOWN, write_err.message.clone())
            }

            ErrorKind::Command(command_err) if command_err.code == MONGO_DUPLICATE_KEY => {
                DbError::conflict(UNKNOWN, UNKNOWN, command_err.message.clone())
            }

            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::Authentication { .. } => DbError::Connection(err.to_string()),

            ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
                DbError::Serialization(err.to_string())
            }

            ErrorKind::InvalidArgument { .. } => DbError::InvalidArgument(err.to_string()),

            _ => DbError::QueryFailed(err.to_string()),
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for DbError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for DbError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "Connection failed: Pool is closed");
    }

    #[test]
    fn test_pool_timeout_is_connection_error() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_connection());
    }

    #[test]
    fn test_json_error_is_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DbError = json_err.into();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[test]
    fn test_conflict_context_fills_unknowns_only() {
        let err = DbError::conflict(UNKNOWN, UNKNOWN, "UNIQUE constraint failed")
            .in_context("product", Some("p-1"));
        match err {
            DbError::Conflict {
                collection, key, ..
            } => {
                assert_eq!(collection, "product");
                assert_eq!(key, "p-1");
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let err = DbError::conflict("product", "p-2", "duplicate").in_context("other", Some("x"));
        assert_eq!(
            err.to_string(),
            "Conflict in product for key 'p-2': duplicate"
        );
    }

    #[test]
    fn test_context_leaves_other_variants_alone() {
        let err = DbError::Connection("down".to_string()).in_context("product", Some("p-1"));
        assert!(err.is_connection());
        assert!(!err.is_conflict());
    }
}
