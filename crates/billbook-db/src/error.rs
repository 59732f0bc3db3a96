//! # Database Error Types
//!
//! Error types for storage, numbering and configuration.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      Task join / TOML / JSON errors        │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Save workflow: "Could not create document, please retry"              │
//! │  (no number is ever returned alongside an error)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use billbook_core::CoreError;

/// Database, numbering and configuration errors.
#[derive(Debug, Error)]
pub enum DbError {
    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A snapshot reuses a number already saved for the same kind
    /// - Any other UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// CHECK constraint or trigger abort.
    ///
    /// ## When This Occurs
    /// - Updating or deleting an immutable snapshot
    /// - Moving a counter backwards
    /// - Totals that do not add up
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Snapshot lines could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // Numbering Errors
    // =========================================================================
    /// A kind has no counter row (the service was not opened).
    #[error("No number sequence for {kind}")]
    SequenceMissing { kind: String },

    /// The reservation task died before reporting back.
    ///
    /// The counter may or may not have advanced; either way no number was
    /// handed out, so the worst outcome is a gap.
    #[error("Number reservation aborted: {0}")]
    ReservationAborted(String),

    /// Domain error from billbook-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// A failed `generate` is always safe to retry: nothing was handed out.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::QueryFailed(_)
                | DbError::ReservationAborted(_)
        )
    }

    /// Message suitable for the document form.
    pub fn user_message(&self) -> String {
        match self {
            DbError::UniqueViolation { .. } => {
                "That document number is already in use.".to_string()
            }
            DbError::InvalidConfig(msg) => format!("Settings are invalid: {}", msg),
            DbError::Core(err) => err.to_string(),
            _ => "Could not create document, please retry.".to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // CHECK constraint: "CHECK constraint failed: <expr>"
                // Trigger RAISE(ABORT, msg): the message itself
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("CHECK constraint failed")
                    || msg.contains("snapshots are immutable")
                    || msg.contains("document sequence")
                {
                    DbError::ConstraintViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DbError {
    fn from(err: tokio::task::JoinError) -> Self {
        DbError::ReservationAborted(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DbError::SequenceMissing {
            kind: "invoice".to_string(),
        };
        assert_eq!(err.to_string(), "No number sequence for invoice");

        let err = DbError::duplicate("documents.kind, documents.number", "INV-0001");
        assert_eq!(
            err.to_string(),
            "Duplicate documents.kind, documents.number: 'INV-0001' already exists"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(DbError::ReservationAborted("panicked".into()).is_retryable());
        assert!(!DbError::InvalidConfig("width".into()).is_retryable());
        assert!(!DbError::duplicate("number", "INV-0001").is_retryable());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = DbError::QueryFailed("disk I/O error".into());
        assert_eq!(err.user_message(), "Could not create document, please retry.");
    }

    #[test]
    fn test_toml_error_is_load_failure() {
        let err: DbError = toml::from_str::<toml::Value>("[broken").unwrap_err().into();
        assert!(matches!(err, DbError::ConfigLoadFailed(_)));
    }
}
