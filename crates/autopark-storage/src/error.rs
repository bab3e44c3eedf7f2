use thiserror::Error;

/// Errors from the ledger stores and the database layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity_type} not found: {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Unique constraint violated: plate or slot already active.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row no longer parses as a domain value.
    #[error("invalid stored data: {0}")]
    Validation(String),

    #[error("storage configuration: {0}")]
    Configuration(String),
}

impl StorageError {
    pub fn not_found(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Map a unique-constraint violation to [`StorageError::Conflict`].
    pub(crate) fn from_insert(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

impl From<autopark_core::Error> for StorageError {
    fn from(error: autopark_core::Error) -> Self {
        Self::Validation(error.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
