use homestock_core::HomestockError;
use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with the given id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A transition rejected its input (validation failure).
    #[error(transparent)]
    Rejected(#[from] HomestockError),
}

impl StoreError {
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    /// Short error code string included in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => Self::NOT_FOUND,
            StoreError::Database(_) => "DATABASE_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::Rejected(e) => e.code(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
