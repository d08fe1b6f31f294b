use thiserror::Error;

/// Conflict entity reported when an email already belongs to another account.
pub const ACCOUNT_EMAIL: &str = "account email";

/// Errors that can occur when reading or writing the storefront tables.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key or unique field already exists.
    #[error("{entity} {key} already exists")]
    Conflict { entity: &'static str, key: String },

    /// The record addressed by an update was not found.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// A stored row could not be mapped back to a record.
    #[error("Invalid {entity} record: {reason}")]
    InvalidRecord { entity: &'static str, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// True if this is a [`StoreError::Conflict`] on `entity`.
    pub fn is_conflict_on(&self, entity: &str) -> bool {
        matches!(self, StoreError::Conflict { entity: e, .. } if *e == entity)
    }

    pub(crate) fn conflict(entity: &'static str, key: impl ToString) -> Self {
        StoreError::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(entity: &'static str, reason: impl ToString) -> Self {
        StoreError::InvalidRecord {
            entity,
            reason: reason.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
