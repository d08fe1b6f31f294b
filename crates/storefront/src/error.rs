//! Storefront error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while starting or running the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store could not be opened or migrated.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A domain operation failed.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The log subscriber could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type for storefront operations.
pub type Result<T> = std::result::Result<T, StorefrontError>;
