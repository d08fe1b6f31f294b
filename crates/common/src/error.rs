use thiserror::Error;

/// Errors raised when parsing a stored string back into a shared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The value is not a known shipment status.
    #[error("Unknown shipment status: {0}")]
    UnknownStatus(String),

    /// The value is not a known account class.
    #[error("Unknown account class: {0}")]
    UnknownAccountClass(String),
}
