//! Shared value types for the storefront core.
//!
//! Identifiers, money and the small enums that both the persistence layer
//! and the domain layer need to agree on.

pub mod error;
pub mod money;
pub mod status;
pub mod types;

pub use error::ParseError;
pub use money::Money;
pub use status::{AccountClass, ShipmentStatus};
pub use types::{OrderNumber, ProductCode, Run, SessionId};
