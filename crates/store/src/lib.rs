//! Persistence for the storefront: catalog, accounts and orders.
//!
//! Three store traits describe the tables. [`SqliteStore`] keeps them in an
//! embedded SQLite database; [`InMemoryStore`] keeps them in process memory
//! with the same semantics. Both publish table changes through a
//! [`ChangeFeed`] so `watch_*` queries stay current.

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod memory;
pub mod notify;
pub mod numbering;
pub mod orders;
pub mod records;
pub mod sqlite;

pub use accounts::AccountStore;
pub use catalog::CatalogStore;
pub use error::{ACCOUNT_EMAIL, Result, StoreError};
pub use memory::InMemoryStore;
pub use notify::{ChangeFeed, SnapshotStream, Table};
pub use numbering::next_order_number;
pub use orders::OrderStore;
pub use records::{Account, NewOrder, NewOrderLine, Order, OrderLine, OrderWithLines, Product};
pub use sqlite::SqliteStore;

/// A handle to every storefront table.
pub trait Store: CatalogStore + AccountStore + OrderStore + Clone + 'static {}

impl<T> Store for T where T: CatalogStore + AccountStore + OrderStore + Clone + 'static {}
