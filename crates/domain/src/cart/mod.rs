//! Shopping cart: the pure aggregate, discount rules, and the session that
//! ties a cart to the store and the stock hold ledger.

mod aggregate;
mod discount;
mod session;

pub use aggregate::{Cart, CartEntry, CartError, CartTotals};
pub use discount::{CouponOutcome, DiscountPolicy};
pub use session::ShoppingSession;
