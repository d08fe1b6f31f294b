//! Domain layer for the storefront.
//!
//! This crate provides the business rules on top of the stores:
//! - Cart aggregate, discounts and the per-shopper [`ShoppingSession`]
//! - Stock holds that keep concurrent carts from overselling
//! - Checkout workflow that turns a cart into a numbered order
//! - Account registration, login and profile edits
//! - Back-office catalog and order administration, dashboard counters
//! - Form validation and demo seed data

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod orders;
pub mod reservation;
pub mod seed;
pub mod validation;

pub use accounts::AccountService;
pub use cart::{
    Cart, CartEntry, CartError, CartTotals, CouponOutcome, DiscountPolicy, ShoppingSession,
};
pub use catalog::{ALL_CATEGORIES, CatalogService, ProductFilter};
pub use checkout::{CheckoutService, ORDER_DATE_FORMAT};
pub use credentials::Credentials;
pub use dashboard::{DashboardStats, StatusCounts};
pub use error::{DomainError, Result};
pub use orders::OrderService;
pub use reservation::{HoldLedger, ReservationError};
pub use seed::{SeedReport, seed_if_empty};
pub use validation::{ProductForm, ProfileForm, RegistrationForm, ValidationError};
