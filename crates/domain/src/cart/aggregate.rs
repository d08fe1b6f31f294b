use common::{Money, ProductCode};
use serde::{Deserialize, Serialize};
use store::{NewOrderLine, Product};
use thiserror::Error;

use super::discount::{CouponOutcome, DiscountPolicy};

/// Errors raised by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// The quantity or its total no longer fits.
    #[error("Quantity of {0} is too large")]
    QuantityTooLarge(ProductCode),

    /// No entry for this product.
    #[error("Product {0} is not in the cart")]
    EntryNotFound(ProductCode),

    /// Nothing to check out.
    #[error("Cart is empty")]
    Empty,
}

/// One product line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub code: ProductCode,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Always `unit_price × quantity`.
    pub total: Money,
}

impl CartEntry {
    fn new(product: &Product, quantity: u32) -> Result<Self, CartError> {
        let total = product
            .price
            .checked_multiply(quantity)
            .ok_or_else(|| CartError::QuantityTooLarge(product.code.clone()))?;
        Ok(Self {
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            total,
        })
    }

    /// Adds `extra` units, leaving the entry untouched on overflow.
    fn grow(&mut self, extra: u32) -> Result<(), CartError> {
        let too_large = || CartError::QuantityTooLarge(self.code.clone());
        let quantity = self.quantity.checked_add(extra).ok_or_else(too_large)?;
        let total = self.unit_price.checked_multiply(quantity).ok_or_else(too_large)?;
        self.quantity = quantity;
        self.total = total;
        Ok(())
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.total = self.unit_price.multiply(quantity);
    }
}

/// Breakdown of the amount due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub flat_discount: Money,
    pub institutional_discount: Money,
    pub total: Money,
}

/// Session-scoped cart.
///
/// Holds one entry per product code, in the order products were first added,
/// plus the discount state. Stock is not touched here; see
/// [`crate::HoldLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
    coupon_applied: bool,
    institutional: bool,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries in insertion order.
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Returns the entry for a product.
    pub fn entry(&self, code: &ProductCode) -> Option<&CartEntry> {
        self.entries.iter().find(|entry| &entry.code == code)
    }

    fn entry_mut(&mut self, code: &ProductCode) -> Result<&mut CartEntry, CartError> {
        self.entries
            .iter_mut()
            .find(|entry| &entry.code == code)
            .ok_or_else(|| CartError::EntryNotFound(code.clone()))
    }

    /// Returns true if the cart has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of distinct products.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the quantity of one product, zero if absent.
    pub fn quantity_of(&self, code: &ProductCode) -> u32 {
        self.entry(code).map_or(0, |entry| entry.quantity)
    }

    /// Adds `quantity` units of a product.
    ///
    /// Merges into the existing entry for the same code, otherwise appends.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<&CartEntry, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        match self.entries.iter().position(|e| e.code == product.code) {
            Some(index) => {
                self.entries[index].grow(quantity)?;
                Ok(&self.entries[index])
            }
            None => {
                self.entries.push(CartEntry::new(product, quantity)?);
                Ok(&self.entries[self.entries.len() - 1])
            }
        }
    }

    /// Adds one unit to an existing entry.
    pub fn increase(&mut self, code: &ProductCode) -> Result<&CartEntry, CartError> {
        let entry = self.entry_mut(code)?;
        entry.grow(1)?;
        Ok(&*entry)
    }

    /// Removes one unit from an entry.
    ///
    /// Does nothing at quantity 1; returns whether the quantity changed.
    pub fn decrease(&mut self, code: &ProductCode) -> Result<bool, CartError> {
        let entry = self.entry_mut(code)?;
        if entry.quantity <= 1 {
            return Ok(false);
        }
        entry.set_quantity(entry.quantity - 1);
        Ok(true)
    }

    /// Removes an entry and returns it.
    pub fn remove(&mut self, code: &ProductCode) -> Option<CartEntry> {
        let index = self.entries.iter().position(|e| &e.code == code)?;
        Some(self.entries.remove(index))
    }

    /// Empties the cart and returns what it held.
    pub fn clear(&mut self) -> Vec<CartEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Enters a coupon code.
    pub fn apply_coupon(&mut self, code: &str, policy: &DiscountPolicy) -> CouponOutcome {
        if policy.matches_coupon(code) {
            self.coupon_applied = true;
            CouponOutcome::Applied
        } else {
            CouponOutcome::Rejected
        }
    }

    /// Drops the coupon.
    pub fn cancel_coupon(&mut self) {
        self.coupon_applied = false;
    }

    /// Returns true if the coupon is active.
    pub fn coupon_applied(&self) -> bool {
        self.coupon_applied
    }

    /// Sets whether the institutional discount applies.
    pub fn set_institutional(&mut self, institutional: bool) {
        self.institutional = institutional;
    }

    /// Returns true if the institutional discount applies.
    pub fn is_institutional(&self) -> bool {
        self.institutional
    }

    /// Returns the sum of entry totals.
    pub fn subtotal(&self) -> Money {
        self.entries.iter().map(|entry| entry.total).sum()
    }

    /// Computes the amount due.
    ///
    /// The flat coupon comes off first, never below zero; the institutional
    /// percentage then applies to what remains.
    pub fn totals(&self, policy: &DiscountPolicy) -> CartTotals {
        let subtotal = self.subtotal();
        let after_flat = if self.coupon_applied {
            subtotal.saturating_sub(policy.flat_amount)
        } else {
            subtotal
        };
        let total = if self.institutional {
            after_flat.percent_off(policy.institutional_percent)
        } else {
            after_flat
        };

        CartTotals {
            subtotal,
            flat_discount: subtotal - after_flat,
            institutional_discount: after_flat - total,
            total,
        }
    }

    /// Snapshots the entries as order lines.
    pub fn order_lines(&self) -> Vec<NewOrderLine> {
        self.entries
            .iter()
            .map(|entry| NewOrderLine {
                product_code: entry.code.clone(),
                product_name: entry.name.clone(),
                quantity: entry.quantity,
                unit_price: entry.unit_price,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str, price: i64) -> Product {
        Product {
            code: ProductCode::new(code),
            category: "Accesorios".to_string(),
            name: format!("Product {code}"),
            description: "Test".to_string(),
            price: Money::new(price),
            stock: 100,
            critical_stock: 10,
            image: String::new(),
        }
    }

    #[test]
    fn test_add_merges_same_code() {
        let mut cart = Cart::new();
        let p = product("AC001", 5990);

        cart.add(&p, 2).unwrap();
        cart.add(&p, 3).unwrap();
        cart.add(&p, 1).unwrap();

        assert_eq!(cart.len(), 1);
        let entry = cart.entry(&p.code).unwrap();
        assert_eq!(entry.quantity, 6);
        assert_eq!(entry.total, Money::new(6 * 5990));
    }

    #[test]
    fn test_oversized_quantity_is_rejected() {
        let mut cart = Cart::new();
        let p = product("AC001", 5990);
        cart.add(&p, u32::MAX - 1).unwrap();

        let err = cart.add(&p, 2).unwrap_err();
        assert_eq!(err, CartError::QuantityTooLarge(p.code.clone()));
        cart.increase(&p.code).unwrap();
        let err = cart.increase(&p.code).unwrap_err();
        assert_eq!(err, CartError::QuantityTooLarge(p.code.clone()));
        assert_eq!(cart.quantity_of(&p.code), u32::MAX);

        let pricey = product("PE001", i64::MAX / 2);
        let err = cart.add(&pricey, 3).unwrap_err();
        assert_eq!(err, CartError::QuantityTooLarge(pricey.code.clone()));
        assert!(cart.entry(&pricey.code).is_none());
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = Cart::new();
        cart.add(&product("PE001", 1), 1).unwrap();
        cart.add(&product("AC001", 1), 1).unwrap();
        cart.add(&product("PE001", 1), 1).unwrap();

        let codes: Vec<_> = cart.entries().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["PE001", "AC001"]);
    }

    #[test]
    fn test_add_zero_quantity_fails() {
        let mut cart = Cart::new();
        let err = cart.add(&product("AC001", 1), 0).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity { quantity: 0 });
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increase_and_decrease() {
        let mut cart = Cart::new();
        let p = product("AC001", 100);
        cart.add(&p, 1).unwrap();

        assert_eq!(cart.increase(&p.code).unwrap().total, Money::new(200));
        assert!(cart.decrease(&p.code).unwrap());
        assert_eq!(cart.quantity_of(&p.code), 1);
    }

    #[test]
    fn test_decrease_at_one_is_noop() {
        let mut cart = Cart::new();
        let p = product("AC001", 100);
        cart.add(&p, 1).unwrap();

        assert!(!cart.decrease(&p.code).unwrap());
        assert_eq!(cart.quantity_of(&p.code), 1);
        assert_eq!(cart.subtotal(), Money::new(100));
    }

    #[test]
    fn test_missing_entry() {
        let mut cart = Cart::new();
        let code = ProductCode::new("XX001");
        assert_eq!(
            cart.increase(&code).unwrap_err(),
            CartError::EntryNotFound(code.clone())
        );
        assert!(cart.remove(&code).is_none());
    }

    #[test]
    fn test_remove_then_add_restores_cart() {
        let mut cart = Cart::new();
        let p = product("AC001", 5990);
        cart.add(&p, 4).unwrap();
        let before = cart.clone();

        let removed = cart.remove(&p.code).unwrap();
        assert!(cart.is_empty());
        cart.add(&p, removed.quantity).unwrap();

        assert_eq!(cart, before);
    }

    #[test]
    fn test_coupon_applies_once() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        cart.add(&product("AC001", 10000), 1).unwrap();

        assert_eq!(cart.apply_coupon("sv1000", &policy), CouponOutcome::Applied);
        assert_eq!(cart.apply_coupon("SV1000", &policy), CouponOutcome::Applied);
        assert_eq!(cart.totals(&policy).total, Money::new(9000));
    }

    #[test]
    fn test_rejected_coupon_keeps_totals() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        cart.add(&product("AC001", 10000), 1).unwrap();

        assert_eq!(cart.apply_coupon("SV2000", &policy), CouponOutcome::Rejected);
        assert!(!cart.coupon_applied());
        assert_eq!(cart.totals(&policy).total, Money::new(10000));
    }

    #[test]
    fn test_discounts_stack_flat_first() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        cart.add(&product("AC001", 10000), 1).unwrap();
        cart.apply_coupon("SV1000", &policy);
        cart.set_institutional(true);

        let totals = cart.totals(&policy);
        assert_eq!(totals.subtotal, Money::new(10000));
        assert_eq!(totals.flat_discount, Money::new(1000));
        assert_eq!(totals.institutional_discount, Money::new(1800));
        assert_eq!(totals.total, Money::new(7200));
    }

    #[test]
    fn test_flat_discount_clamps_at_zero() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        cart.add(&product("AC003", 500), 1).unwrap();
        cart.apply_coupon("SV1000", &policy);

        let totals = cart.totals(&policy);
        assert_eq!(totals.total, Money::zero());
        assert_eq!(totals.flat_discount, Money::new(500));
    }

    #[test]
    fn test_cancel_coupon() {
        let policy = DiscountPolicy::default();
        let mut cart = Cart::new();
        cart.add(&product("AC001", 2000), 1).unwrap();
        cart.apply_coupon("SV1000", &policy);
        cart.cancel_coupon();
        assert_eq!(cart.totals(&policy).total, Money::new(2000));
    }

    #[test]
    fn test_order_lines_snapshot_entries() {
        let mut cart = Cart::new();
        cart.add(&product("AC001", 5990), 2).unwrap();
        cart.add(&product("GU001", 24990), 1).unwrap();

        let lines = cart.order_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_code.as_str(), "AC001");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[1].unit_price, Money::new(24990));
    }
}
