use chrono::Utc;
use common::{ProductCode, Run, SessionId};
use store::{Order, Store};

use super::{Cart, CartEntry, CartError, CartTotals, CouponOutcome, DiscountPolicy};
use crate::checkout::CheckoutService;
use crate::error::{DomainError, Result};
use crate::reservation::HoldLedger;

/// One shopper's cart, bound to the store and the hold ledger.
///
/// Every quantity that enters the cart is held in the ledger first, so two
/// sessions can never promise the same unit. Dropping the session releases
/// whatever it still holds.
pub struct ShoppingSession<S: Store> {
    id: SessionId,
    store: S,
    ledger: HoldLedger,
    checkout: CheckoutService<S>,
    policy: DiscountPolicy,
    cart: Cart,
}

impl<S: Store> ShoppingSession<S> {
    /// Opens a session with an empty cart.
    pub fn new(store: S, ledger: HoldLedger, policy: DiscountPolicy) -> Self {
        Self {
            id: SessionId::new(),
            checkout: CheckoutService::new(store.clone()),
            store,
            ledger,
            policy,
            cart: Cart::new(),
        }
    }

    /// Returns the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Returns the discount rules in force.
    pub fn policy(&self) -> &DiscountPolicy {
        &self.policy
    }

    async fn product(&self, code: &ProductCode) -> Result<store::Product> {
        self.store
            .product(code)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(code.clone()))
    }

    /// Adds `quantity` units of a product, holding them against stock.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub async fn add_to_cart(&mut self, code: &ProductCode, quantity: u32) -> Result<CartEntry> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }
        let product = self.product(code).await?;
        self.ledger
            .try_hold(self.id, code, quantity, product.stock, Utc::now())?;
        match self.cart.add(&product, quantity) {
            Ok(entry) => Ok(entry.clone()),
            Err(err) => {
                self.ledger.release(self.id, code, quantity);
                Err(err.into())
            }
        }
    }

    /// Adds one unit to an entry, if a unit is available.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub async fn increase_quantity(&mut self, code: &ProductCode) -> Result<CartEntry> {
        if self.cart.entry(code).is_none() {
            return Err(CartError::EntryNotFound(code.clone()).into());
        }
        let product = self.product(code).await?;
        self.ledger
            .try_hold(self.id, code, 1, product.stock, Utc::now())?;
        match self.cart.increase(code) {
            Ok(entry) => Ok(entry.clone()),
            Err(err) => {
                self.ledger.release(self.id, code, 1);
                Err(err.into())
            }
        }
    }

    /// Removes one unit from an entry and releases its hold.
    ///
    /// At quantity 1 nothing changes and nothing is released.
    pub fn decrease_quantity(&mut self, code: &ProductCode) -> Result<bool> {
        let changed = self.cart.decrease(code)?;
        if changed {
            self.ledger.release(self.id, code, 1);
        }
        self.ledger.touch(self.id, Utc::now());
        Ok(changed)
    }

    /// Removes an entry and releases its whole hold.
    pub fn remove_from_cart(&mut self, code: &ProductCode) -> Option<CartEntry> {
        let removed = self.cart.remove(code)?;
        self.ledger.release_product(self.id, code);
        self.ledger.touch(self.id, Utc::now());
        Some(removed)
    }

    /// Empties the cart and releases every hold.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.ledger.release_session(self.id);
    }

    /// Enters a coupon code.
    pub fn apply_discount(&mut self, code: &str) -> CouponOutcome {
        let outcome = self.cart.apply_coupon(code, &self.policy);
        tracing::debug!(session = %self.id, ?outcome, "coupon entered");
        outcome
    }

    /// Drops the coupon.
    pub fn cancel_discount(&mut self) {
        self.cart.cancel_coupon();
    }

    /// Sets the institutional flag from the email of the account `run`.
    ///
    /// Unknown accounts leave the flag unchanged. Returns the flag.
    pub async fn check_institutional(&mut self, run: &Run) -> Result<bool> {
        if let Some(account) = self.store.account(run).await? {
            let institutional = self.policy.is_institutional(&account.email);
            self.cart.set_institutional(institutional);
        }
        Ok(self.cart.is_institutional())
    }

    /// Returns the amount due.
    pub fn totals(&self) -> CartTotals {
        self.cart.totals(&self.policy)
    }

    /// Returns unheld stock for a product, or None for unknown codes.
    pub async fn available_stock(&self, code: &ProductCode) -> Result<Option<i64>> {
        let product = self.store.product(code).await?;
        Ok(product.map(|p| self.ledger.available(code, p.stock)))
    }

    /// Re-takes holds the sweeper reclaimed while the cart sat idle.
    async fn ensure_held(&self) -> Result<()> {
        let now = Utc::now();
        for entry in self.cart.entries() {
            let held = self.ledger.held_by(self.id, &entry.code);
            if held < entry.quantity {
                let product = self.product(&entry.code).await?;
                self.ledger.try_hold(
                    self.id,
                    &entry.code,
                    entry.quantity - held,
                    product.stock,
                    now,
                )?;
            }
        }
        self.ledger.touch(self.id, now);
        Ok(())
    }

    /// Places the order for `customer` at the discounted total.
    ///
    /// On success the holds are dropped (the sale is committed, stock was
    /// deducted in the same transaction as the order) and the cart and coupon
    /// are reset. On failure the cart is left as it was.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub async fn checkout(&mut self, customer: &Run) -> Result<Order> {
        if self.cart.is_empty() {
            return Err(CartError::Empty.into());
        }
        self.ensure_held().await?;

        let total = self.totals().total;
        let order = self
            .checkout
            .place_order(customer, self.cart.order_lines(), total)
            .await?;

        self.ledger.release_session(self.id);
        self.cart.clear();
        self.cart.cancel_coupon();
        Ok(order)
    }
}

impl<S: Store> Drop for ShoppingSession<S> {
    fn drop(&mut self) {
        let released = self.ledger.release_session(self.id);
        if released > 0 {
            tracing::debug!(session = %self.id, units = released, "session closed, holds released");
        }
    }
}

impl<S: Store> std::fmt::Debug for ShoppingSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShoppingSession")
            .field("id", &self.id)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}
