//! Stock holds for in-flight carts.
//!
//! Committed stock lives in the catalog and changes only when an order is
//! placed. While a product sits in a cart, the ledger records a hold against
//! it instead:
//!
//! ```text
//! available(code) = committed stock(code) - Σ holds(code) over all sessions
//! ```
//!
//! Holds go away when the cart releases them, when the session checks out or
//! is dropped, or when the session sits idle longer than the TTL and the
//! sweeper reclaims it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::{ProductCode, SessionId};
use thiserror::Error;

/// Errors raised when placing a hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Not enough unheld stock for the request.
    #[error("Insufficient stock for {code}: requested {requested}, available {available}")]
    InsufficientStock {
        code: ProductCode,
        requested: u32,
        available: i64,
    },

    /// The session's hold on the product would exceed `u32::MAX` units.
    #[error("Hold on {code} is too large")]
    HoldTooLarge { code: ProductCode },
}

#[derive(Debug)]
struct SessionHolds {
    touched_at: DateTime<Utc>,
    items: HashMap<ProductCode, u32>,
}

#[derive(Debug, Default)]
struct LedgerState {
    sessions: HashMap<SessionId, SessionHolds>,
}

impl LedgerState {
    fn held(&self, code: &ProductCode) -> u64 {
        self.sessions
            .values()
            .filter_map(|session| session.items.get(code))
            .map(|quantity| u64::from(*quantity))
            .sum()
    }
}

/// Shared ledger of cart holds, keyed by session and product.
#[derive(Debug, Clone)]
pub struct HoldLedger {
    state: Arc<Mutex<LedgerState>>,
    ttl: TimeDelta,
}

impl HoldLedger {
    /// Creates an empty ledger whose holds expire after `ttl` of inactivity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the idle time after which a session's holds expire.
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Returns the units of `code` held across all sessions.
    pub fn held(&self, code: &ProductCode) -> u64 {
        self.lock().held(code)
    }

    /// Returns the units of `code` held by one session.
    pub fn held_by(&self, session: SessionId, code: &ProductCode) -> u32 {
        self.lock()
            .sessions
            .get(&session)
            .and_then(|holds| holds.items.get(code).copied())
            .unwrap_or(0)
    }

    /// Returns committed stock minus every hold on `code`.
    pub fn available(&self, code: &ProductCode, committed: i64) -> i64 {
        committed.saturating_sub(self.held(code).try_into().unwrap_or(i64::MAX))
    }

    /// Holds `quantity` more units of `code` for `session` if that many are
    /// available. The check and the update happen under one lock.
    ///
    /// Returns the session's new hold on the product.
    pub fn try_hold(
        &self,
        session: SessionId,
        code: &ProductCode,
        quantity: u32,
        committed: i64,
        now: DateTime<Utc>,
    ) -> Result<u32, ReservationError> {
        let mut state = self.lock();

        let held = i64::try_from(state.held(code)).unwrap_or(i64::MAX);
        let available = committed.saturating_sub(held);
        if i64::from(quantity) > available {
            return Err(ReservationError::InsufficientStock {
                code: code.clone(),
                requested: quantity,
                available: available.max(0),
            });
        }

        let current = state
            .sessions
            .get(&session)
            .and_then(|holds| holds.items.get(code).copied())
            .unwrap_or(0);
        let total = current
            .checked_add(quantity)
            .ok_or_else(|| ReservationError::HoldTooLarge { code: code.clone() })?;

        let holds = state.sessions.entry(session).or_insert_with(|| SessionHolds {
            touched_at: now,
            items: HashMap::new(),
        });
        holds.touched_at = now;
        holds.items.insert(code.clone(), total);
        Ok(total)
    }

    /// Releases up to `quantity` units of one hold. Returns the units freed.
    pub fn release(&self, session: SessionId, code: &ProductCode, quantity: u32) -> u32 {
        let mut state = self.lock();
        let Some(holds) = state.sessions.get_mut(&session) else {
            return 0;
        };
        let Some(slot) = holds.items.get_mut(code) else {
            return 0;
        };

        let freed = quantity.min(*slot);
        *slot -= freed;
        if *slot == 0 {
            holds.items.remove(code);
        }
        if holds.items.is_empty() {
            state.sessions.remove(&session);
        }
        freed
    }

    /// Releases the whole hold a session has on one product.
    pub fn release_product(&self, session: SessionId, code: &ProductCode) -> u32 {
        self.release(session, code, u32::MAX)
    }

    /// Releases every hold of a session. Returns the units freed.
    pub fn release_session(&self, session: SessionId) -> u64 {
        self.lock()
            .sessions
            .remove(&session)
            .map(|holds| holds.items.values().map(|q| u64::from(*q)).sum())
            .unwrap_or(0)
    }

    /// Marks a session as active, postponing the expiry of its holds.
    pub fn touch(&self, session: SessionId, now: DateTime<Utc>) {
        if let Some(holds) = self.lock().sessions.get_mut(&session) {
            holds.touched_at = now;
        }
    }

    /// Returns the holds of one session.
    pub fn holds_for(&self, session: SessionId) -> Vec<(ProductCode, u32)> {
        self.lock()
            .sessions
            .get(&session)
            .map(|holds| {
                holds
                    .items
                    .iter()
                    .map(|(code, quantity)| (code.clone(), *quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of sessions holding stock.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Drops the holds of every session idle for longer than the TTL.
    ///
    /// Returns the number of sessions reclaimed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let before = state.sessions.len();
        let ttl = self.ttl;
        state
            .sessions
            .retain(|_, holds| now.signed_duration_since(holds.touched_at) <= ttl);
        let swept = before - state.sessions.len();
        drop(state);

        if swept > 0 {
            metrics::counter!("cart_holds_swept_total").increment(swept as u64);
            tracing::info!(sessions = swept, "released holds of abandoned carts");
        }
        swept
    }
}
