//! Storefront composition root.
//!
//! Wires one store handle, one stock hold ledger and the domain services
//! built on them. Nothing here is global: every component is owned by a
//! [`Storefront`] value and handed out from it.

pub mod config;
pub mod error;
pub mod telemetry;

use std::time::Duration;

use chrono::Utc;
use domain::{
    AccountService, CatalogService, Credentials, DashboardStats, DiscountPolicy, HoldLedger,
    OrderService, SeedReport, ShoppingSession, seed_if_empty,
};
use store::{SqliteStore, Store};
use tokio::task::JoinHandle;

pub use config::{Config, ConfigError, LogFormat};
pub use error::{Result, StorefrontError};

/// The assembled storefront.
#[derive(Debug, Clone)]
pub struct Storefront<S: Store> {
    store: S,
    ledger: HoldLedger,
    policy: DiscountPolicy,
    credentials: Credentials,
    accounts: AccountService<S>,
    catalog: CatalogService<S>,
    orders: OrderService<S>,
}

impl Storefront<SqliteStore> {
    /// Connects to the configured database, applies migrations and, if
    /// enabled, seeds empty tables.
    #[tracing::instrument(skip_all, fields(url = %config.database_url))]
    pub async fn open(config: &Config) -> Result<Self> {
        let store =
            SqliteStore::connect(&config.database_url, config.database_max_connections).await?;
        store.run_migrations().await?;
        tracing::info!("database ready");
        Self::with_store(store, config).await
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.store.close().await;
    }
}

impl<S: Store> Storefront<S> {
    /// Assembles a storefront over an already open store.
    pub fn new(
        store: S,
        credentials: Credentials,
        policy: DiscountPolicy,
        cart_hold_ttl: Duration,
    ) -> Self {
        Self {
            ledger: HoldLedger::new(cart_hold_ttl),
            accounts: AccountService::new(store.clone(), credentials.clone()),
            catalog: CatalogService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
            policy,
            credentials,
        }
    }

    /// Assembles a storefront from configuration and seeds it if enabled.
    pub async fn with_store(store: S, config: &Config) -> Result<Self> {
        let credentials = Credentials::new(config.argon2_memory_kib, config.argon2_iterations)?;
        let storefront = Self::new(
            store,
            credentials,
            DiscountPolicy::default(),
            config.cart_hold_ttl,
        );
        if config.seed_on_start {
            storefront.seed().await?;
        }
        Ok(storefront)
    }

    /// Fills empty tables with demo data.
    pub async fn seed(&self) -> Result<SeedReport> {
        Ok(seed_if_empty(&self.store, &self.credentials).await?)
    }

    /// Opens a new shopping session with an empty cart.
    pub fn new_session(&self) -> ShoppingSession<S> {
        ShoppingSession::new(self.store.clone(), self.ledger.clone(), self.policy.clone())
    }

    /// Spawns the task that reclaims holds from abandoned carts.
    ///
    /// The task runs until the handle is aborted.
    pub fn spawn_hold_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let ledger = self.ledger.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                ledger.sweep_expired(Utc::now());
            }
        })
    }

    /// Loads the dashboard counters.
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        Ok(DashboardStats::load(&self.store).await?)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &HoldLedger {
        &self.ledger
    }

    pub fn policy(&self) -> &DiscountPolicy {
        &self.policy
    }

    pub fn accounts(&self) -> &AccountService<S> {
        &self.accounts
    }

    pub fn catalog(&self) -> &CatalogService<S> {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }
}
