use async_trait::async_trait;
use common::{AccountClass, Run};

use crate::{Account, Result, SnapshotStream};

/// Persistence for accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts an account.
    ///
    /// Fails with `Conflict` if the identity number is taken.
    async fn insert_account(&self, account: Account) -> Result<()>;

    /// Fetches all accounts, ordered by identity number.
    async fn accounts(&self) -> Result<Vec<Account>>;

    /// Observes the full account list.
    fn watch_accounts(&self) -> SnapshotStream<Account>;

    /// Fetches an account by identity number.
    async fn account(&self, run: &Run) -> Result<Option<Account>>;

    /// Fetches an account by email. The match is exact and case-sensitive.
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Replaces every field of an existing account.
    async fn update_account(&self, account: Account) -> Result<()>;

    /// Deletes an account. Returns true if it existed.
    async fn delete_account(&self, run: &Run) -> Result<bool>;

    /// Counts all accounts.
    async fn count_accounts(&self) -> Result<u64>;

    /// Counts accounts of one class.
    async fn count_by_class(&self, class: AccountClass) -> Result<u64>;

    /// Returns true if an account has this identity number.
    async fn run_exists(&self, run: &Run) -> Result<bool>;

    /// Returns true if an account has this email.
    async fn email_exists(&self, email: &str) -> Result<bool>;
}
