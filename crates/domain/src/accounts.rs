//! Account registration, login and profile edits.

use chrono::{Local, NaiveDate};
use common::{AccountClass, Run};
use store::{ACCOUNT_EMAIL, Account, AccountStore, SnapshotStream, StoreError};

use crate::credentials::Credentials;
use crate::error::{DomainError, Result};
use crate::validation::{ProfileForm, RegistrationForm, ValidationError};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Turns a uniqueness clash raced past the pre-checks into the same
/// validation error the pre-check would have given.
fn taken(err: StoreError) -> DomainError {
    if err.is_conflict_on(ACCOUNT_EMAIL) {
        ValidationError::EmailTaken.into()
    } else if err.is_conflict_on("account") {
        ValidationError::RunTaken.into()
    } else {
        err.into()
    }
}

/// Service for managing accounts.
#[derive(Debug, Clone)]
pub struct AccountService<S: AccountStore> {
    store: S,
    credentials: Credentials,
}

impl<S: AccountStore> AccountService<S> {
    /// Creates an account service with the given store and password hasher.
    pub fn new(store: S, credentials: Credentials) -> Self {
        Self { store, credentials }
    }

    /// Registers a customer account.
    #[tracing::instrument(skip(self, form), fields(run = %form.run))]
    pub async fn register(&self, form: RegistrationForm) -> Result<Account> {
        self.create_account(form, AccountClass::Customer).await
    }

    /// Creates an account of the given class.
    ///
    /// Duplicate identity number and email are checked before the form
    /// rules, matching the order in which sign-up reports problems.
    #[tracing::instrument(skip(self, form), fields(run = %form.run))]
    pub async fn create_account(
        &self,
        form: RegistrationForm,
        class: AccountClass,
    ) -> Result<Account> {
        if let Err(reason) = self.check_registration(&form).await? {
            tracing::debug!(%reason, "registration rejected");
            return Err(reason.into());
        }

        let account = Account {
            run: form.run(),
            name: form.name.trim().to_string(),
            surnames: form.surnames.trim().to_string(),
            email: form.email.trim().to_string(),
            password_hash: self.credentials.hash(&form.password)?,
            phone: form.phone,
            birth_date: form.birth_date,
            class,
            region: form.region,
            comuna: form.comuna,
            address: form.address.trim().to_string(),
        };
        self.store.insert_account(account.clone()).await.map_err(taken)?;

        metrics::counter!("accounts_registered_total", "class" => class.as_str()).increment(1);
        tracing::info!(run = %account.run, %class, "account registered");
        Ok(account)
    }

    async fn check_registration(
        &self,
        form: &RegistrationForm,
    ) -> Result<std::result::Result<(), ValidationError>> {
        if self.store.run_exists(&form.run()).await? {
            return Ok(Err(ValidationError::RunTaken));
        }
        if self.store.email_exists(form.email.trim()).await? {
            return Ok(Err(ValidationError::EmailTaken));
        }
        Ok(form.validate(today()))
    }

    /// Returns the account for `email` if the password matches.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Account>> {
        let account = self.store.account_by_email(email.trim()).await?;
        match account {
            Some(account) if self.credentials.verify(password, &account.password_hash) => {
                Ok(Some(account))
            }
            _ => {
                metrics::counter!("login_failures_total").increment(1);
                tracing::debug!("login failed");
                Ok(None)
            }
        }
    }

    /// Fetches an account.
    pub async fn account(&self, run: &Run) -> Result<Option<Account>> {
        Ok(self.store.account(run).await?)
    }

    /// Lists every account.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.store.accounts().await?)
    }

    /// Streams the account list, re-emitted on every change.
    pub fn watch_accounts(&self) -> SnapshotStream<Account> {
        self.store.watch_accounts()
    }

    /// Deletes an account. Returns false if it did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, run: &Run) -> Result<bool> {
        Ok(self.store.delete_account(run).await?)
    }

    /// Applies a profile edit.
    ///
    /// A blank password keeps the stored hash. Identity number and account
    /// class cannot be changed here, and the email must not belong to
    /// another account.
    #[tracing::instrument(skip(self, form))]
    pub async fn update_profile(&self, run: &Run, form: ProfileForm) -> Result<Account> {
        let current = self
            .store
            .account(run)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(run.clone()))?;

        if let Err(reason) = form.validate(today()) {
            tracing::debug!(%reason, "profile edit rejected");
            return Err(reason.into());
        }
        if let Some(owner) = self.store.account_by_email(form.email.trim()).await?
            && owner.run != current.run
        {
            tracing::debug!("profile edit rejected: email belongs to another account");
            return Err(ValidationError::EmailTaken.into());
        }

        let password_hash = match form.new_password() {
            Some(password) => self.credentials.hash(password)?,
            None => current.password_hash,
        };
        let account = Account {
            run: current.run,
            name: form.name.trim().to_string(),
            surnames: form.surnames.trim().to_string(),
            email: form.email.trim().to_string(),
            password_hash,
            phone: form.phone,
            birth_date: form.birth_date,
            class: current.class,
            region: form.region,
            comuna: form.comuna,
            address: form.address.trim().to_string(),
        };
        self.store.update_account(account.clone()).await.map_err(taken)?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryStore, SqliteStore};

    fn service() -> AccountService<InMemoryStore> {
        AccountService::new(InMemoryStore::new(), Credentials::new(1024, 1).unwrap())
    }

    fn form() -> RegistrationForm {
        RegistrationForm {
            run: "20.694.795-0".to_string(),
            name: "Marco".to_string(),
            surnames: "Suazo Fuentes".to_string(),
            email: "marco.suazo@duoc.cl".to_string(),
            password: "123321".to_string(),
            password_confirmation: "123321".to_string(),
            phone: "965224865".to_string(),
            birth_date: "05-04-2000".to_string(),
            region: "Región Metropolitana de Santiago".to_string(),
            comuna: "San Bernardo".to_string(),
            address: "El Pasaje 287".to_string(),
        }
    }

    fn profile() -> ProfileForm {
        let form = form();
        ProfileForm {
            name: form.name,
            surnames: form.surnames,
            email: form.email,
            password: String::new(),
            password_confirmation: String::new(),
            phone: form.phone,
            birth_date: form.birth_date,
            region: form.region,
            comuna: form.comuna,
            address: "Nueva Dirección 100".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalises_and_hashes() {
        let service = service();
        let account = service.register(form()).await.unwrap();

        assert_eq!(account.run.as_str(), "206947950");
        assert_eq!(account.class, AccountClass::Customer);
        assert_ne!(account.password_hash, "123321");
        assert!(account.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicates_are_checked_first() {
        let service = service();
        service.register(form()).await.unwrap();

        // Duplicate identity number wins over every other problem.
        let mut again = form();
        again.name = "X".to_string();
        let err = service.register(again).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::RunTaken)));

        let mut same_email = form();
        same_email.run = "11.111.111-1".to_string();
        let err = service.register(same_email).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_invalid_form_writes_nothing() {
        let service = service();
        let mut bad = form();
        bad.email = "marco@hotmail.com".to_string();

        let err = service.register(bad).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::EmailDomain)));
        assert!(service.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_admin_account() {
        let service = service();
        let account = service.create_account(form(), AccountClass::Admin).await.unwrap();
        assert!(account.is_admin());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let service = service();
        service.register(form()).await.unwrap();

        let account = service
            .authenticate("marco.suazo@duoc.cl", "123321")
            .await
            .unwrap();
        assert_eq!(account.unwrap().name, "Marco");

        assert!(service.authenticate("marco.suazo@duoc.cl", "wrong").await.unwrap().is_none());
        assert!(service.authenticate("nobody@duoc.cl", "123321").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_password_when_blank() {
        let service = service();
        let account = service.register(form()).await.unwrap();

        let updated = service.update_profile(&account.run, profile()).await.unwrap();
        assert_eq!(updated.address, "Nueva Dirección 100");
        assert_eq!(updated.password_hash, account.password_hash);
        assert!(service.authenticate("marco.suazo@duoc.cl", "123321").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_changes_password() {
        let service = service();
        let account = service.register(form()).await.unwrap();

        let mut edit = profile();
        edit.password = "nueva1".to_string();
        edit.password_confirmation = "nueva1".to_string();
        service.update_profile(&account.run, edit).await.unwrap();

        assert!(service.authenticate("marco.suazo@duoc.cl", "123321").await.unwrap().is_none());
        assert!(service.authenticate("marco.suazo@duoc.cl", "nueva1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_rejections() {
        let service = service();
        let err = service
            .update_profile(&Run::new("20694795-0"), profile())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccountNotFound(_)));

        let account = service.register(form()).await.unwrap();
        let mut edit = profile();
        edit.comuna = String::new();
        let err = service.update_profile(&account.run, edit).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::ComunaRequired)));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_email_of_another_account() {
        let service = service();
        service.register(form()).await.unwrap();
        let mut second = form();
        second.run = "11.111.111-1".to_string();
        second.email = "ana.rojas@duoc.cl".to_string();
        let second = service.register(second).await.unwrap();

        let err = service.update_profile(&second.run, profile()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::EmailTaken)));

        let stored = service.account(&second.run).await.unwrap().unwrap();
        assert_eq!(stored.email, "ana.rojas@duoc.cl");
        let owner = service.authenticate("marco.suazo@duoc.cl", "123321").await.unwrap();
        assert_eq!(owner.unwrap().run.as_str(), "206947950");
    }

    #[tokio::test]
    async fn test_concurrent_registrations_with_same_email() {
        let store = SqliteStore::in_memory().await.unwrap();
        let service = AccountService::new(store, Credentials::new(1024, 1).unwrap());
        let mut other = form();
        other.run = "11.111.111-1".to_string();

        let (a, b) = tokio::join!(service.register(form()), service.register(other));
        assert!(a.is_ok() ^ b.is_ok());
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, DomainError::Validation(ValidationError::EmailTaken)));

        let owners = service
            .accounts()
            .await
            .unwrap()
            .into_iter()
            .filter(|account| account.email == "marco.suazo@duoc.cl")
            .count();
        assert_eq!(owners, 1);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let service = service();
        let account = service.register(form()).await.unwrap();
        assert!(service.delete_account(&account.run).await.unwrap());
        assert!(!service.delete_account(&account.run).await.unwrap());
        assert!(service.account(&account.run).await.unwrap().is_none());
    }
}
