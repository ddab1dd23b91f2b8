//! Storage contracts consumed by the API layer.
//!
//! Every operation is synchronous and either returns a value or a
//! [`StoreError`]. Lookups that find nothing return `None`, never an error.
//! The API runs these on the blocking thread pool.

use coinbank_types::models::{Account, ExternalIdentity};

use crate::{Database, StoreError};

pub trait AccountDirectory: Send + Sync {
    fn create_account(&self, first_name: &str, last_name: &str) -> Result<Account, StoreError>;
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
    fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError>;
    fn delete_account(&self, id: i64) -> Result<bool, StoreError>;

    /// Accepted for interface compatibility; it never changes stored state.
    fn update_account(&self, _account: &Account) -> Result<(), StoreError> {
        Ok(())
    }
}

pub trait IdentityStore: Send + Sync {
    fn external_identity_exists(&self, id: &str) -> Result<bool, StoreError>;
    /// Must fail with [`StoreError::Duplicate`] when the id is already stored.
    fn create_external_identity(&self, identity: &ExternalIdentity) -> Result<(), StoreError>;
    fn save_login_state(&self, state: &str, issued_at: i64, expire_before: i64) -> Result<(), StoreError>;
    fn consume_login_state(&self, state: &str, not_before: i64) -> Result<bool, StoreError>;
}

impl AccountDirectory for Database {
    fn create_account(&self, first_name: &str, last_name: &str) -> Result<Account, StoreError> {
        Database::create_account(self, first_name, last_name)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Database::list_accounts(self)
    }

    fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Database::get_account(self, id)
    }

    fn delete_account(&self, id: i64) -> Result<bool, StoreError> {
        Database::delete_account(self, id)
    }
}

impl IdentityStore for Database {
    fn external_identity_exists(&self, id: &str) -> Result<bool, StoreError> {
        Database::external_identity_exists(self, id)
    }

    fn create_external_identity(&self, identity: &ExternalIdentity) -> Result<(), StoreError> {
        Database::create_external_identity(self, identity)
    }

    fn save_login_state(&self, state: &str, issued_at: i64, expire_before: i64) -> Result<(), StoreError> {
        Database::save_login_state(self, state, issued_at, expire_before)
    }

    fn consume_login_state(&self, state: &str, not_before: i64) -> Result<bool, StoreError> {
        Database::consume_login_state(self, state, not_before)
    }
}
