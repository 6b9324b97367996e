//! Storage contract for account records.
//!
//! The directory is the only way the rest of the crate touches persisted
//! accounts. Uniqueness of email and username is enforced by the backing
//! store itself, so two concurrent inserts of the same email resolve to
//! exactly one stored record and one [`DirectoryError::Conflict`].

use async_trait::async_trait;

use crate::models::account::{Account, AccountChanges, NewAccountRecord};

/// Which unique column an insert or update collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Username,
}

impl std::fmt::Display for ConflictField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Username => write!(f, "username"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0} is already taken")]
    Conflict(ConflictField),
    #[error("account not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Database(String),
}

/// Lookup and mutation operations over stored accounts.
///
/// Lookups take the caller's input verbatim. A string that cannot match any
/// stored value (wrong shape, unknown id) is not an error, it just finds
/// nothing.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<Account>, DirectoryError>;

    /// Persist a new account. The store decides atomically whether the
    /// unique columns are free; losing a race surfaces as `Conflict`.
    async fn insert(&self, record: NewAccountRecord) -> Result<Account, DirectoryError>;

    /// Apply `changes` to the account with the given external id and return
    /// the updated record. Fields left as `None` keep their stored value.
    async fn update(
        &self,
        external_id: &str,
        changes: AccountChanges,
    ) -> Result<Account, DirectoryError>;

    /// Remove an account. Returns whether a record was actually deleted.
    async fn delete(&self, external_id: &str) -> Result<bool, DirectoryError>;

    /// Stamp the account's last successful login time.
    async fn record_login(&self, external_id: &str) -> Result<(), DirectoryError>;

    async fn count(&self) -> Result<u64, DirectoryError>;
}
