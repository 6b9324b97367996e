//! Domain service for account registration and authentication.
//!
//! Handles the full account lifecycle: registration, login, session token
//! verification, profile updates, password changes and deletion.

use thiserror::Error;

use crate::models::account::{Account, NewAccount, ProfileChanges};
use crate::security::{SessionToken, TokenError};
use crate::services::directory::{ConflictField, DirectoryError};

/// Errors specific to identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The chosen email or username is already held by another account.
    #[error("{0} is already taken")]
    DuplicateIdentity(ConflictField),

    /// Unknown email or wrong password. The two cases are deliberately the
    /// same variant so callers cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials were correct but the account is deactivated. Only raised
    /// after the password check, so it never leaks account state to a caller
    /// who does not hold the password.
    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Account not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for IdentityError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict(field) => Self::DuplicateIdentity(field),
            DirectoryError::NotFound => Self::NotFound,
            DirectoryError::Database(message) => Self::Database(message),
        }
    }
}

impl From<anyhow::Error> for IdentityError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for the account lifecycle.
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Creates a new account from registration input.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Validation`] for malformed input and
    /// [`IdentityError::DuplicateIdentity`] when the email or username is
    /// already taken, no matter how narrowly the race was lost.
    async fn register(&self, new_account: NewAccount) -> Result<Account, IdentityError>;

    /// Verifies credentials and returns the account on success.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] for an unknown email
    /// and for a wrong password alike, [`IdentityError::AccountDisabled`]
    /// when the password was right but the account is deactivated.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, IdentityError>;

    /// Signs a fresh session token for an already-authenticated account.
    async fn issue_session(&self, account: &Account) -> Result<SessionToken, IdentityError>;

    /// Verifies a session token and loads the live account behind it.
    ///
    /// The account is re-read on every call, so profile edits made after
    /// issuance are visible and deleted or deactivated accounts are rejected
    /// even while their tokens are still within the expiry window.
    async fn verify_session(&self, token: &str) -> Result<Account, IdentityError>;

    /// Looks up an account by its public identifier.
    async fn get_account(&self, external_id: &str) -> Result<Account, IdentityError>;

    /// Applies a partial profile update. Absent fields stay untouched.
    async fn update_profile(
        &self,
        external_id: &str,
        changes: ProfileChanges,
    ) -> Result<Account, IdentityError>;

    /// Replaces the stored credential after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] if `current_password`
    /// does not match; the stored hash is left untouched in that case.
    async fn change_password(
        &self,
        external_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;

    /// Permanently removes an account.
    async fn delete_account(&self, external_id: &str) -> Result<(), IdentityError>;
}
