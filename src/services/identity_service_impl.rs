//! Default implementation of the `IdentityService` trait.
//!
//! Wires the directory, the credential hasher, the token issuer and the
//! security event sink together. Holds no state of its own.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::models::account::{
    Account, AccountChanges, NewAccount, NewAccountRecord, ProfileChanges,
};
use crate::security::{CredentialHasher, ExternalId, SessionToken, TokenIssuer};
use crate::services::directory::{AccountDirectory, ConflictField, DirectoryError};
use crate::services::identity_service::{IdentityError, IdentityService};

const EMAIL_MAX: usize = 100;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const FULL_NAME_MAX: usize = 100;
const BIO_MAX: usize = 2000;
const AVATAR_URL_MAX: usize = 500;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("Invalid regex pattern defined in code")
    })
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex pattern defined in code")
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), IdentityError> {
    if email.is_empty() || email.len() > EMAIL_MAX {
        return Err(IdentityError::Validation(format!(
            "Email must be between 1 and {} characters",
            EMAIL_MAX
        )));
    }
    if !email_regex().is_match(email) {
        return Err(IdentityError::Validation(
            "Email address is not well-formed".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.len() < PASSWORD_MIN || password.len() > PASSWORD_MAX {
        return Err(IdentityError::Validation(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), IdentityError> {
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(IdentityError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username_regex().is_match(username) {
        return Err(IdentityError::Validation(
            "Username may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

fn validate_length(field: &str, value: &str, max: usize) -> Result<(), IdentityError> {
    if value.len() > max {
        return Err(IdentityError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub struct DefaultIdentityService {
    directory: Arc<dyn AccountDirectory>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    events: Arc<dyn SecurityEventSink>,
}

impl DefaultIdentityService {
    #[must_use]
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            directory,
            hasher,
            tokens,
            events,
        }
    }

    fn record_duplicate(&self, field: ConflictField, email: &str) {
        self.events.record(SecurityEvent::DuplicateRegistration {
            field: field.to_string(),
            email: email.to_string(),
        });
    }
}

#[async_trait]
impl IdentityService for DefaultIdentityService {
    async fn register(&self, new_account: NewAccount) -> Result<Account, IdentityError> {
        let NewAccount {
            email,
            password,
            username,
            full_name,
        } = new_account;

        let email = normalize_email(&email);
        validate_email(&email)?;
        validate_password(&password)?;
        if let Some(ref username) = username {
            validate_username(username)?;
        }
        if let Some(ref full_name) = full_name {
            validate_length("Full name", full_name, FULL_NAME_MAX)?;
        }

        // Cheap pre-checks so the common duplicate case skips the hashing
        // work. The UNIQUE constraints behind `insert` stay authoritative.
        if self.directory.find_by_email(&email).await?.is_some() {
            self.record_duplicate(ConflictField::Email, &email);
            return Err(IdentityError::DuplicateIdentity(ConflictField::Email));
        }
        if let Some(ref username) = username
            && self.directory.find_by_username(username).await?.is_some()
        {
            self.record_duplicate(ConflictField::Username, &email);
            return Err(IdentityError::DuplicateIdentity(ConflictField::Username));
        }

        let credential_hash = self.hasher.hash(password).await?;

        let record = NewAccountRecord {
            external_id: ExternalId::allocate(),
            email: email.clone(),
            username,
            credential_hash,
            full_name,
        };

        match self.directory.insert(record).await {
            Ok(account) => Ok(account),
            Err(DirectoryError::Conflict(field)) => {
                self.record_duplicate(field, &email);
                Err(IdentityError::DuplicateIdentity(field))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        let email = normalize_email(email);

        // Unknown email and wrong password take the same exit so the two
        // cases stay observationally identical.
        let Some(account) = self.directory.find_by_email(&email).await? else {
            self.events.record(SecurityEvent::FailedLogin { email });
            return Err(IdentityError::InvalidCredentials);
        };

        let verified = self
            .hasher
            .verify(password.to_string(), account.credential_hash.clone())
            .await;
        if !verified {
            self.events.record(SecurityEvent::FailedLogin { email });
            return Err(IdentityError::InvalidCredentials);
        }

        // Checked after the password so a caller without the password
        // cannot probe whether an account is disabled.
        if !account.is_active {
            self.events
                .record(SecurityEvent::DisabledAccountLogin { email });
            return Err(IdentityError::AccountDisabled);
        }

        self.directory
            .record_login(&account.external_id.to_string())
            .await?;

        Ok(Account {
            last_login_at: Some(Utc::now()),
            ..account
        })
    }

    async fn issue_session(&self, account: &Account) -> Result<SessionToken, IdentityError> {
        Ok(self.tokens.issue(account)?)
    }

    async fn verify_session(&self, token: &str) -> Result<Account, IdentityError> {
        let claims = self.tokens.verify(token)?;

        // Fresh read: the subject may have been edited, disabled or deleted
        // since the token was signed.
        let account = self
            .directory
            .find_by_email(&claims.sub)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !account.is_active {
            return Err(IdentityError::AccountDisabled);
        }

        Ok(account)
    }

    async fn get_account(&self, external_id: &str) -> Result<Account, IdentityError> {
        self.directory
            .find_by_external_id(external_id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    async fn update_profile(
        &self,
        external_id: &str,
        changes: ProfileChanges,
    ) -> Result<Account, IdentityError> {
        if changes.is_empty() {
            return self.get_account(external_id).await;
        }

        let current = self
            .directory
            .find_by_external_id(external_id)
            .await?
            .ok_or(IdentityError::NotFound)?;

        let ProfileChanges {
            email,
            username,
            full_name,
            bio,
            avatar_url,
        } = changes;

        let email = match email {
            Some(email) => {
                let email = normalize_email(&email);
                validate_email(&email)?;
                if email == current.email {
                    None
                } else {
                    if self.directory.find_by_email(&email).await?.is_some() {
                        return Err(IdentityError::DuplicateIdentity(ConflictField::Email));
                    }
                    Some(email)
                }
            }
            None => None,
        };

        let username = match username {
            Some(username) => {
                validate_username(&username)?;
                if current.username.as_deref() == Some(username.as_str()) {
                    None
                } else {
                    if self.directory.find_by_username(&username).await?.is_some() {
                        return Err(IdentityError::DuplicateIdentity(ConflictField::Username));
                    }
                    Some(username)
                }
            }
            None => None,
        };

        if let Some(ref full_name) = full_name {
            validate_length("Full name", full_name, FULL_NAME_MAX)?;
        }
        if let Some(ref bio) = bio {
            validate_length("Bio", bio, BIO_MAX)?;
        }
        if let Some(ref avatar_url) = avatar_url {
            validate_length("Avatar URL", avatar_url, AVATAR_URL_MAX)?;
        }

        let account_changes = AccountChanges {
            email,
            username,
            full_name,
            bio,
            avatar_url,
            credential_hash: None,
        };

        // Everything supplied turned out to match what is already stored.
        if account_changes.is_empty() {
            return Ok(current);
        }

        Ok(self.directory.update(external_id, account_changes).await?)
    }

    async fn change_password(
        &self,
        external_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let account = self
            .directory
            .find_by_external_id(external_id)
            .await?
            .ok_or(IdentityError::NotFound)?;

        let verified = self
            .hasher
            .verify(current_password.to_string(), account.credential_hash)
            .await;
        if !verified {
            return Err(IdentityError::InvalidCredentials);
        }

        validate_password(new_password)?;
        if new_password == current_password {
            return Err(IdentityError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let credential_hash = self.hasher.hash(new_password.to_string()).await?;

        self.directory
            .update(
                external_id,
                AccountChanges {
                    credential_hash: Some(credential_hash),
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }

    async fn delete_account(&self, external_id: &str) -> Result<(), IdentityError> {
        let deleted = self.directory.delete(external_id).await?;
        if deleted {
            Ok(())
        } else {
            Err(IdentityError::NotFound)
        }
    }
}
