use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::security::ids::ExternalId;

/// An account as the rest of the system sees it. The sequential storage key
/// stays inside the entity layer; `external_id` is the only identifier here.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub external_id: ExternalId,

    pub email: String,

    pub username: Option<String>,

    /// Argon2id PHC string. Stays out of every DTO.
    #[serde(skip_serializing)]
    pub credential_hash: String,

    pub is_active: bool,

    pub is_verified: bool,

    pub full_name: Option<String>,

    pub bio: Option<String>,

    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Registration input as the service receives it, password still plaintext.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// A fully prepared row for the directory: password already hashed,
/// external id already allocated.
#[derive(Debug, Clone)]
pub struct NewAccountRecord {
    pub external_id: ExternalId,
    pub email: String,
    pub username: Option<String>,
    pub credential_hash: String,
    pub full_name: Option<String>,
}

/// Patch for the mutable profile surface. `None` means "leave unchanged";
/// clearing a field back to NULL is not supported through this path.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.full_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

/// Column-level changes the directory applies verbatim. Built by the
/// service after validation; this layer does not re-validate.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub credential_hash: Option<String>,
}

impl AccountChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.full_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.credential_hash.is_none()
    }
}
