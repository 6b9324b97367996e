use serde::Serialize;

use crate::db::SecurityEventRecord;
use crate::models::account::Account;
use crate::security::SessionToken;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Public view of an account. The credential hash is not a field here, so
/// it cannot leak through serialization.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub external_id: String,
    pub email: String,
    pub username: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            external_id: account.external_id.to_string(),
            email: account.email,
            username: account.username,
            is_active: account.is_active,
            is_verified: account.is_verified,
            full_name: account.full_name,
            bio: account.bio,
            avatar_url: account.avatar_url,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
            last_login_at: account.last_login_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionTokenDto {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub account: AccountDto,
}

impl SessionTokenDto {
    #[must_use]
    pub fn new(token: SessionToken, account: Account) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type.to_string(),
            expires_in: token.expires_in,
            account: AccountDto::from(account),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub total_accounts: u64,
    pub database_ok: bool,
}

#[derive(Debug, Serialize)]
pub struct SecurityEventDto {
    pub id: i64,
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub details: Option<String>,
    pub recorded_at: String,
}

impl From<SecurityEventRecord> for SecurityEventDto {
    fn from(model: SecurityEventRecord) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            severity: model.severity,
            message: model.message,
            details: model.details,
            recorded_at: model.recorded_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SecurityEventsResponse {
    pub events: Vec<SecurityEventDto>,
    pub total_pages: u64,
}
