use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AccountDto, ApiError, ApiResponse, AppState, SessionTokenDto};
use crate::models::account::{Account, NewAccount, ProfileChanges};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            full_name: req.full_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
        }
    }
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// The account resolved by [`auth_middleware`], available to every
/// protected handler as a request extension.
#[derive(Clone)]
pub struct CurrentAccount(pub Account);

/// Authentication middleware for protected routes.
///
/// Expects `Authorization: Bearer <token>`, verifies the token and loads
/// the live account behind it. Every failure collapses into the same 401
/// so the response never reveals why a token was rejected.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(ApiError::Unauthorized("Not authenticated".to_string()));
    };

    match state.identity().verify_session(&token).await {
        Ok(account) => {
            let account_id = account.external_id.to_string();
            tracing::Span::current().record("account_id", account_id.as_str());
            request.extensions_mut().insert(CurrentAccount(account));
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::debug!(error = %err, "Session verification failed");
            Err(ApiError::Unauthorized(
                "could not validate credentials".to_string(),
            ))
        }
    }
}

/// Extract the token from an `Authorization: Bearer` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create a new account, returns its public view with 201
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountDto>>), ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let account = state
        .identity()
        .register(NewAccount {
            email: payload.email,
            password: payload.password,
            username: payload.username,
            full_name: payload.full_name,
        })
        .await?;

    tracing::info!(account_id = %account.external_id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccountDto::from(account))),
    ))
}

/// POST /auth/login
/// Authenticate with email and password, returns a session token on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionTokenDto>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let account = state
        .identity()
        .authenticate(&payload.email, &payload.password)
        .await?;

    let token = state.identity().issue_session(&account).await?;

    Ok(Json(ApiResponse::success(SessionTokenDto::new(
        token, account,
    ))))
}

/// POST /auth/refresh
/// Issue a fresh token for the already-verified current account
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<SessionTokenDto>>, ApiError> {
    let token = state.identity().issue_session(&account).await?;

    Ok(Json(ApiResponse::success(SessionTokenDto::new(
        token, account,
    ))))
}

/// POST /auth/logout
/// Tokens are stateless and cannot be revoked server-side; clients call
/// this for symmetry and discard their copy
pub async fn logout() -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// GET /auth/me
/// Current account, as freshly loaded by the auth middleware
pub async fn get_current_account(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<ApiResponse<AccountDto>> {
    Json(ApiResponse::success(AccountDto::from(account)))
}

/// PUT /auth/me
/// Update the current account's profile
pub async fn update_current_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let updated = state
        .identity()
        .update_profile(&account.external_id.to_string(), payload.into())
        .await?;

    Ok(Json(ApiResponse::success(AccountDto::from(updated))))
}

/// PUT /auth/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .identity()
        .change_password(
            &account.external_id.to_string(),
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    tracing::info!(account_id = %account.external_id, "Password changed");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}
