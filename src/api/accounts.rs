use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::{CurrentAccount, MessageResponse, UpdateProfileRequest};
use super::{AccountDto, ApiError, ApiResponse, AppState};

/// GET /accounts/{external_id}
/// Look up any account by its public id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state.identity().get_account(&external_id).await?;

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// PUT /accounts/{external_id}
/// Update an account's profile by its public id
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let updated = state
        .identity()
        .update_profile(&external_id, payload.into())
        .await?;

    Ok(Json(ApiResponse::success(AccountDto::from(updated))))
}

/// DELETE /accounts/{external_id}
/// Permanently remove an account
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
    Extension(CurrentAccount(current)): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.identity().delete_account(&external_id).await?;

    tracing::info!(
        account_id = %external_id,
        deleted_by = %current.external_id,
        "Account deleted"
    );

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Account deleted".to_string(),
    })))
}
