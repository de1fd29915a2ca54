use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::validated;
use crate::auth;
use crate::error::AppError;
use crate::models::TokenRequest;
use crate::state::AppState;

/// `POST /jwt`
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<Value>, AppError> {
    let request = validated(request)?;
    let token = auth::create_token(&request.email, &state.config.access_token_secret)
        .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;
    log::info!("Issued token for {}", request.email);
    Ok(Json(json!({ "token": token })))
}
