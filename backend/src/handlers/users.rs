use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{validated, DeleteResult, InsertResult, UpdateResult};
use crate::auth::{ensure_owner, Claims};
use crate::error::AppError;
use crate::models::{User, UserPayload, UserRole};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateUserResponse {
    Inserted(InsertResult),
    Exists { message: &'static str },
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.with_store(|store| store.list_users()).await?;
    Ok(Json(users))
}

/// Registers a user on first sign-in. An existing email is reported, not an error.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<CreateUserResponse>, AppError> {
    let user: User = validated(payload)?.into();
    let id = user.id;
    let email = user.email.clone();

    let inserted = state.with_store(move |store| store.insert_user(user)).await?;
    if !inserted {
        log::info!("User {} already exists", email);
        return Ok(Json(CreateUserResponse::Exists {
            message: "User Already Exists!",
        }));
    }

    log::info!("Created user {}", email);
    Ok(Json(CreateUserResponse::Inserted(InsertResult::new(id))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, AppError> {
    let deleted = state.with_store(move |store| store.delete_user(id)).await?;
    Ok(Json(DeleteResult::new(deleted)))
}

/// `GET /users/admin/:email`: whether the caller holds the admin role.
pub async fn check_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_owner(&claims, &email)?;
    let user = state
        .with_store(move |store| store.find_user_by_email(&email))
        .await?;
    let admin = user.map_or(false, |u| u.role == UserRole::Admin);
    Ok(Json(json!({ "admin": admin })))
}

pub async fn make_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UpdateResult>, AppError> {
    let modified = state
        .with_store(move |store| store.set_user_role(id, UserRole::Admin))
        .await?;
    if modified > 0 {
        log::info!("Granted admin role to user {}", id);
    }
    Ok(Json(UpdateResult::new(modified)))
}
