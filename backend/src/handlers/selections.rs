use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use super::{validated, DeleteResult, EmailQuery, InsertResult};
use crate::auth::{ensure_owner, Claims};
use crate::error::AppError;
use crate::models::{Selection, SelectionPayload};
use crate::state::AppState;

pub async fn list_selections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Selection>>, AppError> {
    let Some(email) = query.email else {
        return Ok(Json(Vec::new()));
    };
    ensure_owner(&claims, &email)?;

    let selections = state
        .with_store(move |store| store.list_selections(&email))
        .await?;
    Ok(Json(selections))
}

pub async fn create_selection(
    State(state): State<AppState>,
    Json(payload): Json<SelectionPayload>,
) -> Result<Json<InsertResult>, AppError> {
    let selection: Selection = validated(payload)?.into();
    let id = selection.id;
    state
        .with_store(move |store| store.insert_selection(selection))
        .await?;
    Ok(Json(InsertResult::new(id)))
}

pub async fn delete_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, AppError> {
    let deleted = state
        .with_store(move |store| store.delete_selection(id))
        .await?;
    Ok(Json(DeleteResult::new(deleted)))
}
