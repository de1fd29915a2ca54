use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use super::{validated, DeleteResult, EmailQuery, InsertResult, UpdateResult};
use crate::auth::Claims;
use crate::error::AppError;
use crate::models::{Hotel, HotelPayload, HotelStatus};
use crate::state::AppState;
use crate::store::HotelQuery;

/// Public listing: approved hotels only.
pub async fn list_approved(State(state): State<AppState>) -> Result<Json<Vec<Hotel>>, AppError> {
    let hotels = state
        .with_store(|store| store.list_hotels(&HotelQuery::approved()))
        .await?;
    Ok(Json(hotels))
}

pub async fn get_hotel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Hotel>, AppError> {
    state
        .with_store(move |store| store.get_hotel(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("hotel".into()))
}

pub async fn search(
    State(state): State<AppState>,
    Path(text): Path<String>,
) -> Result<Json<Vec<Hotel>>, AppError> {
    if text.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let hotels = state
        .with_store(move |store| store.search_hotels(&text))
        .await?;
    Ok(Json(hotels))
}

/// Listings added by one owner, whatever their status.
pub async fn list_owned(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Hotel>>, AppError> {
    let Some(email) = query.email else {
        return Ok(Json(Vec::new()));
    };
    let hotels = state
        .with_store(move |store| store.list_hotels(&HotelQuery::owned_by(email)))
        .await?;
    Ok(Json(hotels))
}

/// Moderation view: every listing, status descending.
pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Hotel>>, AppError> {
    let hotels = state
        .with_store(|store| store.list_hotels(&HotelQuery::default()))
        .await?;
    Ok(Json(hotels))
}

pub async fn create_hotel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<HotelPayload>,
) -> Result<Json<InsertResult>, AppError> {
    let hotel = Hotel::listed_by(&claims.email, validated(payload)?);
    let id = hotel.id;
    state.with_store(move |store| store.insert_hotel(hotel)).await?;
    log::info!("Hotel {} listed by {}, awaiting approval", id, claims.email);
    Ok(Json(InsertResult::new(id)))
}

pub async fn delete_hotel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, AppError> {
    let deleted = state.with_store(move |store| store.delete_hotel(id)).await?;
    Ok(Json(DeleteResult::new(deleted)))
}

pub async fn approve(
    state: State<AppState>,
    path: Path<Uuid>,
) -> Result<Json<UpdateResult>, AppError> {
    set_status(state, path, HotelStatus::Approved).await
}

pub async fn deny(state: State<AppState>, path: Path<Uuid>) -> Result<Json<UpdateResult>, AppError> {
    set_status(state, path, HotelStatus::Denied).await
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    status: HotelStatus,
) -> Result<Json<UpdateResult>, AppError> {
    let modified = state
        .with_store(move |store| store.set_hotel_status(id, status))
        .await?;
    log::info!("Hotel {} -> {} ({} modified)", id, status, modified);
    Ok(Json(UpdateResult::new(modified)))
}
