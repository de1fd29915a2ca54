use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use super::{validated, DeleteResult, EmailQuery, InsertResult, UpdateResult};
use crate::auth::{ensure_owner, Claims};
use crate::error::AppError;
use crate::models::{Booking, BookingPayload};
use crate::state::AppState;
use crate::store::StoreError;

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let Some(email) = query.email else {
        return Ok(Json(Vec::new()));
    };
    ensure_owner(&claims, &email)?;

    let bookings = state
        .with_store(move |store| store.list_bookings(&email))
        .await?;
    Ok(Json(bookings))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<BookingPayload>,
) -> Result<Json<InsertResult>, AppError> {
    let booking: Booking = validated(payload)?.into();
    let id = booking.id;
    let hotel_id = booking.product_id;

    state
        .with_store(move |store| {
            if store.get_hotel(hotel_id)?.is_none() {
                return Err(StoreError::NotFound("hotel".into()));
            }
            store.insert_booking(booking)
        })
        .await?;
    Ok(Json(InsertResult::new(id)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    state
        .with_store(move |store| store.get_booking(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("booking".into()))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResult>, AppError> {
    let deleted = state.with_store(move |store| store.delete_booking(id)).await?;
    Ok(Json(DeleteResult::new(deleted)))
}

/// `PATCH /bookings/:id`, where `:id` names the hotel: takes one room.
pub async fn reserve_room(
    State(state): State<AppState>,
    Path(hotel_id): Path<Uuid>,
) -> Result<Json<UpdateResult>, AppError> {
    let hotel = state
        .with_store(move |store| store.reserve_room(hotel_id))
        .await?;
    log::info!(
        "Reserved a room at {} ({} booked, {} left)",
        hotel.id,
        hotel.booked,
        hotel.available_room
    );
    Ok(Json(UpdateResult::new(1)))
}
