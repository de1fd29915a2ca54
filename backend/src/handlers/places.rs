use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Place;
use crate::state::AppState;

pub async fn list_places(State(state): State<AppState>) -> Result<Json<Vec<Place>>, AppError> {
    let places = state.with_store(|store| store.list_places()).await?;
    Ok(Json(places))
}

pub async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Place>, AppError> {
    state
        .with_store(move |store| store.get_place(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("place".into()))
}
