//! Route handlers, one module per collection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

pub mod bookings;
pub mod hotels;
pub mod payments;
pub mod places;
pub mod selections;
pub mod token;
pub mod users;

/// `?email=` filter used by the per-user listings.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: usize,
}

impl DeleteResult {
    pub fn new(deleted_count: usize) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub modified_count: usize,
}

impl UpdateResult {
    pub fn new(modified_count: usize) -> Self {
        Self {
            acknowledged: true,
            modified_count,
        }
    }
}

pub(crate) fn validated<T: Validate>(payload: T) -> Result<T, AppError> {
    payload.validate()?;
    Ok(payload)
}
