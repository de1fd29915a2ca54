use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized access")]
    Unauthorized,

    #[error("forbidden access")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid payload: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("payment rejected: {0}")]
    PaymentRejected(String),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::NoRoomsLeft(_) | StoreError::Duplicate(_) => {
                AppError::Conflict(e.to_string())
            }
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRejected(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                "internal server error".to_string()
            }
            AppError::Gateway(_) => {
                log::error!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": true, "message": message }))).into_response()
    }
}
