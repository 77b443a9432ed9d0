//! Ошибки HTTP-слоя.
//!
//! Тело ответа всегда `{"success": false, "message": "..."}`; конфликт мест
//! дополнительно несёт `conflict` с конкретной парой (место, день), чтобы
//! клиент мог подсказать, какое место поменять.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::Day;
use crate::services::LedgerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("seat {seat_number} is already reserved for {day}")]
    Conflict { seat_id: i64, seat_number: String, day: Day },
    #[error("{0} not found")]
    NotFound(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ConflictBody {
    seat_id: i64,
    seat_number: String,
    day: Day,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict: Option<ConflictBody>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(message) => ApiError::Validation(message),
            LedgerError::Conflict { seat_id, seat_number, day } => ApiError::Conflict { seat_id, seat_number, day },
            LedgerError::NotFound(what) => ApiError::NotFound(what),
            other @ (LedgerError::TicketCodesExhausted { .. } | LedgerError::Store(_)) => {
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("database: {}", e))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(crate::models::describe_validation_errors(&e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, conflict) = match self {
            // Детали внутренних ошибок только в лог
            ApiError::Internal(details) => {
                tracing::error!("Internal error: {}", details);
                ("Something went wrong, please try again later".to_string(), None)
            }
            ApiError::Conflict { seat_id, seat_number, day } => (
                format!("Seat {} is already reserved for {}", seat_number, day),
                Some(ConflictBody { seat_id, seat_number, day }),
            ),
            other => (other.to_string(), None),
        };

        (status, Json(ErrorBody { success: false, message, conflict })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
