pub mod bookings;
pub mod screenings;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{BookingError, ErrorKind};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(screenings::routes())
        .merge(bookings::routes())
}

/* ---------- ошибки API ---------- */

#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    kind: ErrorKind,
    message: String,
    detail: serde_json::Value,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::SeatUnavailable | ErrorKind::AlreadyCancelled => StatusCode::CONFLICT,
        ErrorKind::TooLateToCancel => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PersistenceFailure => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn to_api_error(err: BookingError) -> (StatusCode, Json<ApiError>) {
    let kind = err.kind();
    // Детали сбоя хранилища уже в логах, наружу не отдаём
    let message = match kind {
        ErrorKind::PersistenceFailure => "Сервис временно недоступен, повторите запрос".to_string(),
        _ => err.to_string(),
    };
    (
        status_for(kind),
        Json(ApiError { success: false, kind, message, detail: err.detail() }),
    )
}

pub fn invalid_request(errors: validator::ValidationErrors) -> (StatusCode, Json<ApiError>) {
    to_api_error(BookingError::InvalidRequest(errors.to_string()))
}
