use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::{invalid_request, to_api_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{BookingId, ScreeningId, SeatId};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(get_user_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/cancel", patch(cancel_booking))
        .route("/bookings/confirmPayment", patch(confirm_payment))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "screening_id должен быть > 0"))]
    pub screening_id: ScreeningId,
    #[validate(length(min = 1, message = "нужно выбрать хотя бы одно место"))]
    pub seat_ids: Vec<SeatId>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(invalid_request)?;

    let view = state
        .ledger
        .create_booking(user.user_id, req.screening_id, &req.seat_ids)
        .await
        .map_err(to_api_error)?;

    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let bookings = state
        .ledger
        .bookings_for_user(user.user_id)
        .await
        .map_err(to_api_error)?;

    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<impl IntoResponse> {
    let view = state
        .ledger
        .get_booking(booking_id, user.user_id)
        .await
        .map_err(to_api_error)?;

    Ok((StatusCode::OK, Json(view)))
}

// PATCH /api/bookings/cancel
#[derive(Debug, Deserialize, Validate)]
pub struct BookingActionRequest {
    #[validate(range(min = 1, message = "booking_id должен быть > 0"))]
    pub booking_id: BookingId,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookingActionRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(invalid_request)?;

    let booking = state
        .ledger
        .cancel_booking(req.booking_id, user.user_id)
        .await
        .map_err(to_api_error)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "message": format!("Бронь {} отменена, места освобождены", booking.booking_number),
            "booking": booking,
        })),
    ))
}

// PATCH /api/bookings/confirmPayment
async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookingActionRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(invalid_request)?;

    let booking = state
        .ledger
        .confirm_payment(req.booking_id, user.user_id)
        .await
        .map_err(to_api_error)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "booking": booking })),
    ))
}
