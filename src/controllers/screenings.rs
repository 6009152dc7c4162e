use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::{invalid_request, to_api_error, ApiResult};
use crate::middleware::AdminUser;
use crate::models::ScreeningId;
use crate::services::availability::SeatAvailability;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/screenings/{id}/seats", get(get_seats))
        .route("/screenings/deactivate", patch(deactivate_screening))
}

#[derive(Debug, Serialize)]
struct SeatMapResponse {
    screening_id: ScreeningId,
    max_seats_per_booking: usize,
    seats: Vec<SeatAvailability>,
}

// GET /api/screenings/{id}/seats
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Path(screening_id): Path<ScreeningId>,
) -> ApiResult<impl IntoResponse> {
    let seats = state.ledger.seat_map(screening_id).await.map_err(to_api_error)?;

    Ok((
        StatusCode::OK,
        Json(SeatMapResponse {
            screening_id,
            max_seats_per_booking: state.ledger.max_seats_per_booking(),
            seats,
        }),
    ))
}

// PATCH /api/screenings/deactivate
#[derive(Debug, Deserialize, Validate)]
struct DeactivateRequest {
    #[validate(range(min = 1, message = "screening_id должен быть > 0"))]
    screening_id: ScreeningId,
}

async fn deactivate_screening(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<DeactivateRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(invalid_request)?;

    let cancelled = state
        .ledger
        .deactivate_screening(req.screening_id)
        .await
        .map_err(to_api_error)?;

    tracing::info!("screening {} deactivated by {}", req.screening_id, admin.email);

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "cancelled_bookings": cancelled })),
    ))
}
