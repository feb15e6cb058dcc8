use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::rider::BookingResponse;
use crate::services::booking as booking_service;
use crate::utils::jwt::Claims;
use crate::AppState;

/// List ride requests still waiting for a driver
pub async fn pending_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking_service::pending_bookings(&state.db).await?;

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Accept a pending ride request
pub async fn accept_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking_service::accept_booking(&state.db, booking_id, claims.sub).await?;

    tracing::info!(booking_id = %booking.id, driver_id = %claims.sub, "Ride accepted");

    Ok(Json(booking.into()))
}

/// Mark an accepted ride as completed
pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking_service::complete_booking(&state.db, booking_id, claims.sub).await?;

    tracing::info!(booking_id = %booking.id, driver_id = %claims.sub, "Ride completed");

    Ok(Json(booking.into()))
}
