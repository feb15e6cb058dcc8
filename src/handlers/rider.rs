use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::error::AppResult;
use crate::services::booking::{self as booking_service, FarePolicy};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub pickup: String,
    pub dropoff: String,
    pub distance_km: f64,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: String,
    pub dropoff: String,
    pub distance_km: f64,
    pub fare: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<booking::Model> for BookingResponse {
    fn from(b: booking::Model) -> Self {
        Self {
            id: b.id,
            rider_id: b.rider_id,
            driver_id: b.driver_id,
            pickup: b.pickup,
            dropoff: b.dropoff,
            distance_km: b.distance_km,
            fare: b.fare,
            status: b.status,
            created_at: b.created_at.with_timezone(&Utc),
        }
    }
}

/// Request a ride
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRideRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking_service::create_booking(
        &state.db,
        FarePolicy::from(&state.config),
        claims.sub,
        &payload.pickup,
        &payload.dropoff,
        payload.distance_km,
    )
    .await?;

    tracing::info!(booking_id = %booking.id, rider_id = %claims.sub, "Ride requested");

    Ok(Json(booking.into()))
}

/// List the logged-in rider's bookings, oldest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking_service::bookings_for_rider(&state.db, claims.sub).await?;

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Cancel an accepted ride
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking_service::cancel_booking(&state.db, booking_id, claims.sub).await?;

    tracing::info!(booking_id = %booking.id, rider_id = %claims.sub, "Ride cancelled");

    Ok(Json(booking.into()))
}
