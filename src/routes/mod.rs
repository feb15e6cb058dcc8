use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, driver, rider};
use crate::middleware::auth::{auth_middleware, require_driver, require_rider};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Create role-specific governor layers
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let rider_governor = create_role_governor(RateLimitedRole::Rider);
    // Create IP-based governor for public routes (with rider-level limits)
    let public_governor = create_public_governor();

    // Public routes (with rider-level rate limiting per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor);

    // Rider routes (requires auth + rider role)
    // Rate limit: 100 requests per minute
    let rider_routes = Router::new()
        .route("/", post(rider::create_booking))
        .route("/", get(rider::my_bookings))
        .route("/{id}/cancel", post(rider::cancel_booking))
        .layer(rider_governor)
        .layer(middleware::from_fn(require_rider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    // Rate limit: 500 requests per minute
    let driver_routes = Router::new()
        .route("/bookings", get(driver::pending_bookings))
        .route("/bookings/{id}/accept", post(driver::accept_booking))
        .route("/bookings/{id}/complete", post(driver::complete_booking))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/bookings", rider_routes)
        .nest("/api/driver", driver_routes)
        .with_state(state)
}
