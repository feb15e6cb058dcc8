use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require rider role
pub async fn require_rider(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if claims.role != UserRole::Rider {
        return Err(AppError::Forbidden("Rider access required".to_string()));
    }

    Ok(next.run(request).await)
}

/// Require driver role
pub async fn require_driver(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if claims.role != UserRole::Driver {
        return Err(AppError::Forbidden("Driver access required".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    fn claims(role: UserRole) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    async fn handler() -> &'static str {
        "ok"
    }

    fn request_as(claims: Claims) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri("/")
            .extension(claims)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn driver_guard_rejects_rider() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(from_fn(require_driver));

        let response = app.oneshot(request_as(claims(UserRole::Rider))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn driver_guard_passes_driver() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(from_fn(require_driver));

        let response = app.oneshot(request_as(claims(UserRole::Driver))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rider_guard_rejects_driver() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(from_fn(require_rider));

        let response = app.oneshot(request_as(claims(UserRole::Driver))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_claims_is_unauthorized() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(from_fn(require_driver));

        let request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
