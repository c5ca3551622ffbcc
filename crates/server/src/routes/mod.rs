//! HTTP route handlers for the catalog service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness check
//! GET    /health/ready         - Readiness check (document store reachable)
//! GET    /api/                 - Service status
//!
//! # Products
//! POST   /api/add-product      - Create a product (multipart, admin)
//! GET    /api/products         - List products, newest first
//! PUT    /api/products/{id}    - Update a product (multipart or JSON, admin)
//! DELETE /api/products/{id}    - Delete a product and its image (admin)
//!
//! # Accounts
//! POST   /api/signup           - Register an account
//! POST   /api/login            - Password login
//! ```
//!
//! Admin routes identify the caller through the `X-User-Id` header.

pub mod auth;
pub mod health;
pub mod products;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Largest accepted request body. Bounds image uploads.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The API routes, without state or layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/", get(health::status))
        .route("/api/add-product", post(products::create))
        .route("/api/products", get(products::list))
        .route(
            "/api/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login))
}

/// The full application: health checks, API routes and the request layers.
///
/// Sentry layers are added by the binary so tests can drive this router
/// without a Sentry client.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
