//! HTTP application wiring.
//!
//! - `services.rs`: storage and token service wiring from [`AppConfig`]
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: response envelope, extractors and request bodies
//! - `errors.rs`: error-to-status mapping

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use bazaar_auth::JwtValidator;
use bazaar_infra::{AppConfig, Services};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let wiring = services::build_services(cfg).await?;
    Ok(build_router(wiring.services, wiring.jwt))
}

/// Router over already-built services.
pub fn build_router(services: Arc<Services>, jwt: Arc<dyn JwtValidator>) -> Router {
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/signup", post(routes::auth::sign_up))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
