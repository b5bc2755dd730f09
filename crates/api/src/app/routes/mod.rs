use axum::Router;

pub mod auth;
pub mod categories;
pub mod inventory;
pub mod metadata;
pub mod onboarding;
pub mod orders;
pub mod stores;
pub mod system;
pub mod warehouses;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/onboarding", onboarding::router())
        .nest("/categories", categories::router())
        .nest("/subcategories", categories::subcategories_router())
        .nest("/metadata", metadata::router())
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router())
        .nest("/stores", stores::router())
        .nest("/warehouses", warehouses::router())
}
