use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, patch, post},
};
use serde_json::json;

use bazaar_core::StoreId;
use bazaar_infra::Services;
use bazaar_stores::{NewStore, StoreUpdate};

use crate::app::dto::{self, JsonBody, RacksRequest};
use crate::app::errors::{ApiResult, parse_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_store))
        .route("/mine", get(my_store))
        .route(
            "/:id",
            get(get_store).patch(update_store).delete(delete_store),
        )
        .route("/:id/racks", patch(update_racks))
}

pub async fn create_store(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewStore>,
) -> ApiResult {
    let store = services.create_store(ctx.principal(), body).await?;
    Ok(dto::created("Store created", store))
}

pub async fn my_store(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> ApiResult {
    Ok(dto::ok("Store", services.my_store(ctx.principal()).await?))
}

pub async fn get_store(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: StoreId = parse_id(&id)?;
    Ok(dto::ok("Store", services.store(id).await?))
}

pub async fn update_store(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StoreUpdate>,
) -> ApiResult {
    let id: StoreId = parse_id(&id)?;
    let store = services.update_store(ctx.principal(), id, body).await?;
    Ok(dto::ok("Store updated", store))
}

pub async fn update_racks(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RacksRequest>,
) -> ApiResult {
    let id: StoreId = parse_id(&id)?;
    let store = services
        .update_store_racks(ctx.principal(), id, body.occupied_racks)
        .await?;
    Ok(dto::ok("Store racks updated", store))
}

pub async fn delete_store(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: StoreId = parse_id(&id)?;
    services.delete_store(ctx.principal(), id).await?;
    Ok(dto::ok("Store deleted", json!({})))
}
