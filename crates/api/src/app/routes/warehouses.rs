use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};
use serde_json::json;

use bazaar_core::WarehouseId;
use bazaar_infra::Services;
use bazaar_stores::{NewWarehouse, WarehouseUpdate};

use crate::app::dto::{self, JsonBody, PageBody, PageQuery, QueryParams};
use crate::app::errors::{ApiResult, parse_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_warehouse).get(list_warehouses))
        .route(
            "/:id",
            get(get_warehouse)
                .patch(update_warehouse)
                .delete(delete_warehouse),
        )
        .route("/:id/stores", get(list_stores))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewWarehouse>,
) -> ApiResult {
    let warehouse = services.create_warehouse(ctx.principal(), body).await?;
    Ok(dto::created("Warehouse created", warehouse))
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResult {
    let page = services.warehouses(query.page()).await?;
    Ok(dto::ok("Warehouses", PageBody::from(page)))
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: WarehouseId = parse_id(&id)?;
    Ok(dto::ok("Warehouse", services.warehouse(id).await?))
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<WarehouseUpdate>,
) -> ApiResult {
    let id: WarehouseId = parse_id(&id)?;
    let warehouse = services.update_warehouse(ctx.principal(), id, body).await?;
    Ok(dto::ok("Warehouse updated", warehouse))
}

pub async fn delete_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: WarehouseId = parse_id(&id)?;
    services.delete_warehouse(ctx.principal(), id).await?;
    Ok(dto::ok("Warehouse deleted", json!({})))
}

pub async fn list_stores(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: WarehouseId = parse_id(&id)?;
    Ok(dto::ok("Stores", services.stores_in_warehouse(id).await?))
}
