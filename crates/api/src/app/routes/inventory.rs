use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};
use serde_json::json;

use bazaar_core::{InventoryId, InventoryProductId, PageRequest};
use bazaar_infra::{ServiceError, Services};
use bazaar_inventory::{InventoryProductUpdate, InventoryQuery, InventorySort};

use crate::app::dto::{self, AddInventoryRequest, InventoryListQuery, JsonBody, PageBody, QueryParams};
use crate::app::errors::{ApiResult, parse_id, parse_optional_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_inventory).get(list_inventory))
        .route(
            "/:inventory_id/products/:product_id",
            get(get_inventory_product)
                .patch(update_inventory_product)
                .delete(delete_inventory_product),
        )
}

pub async fn add_inventory(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<AddInventoryRequest>,
) -> ApiResult {
    let added = services.add_inventory(ctx.principal(), body.products).await?;
    Ok(dto::created("Inventory updated", added))
}

/// Sellers list their own inventory; operational staff pass `sellerId`.
pub async fn list_inventory(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<InventoryListQuery>,
) -> ApiResult {
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<InventorySort>().map_err(ServiceError::from)?,
        None => InventorySort::default(),
    };
    let seller_id = parse_optional_id(query.seller_id.as_deref())?;
    let inventory_query = InventoryQuery {
        search: query.search,
        sort,
        page: PageRequest::from_query(query.offset, query.limit),
    };

    let page = services
        .inventory_view(ctx.principal(), seller_id, inventory_query)
        .await?;
    Ok(dto::ok("Inventory", PageBody::from(page)))
}

pub async fn get_inventory_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((inventory_id, product_id)): Path<(String, String)>,
) -> ApiResult {
    let (inventory_id, product_id) = line_ids(&inventory_id, &product_id)?;
    let detail = services
        .inventory_item(ctx.principal(), inventory_id, product_id)
        .await?;
    Ok(dto::ok("Inventory product", detail))
}

pub async fn update_inventory_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((inventory_id, product_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<InventoryProductUpdate>,
) -> ApiResult {
    let (inventory_id, product_id) = line_ids(&inventory_id, &product_id)?;
    let product = services
        .update_inventory_product(ctx.principal(), inventory_id, product_id, body)
        .await?;
    Ok(dto::ok("Inventory product updated", product))
}

pub async fn delete_inventory_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((inventory_id, product_id)): Path<(String, String)>,
) -> ApiResult {
    let (inventory_id, product_id) = line_ids(&inventory_id, &product_id)?;
    services
        .delete_inventory_product(ctx.principal(), inventory_id, product_id)
        .await?;
    Ok(dto::ok("Inventory product deleted", json!({})))
}

fn line_ids(
    inventory_id: &str,
    product_id: &str,
) -> Result<(InventoryId, InventoryProductId), crate::app::errors::ApiError> {
    Ok((parse_id(inventory_id)?, parse_id(product_id)?))
}
