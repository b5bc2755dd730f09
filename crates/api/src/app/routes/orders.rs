use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use bazaar_core::OrderId;
use bazaar_infra::Services;
use bazaar_orders::NewOrder;

use crate::app::dto::{self, JsonBody, PageBody, PageQuery, QueryParams};
use crate::app::errors::{ApiResult, parse_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/mine", get(my_orders))
        .route("/seller", get(seller_orders))
        .route("/:id", get(get_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewOrder>,
) -> ApiResult {
    let order = services.place_order(ctx.principal(), body).await?;
    Ok(dto::created("Order placed", order))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResult {
    let page = services.orders(ctx.principal(), query.page()).await?;
    Ok(dto::ok("Orders", PageBody::from(page)))
}

pub async fn my_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> ApiResult {
    Ok(dto::ok("Orders", services.my_orders(ctx.principal()).await?))
}

pub async fn seller_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> ApiResult {
    Ok(dto::ok("Orders", services.seller_orders(ctx.principal()).await?))
}

pub async fn get_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrderId = parse_id(&id)?;
    Ok(dto::ok("Order", services.order(ctx.principal(), id).await?))
}
