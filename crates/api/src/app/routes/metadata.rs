use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use bazaar_catalog::{MetadataFilter, MetadataUpdate, NewMetadata};
use bazaar_core::{PageRequest, ProductId};
use bazaar_infra::Services;

use crate::app::dto::{self, JsonBody, MetadataQuery, PageBody, QueryParams, ReviewRequest};
use crate::app::errors::{ApiResult, parse_id, parse_optional_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_metadata).get(list_metadata))
        .route("/:id", get(get_metadata).patch(update_metadata))
        .route("/:id/reviews", post(add_review))
}

pub async fn create_metadata(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewMetadata>,
) -> ApiResult {
    let detail = services.create_metadata(ctx.principal(), body).await?;
    Ok(dto::created("Metadata created", detail))
}

pub async fn list_metadata(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(query): QueryParams<MetadataQuery>,
) -> ApiResult {
    let filter = MetadataFilter {
        category_id: parse_optional_id(query.category_id.as_deref())?,
        subcategory_id: parse_optional_id(query.subcategory_id.as_deref())?,
        search: query.search,
    };
    let page = PageRequest::from_query(query.offset, query.limit);
    let page = services.list_metadata(filter, page).await?;
    Ok(dto::ok("Metadata", PageBody::from(page)))
}

pub async fn get_metadata(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = parse_id(&id)?;
    Ok(dto::ok("Metadata", services.metadata(id).await?))
}

pub async fn update_metadata(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MetadataUpdate>,
) -> ApiResult {
    let id: ProductId = parse_id(&id)?;
    let metadata = services.update_metadata(ctx.principal(), id, body).await?;
    Ok(dto::ok("Metadata updated", metadata))
}

pub async fn add_review(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> ApiResult {
    let id: ProductId = parse_id(&id)?;
    let review = services.add_review(ctx.principal(), id, body.rating).await?;
    Ok(dto::created("Review recorded", review))
}
