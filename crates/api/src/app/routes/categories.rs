use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use bazaar_catalog::{NewCategory, NewSubcategory};
use bazaar_core::{CategoryId, SubcategoryId};
use bazaar_infra::Services;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::{ApiResult, parse_id};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route("/:id", get(get_category))
        .route("/:id/subcategories", get(list_subcategories))
}

pub fn subcategories_router() -> Router {
    Router::new()
        .route("/", post(create_subcategory))
        .route("/:id", get(get_subcategory))
}

pub async fn create_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewCategory>,
) -> ApiResult {
    let category = services.create_category(ctx.principal(), body).await?;
    Ok(dto::created("Category created", category))
}

pub async fn list_categories(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    Ok(dto::ok("Categories", services.categories().await?))
}

pub async fn get_category(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = parse_id(&id)?;
    Ok(dto::ok("Category", services.category(id).await?))
}

pub async fn list_subcategories(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = parse_id(&id)?;
    Ok(dto::ok("Subcategories", services.subcategories(id).await?))
}

pub async fn create_subcategory(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewSubcategory>,
) -> ApiResult {
    let subcategory = services.create_subcategory(ctx.principal(), body).await?;
    Ok(dto::created("Subcategory created", subcategory))
}

pub async fn get_subcategory(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SubcategoryId = parse_id(&id)?;
    Ok(dto::ok("Subcategory", services.subcategory(id).await?))
}
