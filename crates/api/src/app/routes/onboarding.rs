use std::sync::Arc;

use axum::{Router, extract::Extension, routing::post};

use bazaar_infra::Services;
use bazaar_infra::services::OnboardSeller;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/sellers", post(onboard_seller))
}

/// Operational staff create seller accounts; the seller must change the
/// password on first login.
pub async fn onboard_seller(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<OnboardSeller>,
) -> ApiResult {
    let account = services.onboard_seller(ctx.principal(), body).await?;
    Ok(dto::created("Seller onboarded", account))
}
