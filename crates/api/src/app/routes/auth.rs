use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use serde_json::json;

use bazaar_infra::Services;
use bazaar_infra::services::SignUp;

use crate::app::dto::{self, ChangePasswordRequest, JsonBody, LoginRequest};
use crate::app::errors::ApiResult;
use crate::context::PrincipalContext;

/// Authenticated account endpoints. Login and signup are mounted publicly.
pub fn router() -> Router {
    Router::new()
        .route("/password", post(change_password))
        .route("/me", get(me))
}

pub async fn login(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult {
    let outcome = services.login(body.role, &body.email, &body.password).await?;
    Ok(dto::ok("Login successful", outcome))
}

pub async fn sign_up(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<SignUp>,
) -> ApiResult {
    let account = services.sign_up(body).await?;
    Ok(dto::created("Account created", account))
}

pub async fn change_password(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> ApiResult {
    services
        .change_password(ctx.principal(), &body.current_password, &body.new_password)
        .await?;
    Ok(dto::ok("Password changed", json!({})))
}

pub async fn me(
    Extension(services): Extension<Arc<Services>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> ApiResult {
    let account = services.profile(ctx.principal()).await?;
    Ok(dto::ok("Profile", account))
}
