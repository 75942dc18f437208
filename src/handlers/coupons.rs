use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    entities::coupon,
    handlers::common::validate_input,
    ApiResponse, ApiResult, AppState,
};

/// Build the coupons Router scoped under `/api/v1/coupons`.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons))
        .route("/validate", post(validate_coupon))
        .route("/:code", get(get_coupon))
}

/// Coupons currently worth advertising: active, unexpired, under limit.
async fn list_coupons(
    State(state): State<AppState>,
) -> ApiResult<Vec<coupon::Model>> {
    let coupons = state.services.coupons.list_available().await?;
    Ok(Json(ApiResponse::success(coupons)))
}

async fn get_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<coupon::Model> {
    let coupon = state.services.coupons.get_by_code(&code).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub coupon: coupon::Model,
}

/// Full single-coupon check. Invalid coupons surface as the usual 4xx
/// errors naming the code, so clients can show the exact reason.
async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> ApiResult<ValidateCouponResponse> {
    validate_input(&payload)?;

    let coupon = state.services.coupons.check_valid(&payload.code).await?;
    Ok(Json(ApiResponse::success(ValidateCouponResponse {
        valid: true,
        coupon,
    })))
}
