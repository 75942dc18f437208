use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::CurrentUser,
    handlers::common::validate_input,
    services::{
        carts::CartView,
        pricing::{PricingResult, QuoteItem},
    },
    ApiResponse, ApiResult, AppState,
};

/// Build the cart Router scoped under `/api/v1/cart`.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/calculate", post(calculate))
        .route("/", get(view_cart))
        .route("/", delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item))
        .route("/items/:product_id", delete(remove_item))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CalculateRequest {
    #[validate(length(min = 1, message = "cart must contain at least one item"))]
    pub items: Vec<QuoteItem>,
    #[serde(default)]
    pub coupon_codes: Vec<String>,
}

/// Pure pricing preview: no authentication, no reservation, no usage
/// counting. The same totals are recomputed server-side at checkout.
async fn calculate(
    State(state): State<AppState>,
    Json(payload): Json<CalculateRequest>,
) -> ApiResult<PricingResult> {
    validate_input(&payload)?;

    let result = state
        .services
        .pricing
        .quote(&payload.items, &payload.coupon_codes)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn view_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<CartView> {
    let view = state.services.carts.view_cart(user.id).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AddItemRequest>,
) -> ApiResult<CartView> {
    validate_input(&payload)?;

    let view = state
        .services
        .carts
        .add_item(user.id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 0))]
    pub quantity: i32,
}

async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<CartView> {
    validate_input(&payload)?;

    let view = state
        .services
        .carts
        .update_item(user.id, product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<CartView> {
    let view = state.services.carts.remove_item(user.id, product_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn clear_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<&'static str> {
    state.services.carts.clear_cart(user.id).await?;
    Ok(Json(ApiResponse::success("cart cleared")))
}
