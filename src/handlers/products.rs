use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, OptionalUser},
    services::products::ProductWithPricing,
    ApiResponse, ApiResult, AppState,
};

/// Build the products Router scoped under `/api/v1/products`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", delete(delete_product))
}

/// Catalog listing. Visibility is tier-gated: anonymous shoppers see tier 1
/// products, signed-in shoppers everything at or below their own tier.
async fn list_products(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> ApiResult<Vec<ProductWithPricing>> {
    let tier = user.map(|u| u.tier).unwrap_or(1);
    let products = state.services.products.list_for_tier(tier).await?;
    Ok(Json(ApiResponse::success(products)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductWithPricing> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Removes a product and its price tiers. Refused with 409 while any order
/// still references the product.
async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<&'static str> {
    state.services.products.delete_product(id).await?;
    Ok(Json(ApiResponse::success("deleted")))
}
