use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::validate_input,
    services::orders::{BillResponse, OrderHistoryEntry, OrderItemRequest, OrderService},
    ApiResponse, ApiResult, AppState,
};

/// Build the orders Router scoped under `/api/v1/orders`.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/history", get(order_history))
        .route("/:id", get(get_order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub coupon_codes: Vec<String>,
}

/// Checkout. Lines are billed at their quoted prices; coupon discounts and
/// totals are recomputed server-side. The response is the committed bill.
async fn place_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> ApiResult<BillResponse> {
    validate_input(&payload)?;

    let bill = state
        .services
        .orders
        .place_order(&user, &payload.items, &payload.coupon_codes)
        .await?;
    Ok(Json(ApiResponse::success(bill)))
}

/// The caller's order history, oldest first. Entries written before
/// structured snapshots existed come back as bare order-id strings.
async fn order_history(
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<OrderHistoryEntry>> {
    let history = OrderService::parse_history(&user)?;
    Ok(Json(ApiResponse::success(history)))
}

/// Bill lookup, owner-only: the order must belong to the caller's email.
async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<BillResponse> {
    let bill = state.services.orders.get_bill(id).await?;
    if bill.order.customer_email != user.email {
        return Err(ServiceError::Forbidden(
            "order belongs to another customer".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(bill)))
}
