use axum::{extract::State, response::Json, routing::get, Router};

use crate::{
    services::analytics::DashboardStats, ApiResponse, ApiResult, AppState,
};

/// Build the analytics Router scoped under `/api/v1/analytics`.
pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
) -> ApiResult<DashboardStats> {
    let stats = state.services.analytics.dashboard().await?;
    Ok(Json(ApiResponse::success(stats)))
}
