use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::CurrentUser,
    entities::user,
    handlers::common::validate_input,
    ApiResponse, ApiResult, AppState,
};

/// Build the auth Router scoped under `/api/v1/auth`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/me", get(me))
        .route("/update-tier/:user_id", put(update_tier))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: user::Model,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTierRequest {
    #[validate(range(min = 1, max = 3))]
    pub tier: i32,
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<AuthResponse> {
    validate_input(&payload)?;

    let (user, token) = state
        .services
        .users
        .signup(&payload.email, &payload.password, payload.name)
        .await?;

    Ok(Json(ApiResponse::success(AuthResponse { token, user })))
}

async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> ApiResult<AuthResponse> {
    validate_input(&payload)?;

    let (user, token) = state
        .services
        .users
        .signin(&payload.email, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(AuthResponse { token, user })))
}

async fn me(CurrentUser(user): CurrentUser) -> ApiResult<user::Model> {
    Ok(Json(ApiResponse::success(user)))
}

async fn update_tier(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateTierRequest>,
) -> ApiResult<user::Model> {
    validate_input(&payload)?;

    let updated = state.services.users.update_tier(user_id, payload.tier).await?;
    Ok(Json(ApiResponse::success(updated)))
}
