//! Account lifecycle and tier-gated catalog visibility.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::json;
use uuid::Uuid;

use bulkcart_api::entities::product;

async fn seed_tiered_catalog(app: &TestApp) {
    app.seed_product("Everyday Tarp", dec!(15.00), 100, &[]).await;
    for (name, tier) in [("Contractor Hoist", 2), ("Freight Elevator", 3)] {
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            base_price: Set(dec!(999.00)),
            stock_quantity: Set(5),
            image_url: Set(String::new()),
            category: Set("heavy".to_string()),
            tier: Set(tier),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*app.state.db).await.expect("insert product");
    }
}

#[tokio::test]
async fn signup_then_signin_round_trip() {
    let app = TestApp::new().await;

    let token = app.signup("newbie@example.com").await;
    assert!(!token.is_empty());

    // Duplicate signup conflicts.
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/signup",
            Some(json!({
                "email": "newbie@example.com",
                "password": "another-password-123"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/signin",
            Some(json!({
                "email": "newbie@example.com",
                "password": "correct-horse-battery"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["user"]["email"], "newbie@example.com");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/signin",
            Some(json!({
                "email": "newbie@example.com",
                "password": "wrong-password-entirely"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_token_owner() {
    let app = TestApp::new().await;
    let token = app.signup("me@example.com").await;

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], "me@example.com");
    assert_eq!(body["data"]["tier"], 1);

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some("garbage-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_visibility_follows_membership_tier() {
    let app = TestApp::new().await;
    seed_tiered_catalog(&app).await;

    // Anonymous shoppers see tier 1 only.
    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Everyday Tarp"]);

    // Promote a user to tier 2 and check the widened catalog.
    let token = app.signup("pro@example.com").await;
    let me = response_json(
        app.request(Method::GET, "/api/v1/auth/me", None, Some(&token))
            .await,
    )
    .await;
    let user_id = me["data"]["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/auth/update-tier/{user_id}"),
            Some(json!({ "tier": 2 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Contractor Hoist", "Everyday Tarp"]);
}

#[tokio::test]
async fn tier_updates_are_range_checked() {
    let app = TestApp::new().await;
    let token = app.signup("range@example.com").await;
    let me = response_json(
        app.request(Method::GET, "/api/v1/auth/me", None, Some(&token))
            .await,
    )
    .await;
    let user_id = me["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/auth/update-tier/{user_id}"),
            Some(json!({ "tier": 9 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
