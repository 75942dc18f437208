//! Integration tests for the pricing preview and coupon endpoints:
//! sequential stacking, validation failures, and batch abort behavior.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use bulkcart_api::entities::coupon::DiscountType;

fn as_decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal fields serialize as strings")
        .parse()
        .expect("parseable decimal")
}

fn calculate_payload(coupon_codes: Vec<&str>) -> Value {
    json!({
        "items": [
            { "product_id": uuid::Uuid::new_v4(), "price": "100.00", "quantity": 2 }
        ],
        "coupon_codes": coupon_codes,
    })
}

#[tokio::test]
async fn no_coupons_leaves_subtotal_untouched() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec![])),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(as_decimal(&data["subtotal"]), dec!(200));
    assert_eq!(as_decimal(&data["total_discount"]), dec!(0));
    assert_eq!(as_decimal(&data["final_total"]), dec!(200));
    assert_eq!(data["can_add_more_coupons"], true);
    assert!(data["applied_coupons"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stacking_order_is_authoritative() {
    let app = TestApp::new().await;
    app.seed_coupon("SAVE20", DiscountType::Percentage, dec!(20), false, true, None, None, 0)
        .await;
    app.seed_coupon("FLAT50", DiscountType::Fixed, dec!(50), false, true, None, None, 0)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["SAVE20", "FLAT50"])),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(as_decimal(&body["data"]["final_total"]), dec!(110));

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["FLAT50", "SAVE20"])),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(as_decimal(&body["data"]["final_total"]), dec!(120));
}

#[tokio::test]
async fn makes_free_zeroes_the_bill_and_blocks_further_coupons() {
    let app = TestApp::new().await;
    app.seed_coupon("ONTHEHOUSE", DiscountType::Fixed, dec!(1), true, true, None, None, 0)
        .await;
    app.seed_coupon("SAVE20", DiscountType::Percentage, dec!(20), false, true, None, None, 0)
        .await;

    let payload = json!({
        "items": [
            { "product_id": uuid::Uuid::new_v4(), "price": "50.00", "quantity": 2 }
        ],
        "coupon_codes": ["ONTHEHOUSE", "SAVE20"],
    });

    let response = app
        .request(Method::POST, "/api/v1/cart/calculate", Some(payload), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(as_decimal(&data["subtotal"]), dec!(100));
    assert_eq!(as_decimal(&data["total_discount"]), dec!(100));
    assert_eq!(as_decimal(&data["final_total"]), dec!(0));
    assert_eq!(data["can_add_more_coupons"], false);
    // The percentage coupon after the freebie is skipped, not applied at zero.
    assert_eq!(data["applied_coupons"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn coupon_codes_are_case_insensitive() {
    let app = TestApp::new().await;
    app.seed_coupon("SAVE20", DiscountType::Percentage, dec!(20), false, true, None, None, 0)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["save20"])),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(as_decimal(&body["data"]["final_total"]), dec!(160));
    assert_eq!(body["data"]["applied_coupons"][0]["code"], "SAVE20");
}

#[tokio::test]
async fn unknown_coupon_is_a_404_naming_the_code() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["NOPE"])),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("NOPE"));
}

#[tokio::test]
async fn expired_coupon_is_rejected() {
    let app = TestApp::new().await;
    app.seed_coupon(
        "WINTER24",
        DiscountType::Percentage,
        dec!(15),
        false,
        true,
        Some(Utc::now() - Duration::days(3)),
        None,
        0,
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["WINTER24"])),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("WINTER24"));
    assert!(body["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn exhausted_coupon_is_rejected() {
    let app = TestApp::new().await;
    app.seed_coupon("LIMITED", DiscountType::Fixed, dec!(5), false, true, None, Some(3), 3)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["LIMITED"])),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("usage limit"));
}

#[tokio::test]
async fn one_bad_coupon_aborts_the_whole_batch() {
    let app = TestApp::new().await;
    app.seed_coupon("SAVE20", DiscountType::Percentage, dec!(20), false, true, None, None, 0)
        .await;
    app.seed_coupon("DISABLED", DiscountType::Fixed, dec!(10), false, false, None, None, 0)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/calculate",
            Some(calculate_payload(vec!["SAVE20", "DISABLED"])),
            None,
        )
        .await;

    // The valid first coupon does not survive: the whole request fails.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("DISABLED"));
}

#[tokio::test]
async fn coupon_listing_hides_unusable_codes() {
    let app = TestApp::new().await;
    app.seed_coupon("GOOD", DiscountType::Fixed, dec!(5), false, true, None, Some(10), 2)
        .await;
    app.seed_coupon("DISABLED", DiscountType::Fixed, dec!(5), false, false, None, None, 0)
        .await;
    app.seed_coupon(
        "OLD",
        DiscountType::Fixed,
        dec!(5),
        false,
        true,
        Some(Utc::now() - Duration::days(1)),
        None,
        0,
    )
    .await;
    app.seed_coupon("SPENT", DiscountType::Fixed, dec!(5), false, true, None, Some(3), 3)
        .await;

    let response = app.request(Method::GET, "/api/v1/coupons", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let codes: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["GOOD"]);
}

#[tokio::test]
async fn validate_endpoint_reports_the_exact_failure() {
    let app = TestApp::new().await;
    app.seed_coupon("SAVE20", DiscountType::Percentage, dec!(20), false, true, None, None, 0)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "save20" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["coupon"]["code"], "SAVE20");

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "MISSING" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
