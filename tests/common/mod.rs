// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use bulkcart_api::{
    config::AppConfig,
    db,
    entities::{coupon, product, tiered_price},
    events::{self, EventSender},
    AppState,
};

/// Harness spinning up the full application over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = format!(
            "{}/bulkcart_test_{}.db",
            std::env::temp_dir().display(),
            Uuid::new_v4().simple()
        );

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "test_secret_key_for_testing_purposes_only_32chars",
            "127.0.0.1",
            18_080,
            "test",
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = bulkcart_api::app(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Registers a user through the API and returns their bearer token.
    pub async fn signup(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/signup",
                Some(serde_json::json!({
                    "email": email,
                    "password": "correct-horse-battery",
                    "name": "Test Shopper"
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "signup should succeed");

        let body = response_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("signup response carries a token")
            .to_string()
    }

    /// Seeds a catalog product, optionally with bulk price tiers.
    pub async fn seed_product(
        &self,
        name: &str,
        base_price: Decimal,
        stock: i32,
        tiers: &[(i32, Decimal)],
    ) -> product::Model {
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            base_price: Set(base_price),
            stock_quantity: Set(stock),
            image_url: Set(String::new()),
            category: Set("general".to_string()),
            tier: Set(1),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let model = row
            .insert(&*self.state.db)
            .await
            .expect("insert test product");

        for (min_quantity, price) in tiers {
            let tier_row = tiered_price::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(model.id),
                min_quantity: Set(*min_quantity),
                price: Set(*price),
            };
            tier_row
                .insert(&*self.state.db)
                .await
                .expect("insert test price tier");
        }

        model
    }

    /// Seeds a coupon with full control over its validity knobs.
    #[allow(clippy::too_many_arguments)]
    pub async fn seed_coupon(
        &self,
        code: &str,
        discount_type: coupon::DiscountType,
        value: Decimal,
        makes_free: bool,
        is_active: bool,
        expires_at: Option<DateTime<Utc>>,
        usage_limit: Option<i32>,
        used_count: i32,
    ) -> coupon::Model {
        let row = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_type: Set(discount_type),
            discount_value: Set(value),
            expires_at: Set(expires_at),
            usage_limit: Set(usage_limit),
            used_count: Set(used_count),
            makes_free: Set(makes_free),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.state.db)
            .await
            .expect("insert test coupon")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
