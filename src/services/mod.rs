pub mod analytics;
pub mod carts;
pub mod coupons;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod users;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{auth::AuthService, events::EventSender};

/// All domain services, built once at startup and cloned into handlers
/// through application state.
#[derive(Clone)]
pub struct AppServices {
    pub pricing: pricing::PricingService,
    pub coupons: coupons::CouponService,
    pub products: products::ProductService,
    pub carts: carts::CartService,
    pub orders: orders::OrderService,
    pub users: users::UserService,
    pub analytics: analytics::AnalyticsService,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, auth: AuthService, event_sender: EventSender) -> Self {
        Self {
            pricing: pricing::PricingService::new(db.clone()),
            coupons: coupons::CouponService::new(db.clone()),
            products: products::ProductService::new(db.clone()),
            carts: carts::CartService::new(db.clone(), event_sender.clone()),
            orders: orders::OrderService::new(db.clone(), event_sender.clone()),
            analytics: analytics::AnalyticsService::new(db.clone()),
            users: users::UserService::new(db, auth, event_sender),
        }
    }
}
