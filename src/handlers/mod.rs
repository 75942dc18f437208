pub mod analytics;
pub mod auth;
pub mod cart;
pub mod common;
pub mod coupons;
pub mod orders;
pub mod products;
