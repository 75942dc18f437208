use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;

use crate::{
    entities::{coupon, Coupon},
    errors::ServiceError,
    services::pricing::{self, canonical_code},
};

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists coupons that would currently pass validation: active, not
    /// expired, and under their usage limit. Exhausted and disabled codes
    /// are not advertised.
    #[instrument(skip(self))]
    pub async fn list_available(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        let now = Utc::now();

        let coupons = Coupon::find()
            .filter(coupon::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(coupon::Column::ExpiresAt.is_null())
                    .add(coupon::Column::ExpiresAt.gte(now)),
            )
            .order_by_asc(coupon::Column::Code)
            .all(&*self.db)
            .await?;

        Ok(coupons
            .into_iter()
            .filter(|c| match c.usage_limit {
                Some(limit) => c.used_count < limit,
                None => true,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_by_code(&self, code: &str) -> Result<coupon::Model, ServiceError> {
        pricing::find_coupon(&*self.db, code)
            .await?
            .ok_or_else(|| ServiceError::CouponNotFound(canonical_code(code)))
    }

    /// Full single-coupon check as used by the validate endpoint: the code
    /// must exist and pass every validation rule.
    #[instrument(skip(self))]
    pub async fn check_valid(&self, code: &str) -> Result<coupon::Model, ServiceError> {
        let coupon = self.get_by_code(code).await?;
        pricing::validate_coupon(&coupon, Utc::now())?;
        Ok(coupon)
    }
}
