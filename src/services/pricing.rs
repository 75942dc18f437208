//! Coupon-stacking pricing engine.
//!
//! Coupons apply sequentially: each discount is computed against the amount
//! still payable after the coupons before it, so request order is
//! authoritative. The engine itself is side-effect free; stock and
//! usage-count mutation happens in the order commit step.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, DiscountType},
        Coupon,
    },
    errors::ServiceError,
};

/// One priced cart line, as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItem {
    pub product_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
}

/// Record of one successfully applied coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_amount: Decimal,
}

/// Result of pricing a cart. Request-scoped pure value; never persisted
/// as-is (orders snapshot it at commit time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Decimal,
    pub applied_coupons: Vec<AppliedCoupon>,
    pub total_discount: Decimal,
    pub final_total: Decimal,
    pub can_add_more_coupons: bool,
}

/// Uppercases a submitted code to its canonical stored form.
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Checks a coupon against the clock and its own bookkeeping. Pure; the
/// checks run in a fixed order so the first failure wins.
pub fn validate_coupon(coupon: &coupon::Model, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if !coupon.is_active {
        return Err(ServiceError::CouponInactive(coupon.code.clone()));
    }

    if let Some(expires_at) = coupon.expires_at {
        if expires_at < now {
            return Err(ServiceError::CouponExpired(coupon.code.clone()));
        }
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(ServiceError::CouponLimitReached(coupon.code.clone()));
        }
    }

    Ok(())
}

/// Computes the discount one coupon takes off the remaining payable amount.
///
/// `makes_free` zeroes the remainder outright; percentage applies to the
/// remainder (values above 100 are accepted unclamped, the caller's
/// `max(0, ..)` floor keeps totals non-negative); fixed never exceeds what
/// is left.
pub fn discount_for(coupon: &coupon::Model, remaining: Decimal) -> Decimal {
    if coupon.makes_free {
        return remaining;
    }

    match coupon.discount_type {
        DiscountType::Percentage => remaining * (coupon.discount_value / Decimal::from(100)),
        DiscountType::Fixed => coupon.discount_value.min(remaining),
    }
}

/// Looks up a coupon by canonical code.
pub async fn find_coupon<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<coupon::Model>, ServiceError> {
    Coupon::find()
        .filter(coupon::Column::Code.eq(canonical_code(code)))
        .one(conn)
        .await
        .map_err(ServiceError::from)
}

/// Applies `coupon_codes` in order against the subtotal of `items`.
///
/// Coupons reached after the remainder hits zero are silently skipped;
/// that is normal termination, not an error. Any invalid coupon that is
/// reached aborts the whole batch, so a caller never observes partial
/// application.
pub async fn apply_coupons<C: ConnectionTrait>(
    conn: &C,
    items: &[QuoteItem],
    coupon_codes: &[String],
    now: DateTime<Utc>,
) -> Result<PricingResult, ServiceError> {
    let subtotal: Decimal = items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();

    let mut remaining = subtotal;
    let mut total_discount = Decimal::ZERO;
    let mut applied = Vec::new();

    for code in coupon_codes {
        if remaining <= Decimal::ZERO {
            break;
        }

        let coupon = find_coupon(conn, code)
            .await?
            .ok_or_else(|| ServiceError::CouponNotFound(code.clone()))?;

        validate_coupon(&coupon, now)?;

        let discount = discount_for(&coupon, remaining);
        remaining -= discount;
        total_discount += discount;

        applied.push(AppliedCoupon {
            code: coupon.code,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            discount_amount: discount,
        });
    }

    let final_total = (subtotal - total_discount).max(Decimal::ZERO);

    Ok(PricingResult {
        subtotal,
        applied_coupons: applied,
        total_discount,
        final_total,
        can_add_more_coupons: final_total > Decimal::ZERO,
    })
}

/// Read-only pricing facade for the cart preview endpoint.
#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
}

impl PricingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Prices a cart without touching any state. Safe to call
    /// concurrently; requires no locking.
    #[instrument(skip(self, items, coupon_codes), fields(items = items.len(), coupons = coupon_codes.len()))]
    pub async fn quote(
        &self,
        items: &[QuoteItem],
        coupon_codes: &[String],
    ) -> Result<PricingResult, ServiceError> {
        apply_coupons(&*self.db, items, coupon_codes, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(
        code: &str,
        discount_type: DiscountType,
        value: Decimal,
        makes_free: bool,
    ) -> coupon::Model {
        coupon::Model {
            id: Uuid::new_v4(),
            code: code.to_string(),
            discount_type,
            discount_value: value,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            makes_free,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_applies_to_remaining() {
        let c = coupon("SAVE20", DiscountType::Percentage, dec!(20), false);
        assert_eq!(discount_for(&c, dec!(200)), dec!(40));
        assert_eq!(discount_for(&c, dec!(150)), dec!(30));
    }

    #[test]
    fn percentage_within_hundred_never_exceeds_remaining() {
        for value in [dec!(0), dec!(25), dec!(50), dec!(99.9), dec!(100)] {
            let c = coupon("P", DiscountType::Percentage, value, false);
            let remaining = dec!(180.40);
            let discount = discount_for(&c, remaining);
            assert!(discount >= Decimal::ZERO);
            assert!(discount <= remaining);
        }
    }

    #[test]
    fn fixed_discount_is_capped_at_remaining() {
        let c = coupon("FLAT50", DiscountType::Fixed, dec!(50), false);
        assert_eq!(discount_for(&c, dec!(200)), dec!(50));
        assert_eq!(discount_for(&c, dec!(30)), dec!(30));
        assert_eq!(discount_for(&c, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn makes_free_overrides_discount_type() {
        let c = coupon("FREESHIP", DiscountType::Fixed, dec!(5), true);
        assert_eq!(discount_for(&c, dec!(123.45)), dec!(123.45));
    }

    #[test]
    fn stacking_order_changes_the_total() {
        // 20% then $50: 200 -> 160 -> 110
        let pct = coupon("SAVE20", DiscountType::Percentage, dec!(20), false);
        let fixed = coupon("FLAT50", DiscountType::Fixed, dec!(50), false);

        let mut remaining = dec!(200);
        remaining -= discount_for(&pct, remaining);
        remaining -= discount_for(&fixed, remaining);
        assert_eq!(remaining, dec!(110));

        // $50 then 20%: 200 -> 150 -> 120
        let mut remaining = dec!(200);
        remaining -= discount_for(&fixed, remaining);
        remaining -= discount_for(&pct, remaining);
        assert_eq!(remaining, dec!(120));
    }

    #[test]
    fn over_hundred_percent_is_accepted_unclamped() {
        let c = coupon("MEGA", DiscountType::Percentage, dec!(150), false);
        let discount = discount_for(&c, dec!(100));
        assert_eq!(discount, dec!(150));
        // The applicator floors the final total at zero.
        assert_eq!((dec!(100) - discount).max(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let mut c = coupon("OFF", DiscountType::Fixed, dec!(10), false);
        c.is_active = false;

        let err = validate_coupon(&c, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::CouponInactive(code) if code == "OFF"));
    }

    #[test]
    fn expired_coupon_is_rejected_regardless_of_other_state() {
        let mut c = coupon("OLD", DiscountType::Percentage, dec!(10), false);
        c.expires_at = Some(Utc::now() - Duration::days(1));
        c.usage_limit = Some(100);
        c.used_count = 0;

        let err = validate_coupon(&c, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::CouponExpired(code) if code == "OLD"));
    }

    #[test]
    fn future_expiry_is_accepted() {
        let mut c = coupon("FRESH", DiscountType::Percentage, dec!(10), false);
        c.expires_at = Some(Utc::now() + Duration::days(30));
        assert!(validate_coupon(&c, Utc::now()).is_ok());
    }

    #[test]
    fn usage_limit_reached_is_rejected() {
        let mut c = coupon("LIMITED", DiscountType::Fixed, dec!(5), false);
        c.usage_limit = Some(3);
        c.used_count = 3;

        let err = validate_coupon(&c, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::CouponLimitReached(code) if code == "LIMITED"));
    }

    #[test]
    fn usage_under_limit_is_accepted() {
        let mut c = coupon("LIMITED", DiscountType::Fixed, dec!(5), false);
        c.usage_limit = Some(3);
        c.used_count = 2;
        assert!(validate_coupon(&c, Utc::now()).is_ok());
    }

    #[test]
    fn inactive_wins_over_expiry() {
        // Checks run in order: active, expiry, usage limit.
        let mut c = coupon("BOTH", DiscountType::Fixed, dec!(5), false);
        c.is_active = false;
        c.expires_at = Some(Utc::now() - Duration::days(1));

        let err = validate_coupon(&c, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::CouponInactive(_)));
    }

    #[test]
    fn canonical_code_uppercases_and_trims() {
        assert_eq!(canonical_code(" save10 "), "SAVE10");
        assert_eq!(canonical_code("FLAT50"), "FLAT50");
    }
}
