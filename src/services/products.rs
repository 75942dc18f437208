use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{order_item, product, tiered_price, OrderItem, Product, TieredPrice},
    errors::ServiceError,
};

/// A product together with its bulk price breaks, as returned by the
/// catalog endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithPricing {
    #[serde(flatten)]
    pub product: product::Model,
    pub tiered_prices: Vec<tiered_price::Model>,
}

/// Picks the unit price for a quantity: the tier with the highest
/// `min_quantity` not exceeding the quantity wins, otherwise the base
/// price. Tiers must be sorted ascending by `min_quantity`.
pub fn price_for_quantity(
    base_price: Decimal,
    tiers: &[tiered_price::Model],
    quantity: i32,
) -> Decimal {
    tiers
        .iter()
        .rev()
        .find(|t| quantity >= t.min_quantity)
        .map(|t| t.price)
        .unwrap_or(base_price)
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Catalog listing gated by membership tier: only products at or below
    /// the viewer's tier are visible. Anonymous viewers see tier 1.
    #[instrument(skip(self))]
    pub async fn list_for_tier(&self, tier: i32) -> Result<Vec<ProductWithPricing>, ServiceError> {
        let rows = Product::find()
            .filter(product::Column::Tier.lte(tier))
            .order_by_asc(product::Column::Name)
            .find_with_related(TieredPrice)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(product, mut tiers)| {
                tiers.sort_by_key(|t| t.min_quantity);
                ProductWithPricing {
                    product,
                    tiered_prices: tiers,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductWithPricing, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(product_id.to_string()))?;

        let mut tiers = TieredPrice::find()
            .filter(tiered_price::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        tiers.sort_by_key(|t| t.min_quantity);

        Ok(ProductWithPricing {
            product,
            tiered_prices: tiers,
        })
    }

    /// Removes a product and its price tiers. Products already referenced
    /// by an order are immutable history and cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let referenced = OrderItem::find()
            .filter(order_item::Column::ProductId.eq(product_id))
            .count(&*self.db)
            .await?;
        if referenced > 0 {
            return Err(ServiceError::Conflict(
                "product is referenced by existing orders".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(product_id.to_string()))?;

        TieredPrice::delete_many()
            .filter(tiered_price::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        Product::delete_by_id(product.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(min_quantity: i32, price: Decimal) -> tiered_price::Model {
        tiered_price::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            min_quantity,
            price,
        }
    }

    #[test]
    fn base_price_below_first_tier() {
        let tiers = vec![tier(10, dec!(8)), tier(50, dec!(6))];
        assert_eq!(price_for_quantity(dec!(10), &tiers, 1), dec!(10));
        assert_eq!(price_for_quantity(dec!(10), &tiers, 9), dec!(10));
    }

    #[test]
    fn highest_qualifying_tier_wins() {
        let tiers = vec![tier(10, dec!(8)), tier(50, dec!(6))];
        assert_eq!(price_for_quantity(dec!(10), &tiers, 10), dec!(8));
        assert_eq!(price_for_quantity(dec!(10), &tiers, 49), dec!(8));
        assert_eq!(price_for_quantity(dec!(10), &tiers, 50), dec!(6));
        assert_eq!(price_for_quantity(dec!(10), &tiers, 500), dec!(6));
    }

    #[test]
    fn no_tiers_means_base_price() {
        assert_eq!(price_for_quantity(dec!(4.25), &[], 1000), dec!(4.25));
    }
}
