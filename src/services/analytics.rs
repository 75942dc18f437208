use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{order, order_item, Order, OrderItem, Product},
    errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub units_sold: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub top_products: Vec<TopProduct>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Storefront dashboard aggregates. Revenue is the sum of committed
    /// order totals, so it already reflects coupon discounts.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, ServiceError> {
        let total_products = Product::find().count(&*self.db).await?;
        let total_orders = Order::find().count(&*self.db).await?;

        #[derive(FromQueryResult)]
        struct RevenueRow {
            revenue: Option<Decimal>,
        }

        let revenue = Order::find()
            .select_only()
            .column_as(order::Column::Total.sum(), "revenue")
            .into_model::<RevenueRow>()
            .one(&*self.db)
            .await?
            .and_then(|row| row.revenue)
            .unwrap_or(Decimal::ZERO);

        let top_products = OrderItem::find()
            .select_only()
            .column(order_item::Column::ProductId)
            .column(order_item::Column::ProductName)
            .column_as(order_item::Column::Quantity.sum(), "units_sold")
            .group_by(order_item::Column::ProductId)
            .group_by(order_item::Column::ProductName)
            .order_by_desc(order_item::Column::Quantity.sum())
            .limit(5)
            .into_model::<TopProduct>()
            .all(&*self.db)
            .await?;

        Ok(DashboardStats {
            total_products,
            total_orders,
            total_revenue: revenue,
            top_products,
        })
    }
}
