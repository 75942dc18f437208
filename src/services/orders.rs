use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{coupon, order, order_item, product, user, Coupon, Order, OrderItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing::{self, AppliedCoupon, PricingResult, QuoteItem},
};

/// One requested line at checkout. `price` is the unit price the customer
/// was quoted, which may lag the live catalog price; the commit bills at the
/// quoted price and recomputes only coupon discounts and totals. `name` is
/// the quoted display name, with the catalog row as fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Line snapshot stored in a user's order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Entry in a user's order history.
///
/// Early data stored bare order-id strings; current entries are structured
/// snapshots carrying a version for future migrations. Untagged serde keeps
/// both readable from the same JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderHistoryEntry {
    Snapshot {
        order_id: Uuid,
        items: Vec<HistoryItem>,
        total: Decimal,
        coupons: Vec<String>,
        date: DateTime<Utc>,
        #[serde(default = "default_history_version")]
        version: u32,
    },
    Legacy(String),
}

fn default_history_version() -> u32 {
    1
}

pub const HISTORY_VERSION: u32 = 1;

/// Finalized bill returned after checkout and from the order lookup
/// endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BillResponse {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub pricing: PricingResult,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Places an order in one transaction: check the quoted lines against
    /// the catalog, apply coupons, reserve stock, bump coupon usage, write
    /// the order plus its lines, and append the snapshot to the user's
    /// history. Any failure rolls the whole thing back; stock and coupon
    /// counters are never left half-updated.
    #[instrument(skip(self, user, items, coupon_codes), fields(user_id = %user.id, lines = items.len()))]
    pub async fn place_order(
        &self,
        user: &user::Model,
        items: &[OrderItemRequest],
        coupon_codes: &[String],
    ) -> Result<BillResponse, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order must contain at least one item".to_string(),
            ));
        }
        for item in items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "item quantity must be positive".to_string(),
                ));
            }
            if item.price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "item price cannot be negative".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let (quote_items, priced_lines) = self.resolve_lines(&txn, items).await?;
        let pricing = pricing::apply_coupons(&txn, &quote_items, coupon_codes, now).await?;

        let depleted = self.reserve_stock(&txn, &priced_lines).await?;
        self.redeem_coupons(&txn, &pricing.applied_coupons).await?;

        let order_id = Uuid::new_v4();
        let applied_codes: Vec<String> = pricing
            .applied_coupons
            .iter()
            .map(|c| c.code.clone())
            .collect();

        let order_row = order::ActiveModel {
            id: Set(order_id),
            customer_email: Set(user.email.clone()),
            customer_name: Set(user.name.clone()),
            subtotal: Set(pricing.subtotal),
            discount: Set(pricing.total_discount),
            total: Set(pricing.final_total),
            status: Set("confirmed".to_string()),
            applied_coupon_codes: Set(if applied_codes.is_empty() {
                None
            } else {
                Some(applied_codes.join(","))
            }),
            applied_coupons: Set(serde_json::to_value(&pricing.applied_coupons)?),
            created_at: Set(now),
        };
        let order_model = order_row.insert(&txn).await?;

        let mut item_models = Vec::with_capacity(priced_lines.len());
        for line in &priced_lines {
            let row = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product.id),
                product_name: Set(Some(line.product_name.clone())),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.unit_price * Decimal::from(line.quantity)),
            };
            item_models.push(row.insert(&txn).await?);
        }

        self.append_history(&txn, user, order_id, &priced_lines, &pricing, now)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send(Event::OrderPlaced {
                order_id,
                user_id: user.id,
                total: pricing.final_total,
            })
            .await;
        for code in &applied_codes {
            self.event_sender
                .send(Event::CouponRedeemed {
                    code: code.clone(),
                    order_id,
                })
                .await;
        }
        for product_id in depleted {
            self.event_sender
                .send(Event::StockDepleted { product_id })
                .await;
        }

        Ok(BillResponse {
            order: order_model,
            items: item_models,
            pricing,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_bill(&self, order_id: Uuid) -> Result<BillResponse, ServiceError> {
        let order_model = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        let applied_coupons: Vec<AppliedCoupon> =
            serde_json::from_value(order_model.applied_coupons.clone())?;
        let pricing = PricingResult {
            subtotal: order_model.subtotal,
            total_discount: order_model.discount,
            final_total: order_model.total,
            can_add_more_coupons: order_model.total > Decimal::ZERO,
            applied_coupons,
        };

        Ok(BillResponse {
            order: order_model,
            items,
            pricing,
        })
    }

    /// Parses a user's stored history. Unreadable entries are surfaced as
    /// an error rather than silently dropped.
    pub fn parse_history(user: &user::Model) -> Result<Vec<OrderHistoryEntry>, ServiceError> {
        Ok(serde_json::from_value(user.order_history.clone())?)
    }

    /// Resolves each quoted line against its catalog row. Stock is checked
    /// cumulatively, so several lines for the same product are judged
    /// against what the earlier lines already claimed.
    async fn resolve_lines(
        &self,
        txn: &DatabaseTransaction,
        items: &[OrderItemRequest],
    ) -> Result<(Vec<QuoteItem>, Vec<PricedLine>), ServiceError> {
        let mut quote_items = Vec::with_capacity(items.len());
        let mut lines = Vec::with_capacity(items.len());
        let mut reserved: HashMap<Uuid, i32> = HashMap::new();

        for request in items {
            let product = Product::find_by_id(request.product_id)
                .one(txn)
                .await?
                .ok_or_else(|| ServiceError::ProductNotFound(request.product_id.to_string()))?;

            let available = product.stock_quantity - reserved.get(&product.id).copied().unwrap_or(0);
            if available < request.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "only {} of '{}' available, {} requested",
                    available, product.name, request.quantity
                )));
            }
            *reserved.entry(product.id).or_insert(0) += request.quantity;

            let product_name = request.name.clone().unwrap_or_else(|| product.name.clone());

            quote_items.push(QuoteItem {
                product_id: product.id,
                price: request.price,
                quantity: request.quantity,
            });
            lines.push(PricedLine {
                product,
                product_name,
                quantity: request.quantity,
                unit_price: request.price,
            });
        }

        Ok((quote_items, lines))
    }

    /// Decrements stock once per product by the order's aggregate quantity;
    /// returns products that hit zero.
    async fn reserve_stock(
        &self,
        txn: &DatabaseTransaction,
        lines: &[PricedLine],
    ) -> Result<Vec<Uuid>, ServiceError> {
        let mut totals: HashMap<Uuid, i32> = HashMap::new();
        for line in lines {
            *totals.entry(line.product.id).or_insert(0) += line.quantity;
        }

        let mut depleted = Vec::new();
        let mut written: HashSet<Uuid> = HashSet::new();
        for line in lines {
            if !written.insert(line.product.id) {
                continue;
            }

            let new_stock = line.product.stock_quantity - totals[&line.product.id];
            let mut active: product::ActiveModel = line.product.clone().into();
            active.stock_quantity = Set(new_stock);
            active.updated_at = Set(Some(Utc::now()));
            active.update(txn).await?;

            if new_stock == 0 {
                depleted.push(line.product.id);
            }
        }

        Ok(depleted)
    }

    async fn redeem_coupons(
        &self,
        txn: &DatabaseTransaction,
        applied: &[AppliedCoupon],
    ) -> Result<(), ServiceError> {
        for coupon_used in applied {
            let coupon = Coupon::find()
                .filter(coupon::Column::Code.eq(coupon_used.code.clone()))
                .one(txn)
                .await?
                .ok_or_else(|| ServiceError::CouponNotFound(coupon_used.code.clone()))?;

            let next = coupon.used_count + 1;
            let mut active: coupon::ActiveModel = coupon.into();
            active.used_count = Set(next);
            active.update(txn).await?;
        }
        Ok(())
    }

    async fn append_history(
        &self,
        txn: &DatabaseTransaction,
        user: &user::Model,
        order_id: Uuid,
        lines: &[PricedLine],
        pricing: &PricingResult,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut history: Vec<OrderHistoryEntry> =
            serde_json::from_value(user.order_history.clone())?;
        history.push(OrderHistoryEntry::Snapshot {
            order_id,
            items: lines
                .iter()
                .map(|line| HistoryItem {
                    product_id: line.product.id,
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            total: pricing.final_total,
            coupons: pricing
                .applied_coupons
                .iter()
                .map(|c| c.code.clone())
                .collect(),
            date: now,
            version: HISTORY_VERSION,
        });

        let mut coupons_used: Vec<String> = serde_json::from_value(user.coupons_used.clone())?;
        coupons_used.extend(pricing.applied_coupons.iter().map(|c| c.code.clone()));

        let mut active: user::ActiveModel = user.clone().into();
        active.order_history = Set(serde_json::to_value(history)?);
        active.coupons_used = Set(serde_json::to_value(coupons_used)?);
        active.updated_at = Set(Some(now));
        active.update(txn).await?;

        Ok(())
    }
}

/// Quoted line resolved against its catalog row inside the commit
/// transaction.
struct PricedLine {
    product: product::Model,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn legacy_history_entries_still_parse() {
        let raw = serde_json::json!(["a1b2", "c3d4"]);
        let parsed: Vec<OrderHistoryEntry> = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(matches!(&parsed[0], OrderHistoryEntry::Legacy(id) if id == "a1b2"));
    }

    #[test]
    fn snapshot_entries_round_trip_with_version() {
        let entry = OrderHistoryEntry::Snapshot {
            order_id: Uuid::new_v4(),
            items: vec![HistoryItem {
                product_id: Uuid::new_v4(),
                product_name: "Pallet Jack".to_string(),
                quantity: 2,
                unit_price: dec!(129.99),
            }],
            total: dec!(233.98),
            coupons: vec!["SAVE10".to_string()],
            date: Utc::now(),
            version: HISTORY_VERSION,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["version"], 1);

        let parsed: OrderHistoryEntry = serde_json::from_value(value).unwrap();
        assert!(matches!(parsed, OrderHistoryEntry::Snapshot { .. }));
    }

    #[test]
    fn mixed_history_parses_in_order() {
        let order_id = Uuid::new_v4();
        let raw = serde_json::json!([
            "legacy-order",
            {
                "order_id": order_id,
                "items": [],
                "total": "10.00",
                "coupons": [],
                "date": Utc::now(),
                "version": 1
            }
        ]);

        let parsed: Vec<OrderHistoryEntry> = serde_json::from_value(raw).unwrap();
        assert!(matches!(&parsed[0], OrderHistoryEntry::Legacy(_)));
        assert!(matches!(&parsed[1], OrderHistoryEntry::Snapshot { .. }));
    }
}
