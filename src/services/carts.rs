use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{cart, cart_item, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::products::price_for_quantity,
};

/// Priced line in a cart view. `unit_price` already reflects the bulk tier
/// the line's quantity qualifies for.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Every user has exactly one cart; it is created lazily on first use.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        Ok(cart.insert(&*self.db).await?)
    }

    /// Cart contents with tier-aware line pricing.
    #[instrument(skip(self))]
    pub async fn view_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::AddedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut subtotal = Decimal::ZERO;

        for (item, product) in rows {
            let product = product
                .ok_or_else(|| ServiceError::ProductNotFound(item.product_id.to_string()))?;

            let mut tiers = product
                .find_related(crate::entities::TieredPrice)
                .all(&*self.db)
                .await?;
            tiers.sort_by_key(|t| t.min_quantity);

            let unit_price = price_for_quantity(product.base_price, &tiers, item.quantity);
            let line_total = unit_price * Decimal::from(item.quantity);
            subtotal += line_total;

            items.push(CartLine {
                item_id: item.id,
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price,
                line_total,
            });
        }

        Ok(CartView {
            cart_id: cart.id,
            items,
            subtotal,
        })
    }

    /// Adds a product to the cart, merging into an existing line if the
    /// product is already there. Stock is only reserved at order time, but
    /// the product must exist and carry some stock to be added.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(product_id.to_string()))?;
        if product.stock_quantity <= 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "'{}' is out of stock",
                product.name
            )));
        }

        let cart = self.get_or_create_cart(user_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        match existing {
            Some(line) => {
                let merged = line.quantity + quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(merged);
                active.update(&*self.db).await?;
            }
            None => {
                let line = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    added_at: Set(Utc::now()),
                };
                line.insert(&*self.db).await?;
            }
        }

        self.touch_cart(cart).await?;
        self.view_cart(user_id).await
    }

    /// Sets a line's quantity directly, keyed by product. Zero removes the
    /// line.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }

        let cart = self.get_or_create_cart(user_id).await?;
        let line = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cart item for product {}", product_id)))?;

        if quantity == 0 {
            CartItem::delete_by_id(line.id).exec(&*self.db).await?;
        } else {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.update(&*self.db).await?;
        }

        self.touch_cart(cart).await?;
        self.view_cart(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.update_item(user_id, product_id, 0).await
    }

    /// Empties the cart. The cart row itself survives; only its lines go,
    /// deleted in one transaction.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;

        let txn = self.db.begin().await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        let mut cart_active: cart::ActiveModel = cart.clone().into();
        cart_active.updated_at = Set(Some(Utc::now()));
        cart_active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send(Event::CartCleared {
                cart_id: cart.id,
                user_id,
            })
            .await;

        Ok(())
    }

    async fn touch_cart(&self, cart: cart::Model) -> Result<(), ServiceError> {
        let mut active: cart::ActiveModel = cart.into();
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(())
    }
}
