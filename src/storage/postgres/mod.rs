//! Postgres storage backend.

mod carts;
mod coupons;
mod orders;
mod products;
mod users;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use uuid::Uuid;

use super::{Database, OrderFilter, Page, StoreError, Transaction};
use crate::domain::aggregates::{
    Cart, CartItem, Coupon, NewCartItem, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, User,
};
use crate::domain::value_objects::CouponCode;

#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

pub(crate) type PgTx = sqlx::Transaction<'static, Postgres>;

struct PgTransaction {
    tx: PgTx,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn find_user_by_token_hash(&mut self, token_hash: &str) -> Result<Option<User>, StoreError> {
        users::find_by_token_hash(&mut self.tx, token_hash).await
    }

    async fn list_active_products(&mut self, page: Page) -> Result<(Vec<Product>, i64), StoreError> {
        products::list_active(&mut self.tx, page).await
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError> {
        products::find(&mut self.tx, id).await
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        products::lock(&mut self.tx, ids).await
    }

    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> Result<Product, StoreError> {
        products::adjust_stock(&mut self.tx, id, delta).await
    }

    async fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        carts::find(&mut self.tx, user_id, false).await
    }

    async fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        carts::find(&mut self.tx, user_id, true).await
    }

    async fn create_cart(&mut self, user_id: Uuid) -> Result<Cart, StoreError> {
        carts::create(&mut self.tx, user_id).await
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, StoreError> {
        carts::items(&mut self.tx, cart_id).await
    }

    async fn upsert_cart_item(&mut self, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, StoreError> {
        carts::upsert_item(&mut self.tx, cart_id, item).await
    }

    async fn set_cart_item_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<CartItem, StoreError> {
        carts::set_item_quantity(&mut self.tx, item_id, quantity).await
    }

    async fn delete_cart_item(&mut self, cart_id: Uuid, item_id: Uuid) -> Result<u64, StoreError> {
        carts::delete_item(&mut self.tx, cart_id, item_id).await
    }

    async fn clear_cart(&mut self, cart_id: Uuid) -> Result<u64, StoreError> {
        carts::clear(&mut self.tx, cart_id).await
    }

    async fn find_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        coupons::find(&mut self.tx, code, false).await
    }

    async fn lock_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        coupons::find(&mut self.tx, code, true).await
    }

    async fn increment_coupon_usage(&mut self, id: Uuid) -> Result<Coupon, StoreError> {
        coupons::increment_usage(&mut self.tx, id).await
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        orders::insert(&mut self.tx, order).await
    }

    async fn insert_order_item(&mut self, order_id: Uuid, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        orders::insert_item(&mut self.tx, order_id, item).await
    }

    async fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError> {
        orders::find(&mut self.tx, id, false).await
    }

    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError> {
        orders::find(&mut self.tx, id, true).await
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        orders::items(&mut self.tx, order_id).await
    }

    async fn list_orders(&mut self, filter: OrderFilter, page: Page) -> Result<(Vec<Order>, i64), StoreError> {
        orders::list(&mut self.tx, filter, page).await
    }

    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        orders::update_status(&mut self.tx, id, status).await
    }
}

/// Empty variant tags are stored as `''` so they take part in the unique key.
pub(crate) fn tag_to_column(tag: Option<&str>) -> &str {
    tag.unwrap_or("")
}

pub(crate) fn tag_from_column(tag: String) -> Option<String> {
    if tag.is_empty() { None } else { Some(tag) }
}

pub(crate) fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(source) }
}

pub(crate) fn limit_offset(page: Page) -> (i64, i64) {
    (i64::from(page.limit()), i64::try_from(page.offset()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tags_round_trip_through_columns() {
        assert_eq!(tag_to_column(None), "");
        assert_eq!(tag_from_column(String::new()), None);
        assert_eq!(tag_from_column(tag_to_column(Some("XL")).to_string()), Some("XL".to_string()));
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(Page { page: Some(2), per_page: Some(25) }), (25, 25));
    }
}
