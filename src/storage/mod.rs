//! Storage seam.
//!
//! Services talk to a [`Database`] through short-lived [`Transaction`]s.
//! A transaction that is dropped without [`Transaction::commit`] is rolled
//! back, so every write a service performs is all-or-nothing.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartItem, Coupon, NewCartItem, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, User,
};
use crate::domain::value_objects::CouponCode;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("related record not found")]
    InvalidReference,

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage error")]
    Sql(#[source] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation) => {
                let constraint = error
                    .as_database_error()
                    .and_then(|db| db.constraint())
                    .unwrap_or("check")
                    .to_string();
                Self::Constraint(constraint)
            }
            Some(_) | None => Self::Sql(error),
        }
    }
}

/// Pagination as accepted by list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn first() -> Self { Self { page: None, per_page: None } }
    pub fn number(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn limit(&self) -> u32 { self.per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, Self::MAX_PER_PAGE) }
    pub fn offset(&self) -> u64 { u64::from(self.number() - 1) * u64::from(self.limit()) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn find_user_by_token_hash(&mut self, token_hash: &str) -> Result<Option<User>, StoreError>;

    async fn list_active_products(&mut self, page: Page) -> Result<(Vec<Product>, i64), StoreError>;
    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError>;
    /// Locks the given product rows for the rest of the transaction, in id order.
    async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError>;
    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> Result<Product, StoreError>;

    async fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError>;
    /// Locks the user's cart row; writers to the cart and its items queue behind it.
    async fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError>;
    async fn create_cart(&mut self, user_id: Uuid) -> Result<Cart, StoreError>;
    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, StoreError>;
    /// Inserts the item, or adds its quantity to the item in the same
    /// (product, size, color) slot.
    async fn upsert_cart_item(&mut self, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, StoreError>;
    async fn set_cart_item_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<CartItem, StoreError>;
    async fn delete_cart_item(&mut self, cart_id: Uuid, item_id: Uuid) -> Result<u64, StoreError>;
    async fn clear_cart(&mut self, cart_id: Uuid) -> Result<u64, StoreError>;

    async fn find_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
    async fn lock_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
    async fn increment_coupon_usage(&mut self, id: Uuid) -> Result<Coupon, StoreError>;

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;
    async fn insert_order_item(&mut self, order_id: Uuid, item: NewOrderItem) -> Result<OrderItem, StoreError>;
    async fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;
    async fn list_orders(&mut self, filter: OrderFilter, page: Page) -> Result<(Vec<Order>, i64), StoreError>;
    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError>;
}
