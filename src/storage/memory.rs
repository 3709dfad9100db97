//! In-memory storage backend.
//!
//! Transactions take the single state lock for their whole lifetime and work
//! on a private copy of the state; commit swaps the copy in, drop discards it.
//! That gives the same all-or-nothing and isolation guarantees the Postgres
//! backend gets from row locks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Database, OrderFilter, Page, StoreError, Transaction};
use crate::auth::hash_token;
use crate::domain::aggregates::{
    Cart, CartItem, Coupon, NewCartItem, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, User,
};
use crate::domain::value_objects::CouponCode;

/// Write that should fail, for exercising rollback.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrderItem,
    AdjustStock,
    ClearCart,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, Uuid>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    cart_items: BTreeMap<Uuid, CartItem>,
    coupons: HashMap<String, Coupon>,
    orders: BTreeMap<Uuid, Order>,
    order_items: BTreeMap<Uuid, OrderItem>,
    #[cfg(any(test, feature = "test-util"))]
    failpoint: Option<FailPoint>,
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryState {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.failpoint == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user reachable through the given bearer token.
    pub async fn insert_user(&self, name: &str, email: &str, is_admin: bool, token: &str) -> User {
        let user = User { id: Uuid::now_v7(), name: name.to_string(), email: email.to_string(), is_admin };
        let mut state = self.state.lock().await;
        state.tokens.insert(hash_token(token), user.id);
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn insert_product(&self, product: Product) -> Product {
        self.state.lock().await.products.insert(product.id, product.clone());
        product
    }

    pub async fn insert_coupon(&self, coupon: Coupon) -> Coupon {
        self.state.lock().await.coupons.insert(coupon.code.as_str().to_string(), coupon.clone());
        coupon
    }

    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn coupon(&self, code: &str) -> Option<Coupon> {
        let code = CouponCode::new(code).ok()?;
        self.state.lock().await.coupons.get(code.as_str()).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    #[cfg(any(test, feature = "test-util"))]
    pub async fn set_order_status(&self, id: Uuid, status: OrderStatus) {
        if let Some(order) = self.state.lock().await.orders.get_mut(&id) {
            order.status = status;
        }
    }

    #[cfg(any(test, feature = "test-util"))]
    pub async fn fail_at(&self, point: Option<FailPoint>) {
        self.state.lock().await.failpoint = point;
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, work }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(page.limit() as usize).collect()
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, work } = *self;
        #[cfg(any(test, feature = "test-util"))]
        work.check(FailPoint::Commit)?;
        *guard = work;
        Ok(())
    }

    async fn find_user_by_token_hash(&mut self, token_hash: &str) -> Result<Option<User>, StoreError> {
        Ok(self.work.tokens.get(token_hash).and_then(|id| self.work.users.get(id)).cloned())
    }

    async fn list_active_products(&mut self, page: Page) -> Result<(Vec<Product>, i64), StoreError> {
        let mut products: Vec<Product> = self.work.products.values().filter(|p| p.is_active).cloned().collect();
        newest_first(&mut products, |p| (p.created_at, p.id));
        let total = products.len() as i64;
        Ok((paginate(products, page), total))
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = ids.iter().filter_map(|id| self.work.products.get(id)).cloned().collect();
        products.sort_by_key(|p| p.id);
        products.dedup_by_key(|p| p.id);
        Ok(products)
    }

    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> Result<Product, StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.work.check(FailPoint::AdjustStock)?;
        let product = self.work.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product
            .adjust_stock(delta)
            .map_err(|_| StoreError::Constraint("products_stock_non_negative".to_string()))?;
        Ok(product.clone())
    }

    async fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        Ok(self.work.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        self.find_cart(user_id).await
    }

    async fn create_cart(&mut self, user_id: Uuid) -> Result<Cart, StoreError> {
        if let Some(existing) = self.work.carts.values().find(|c| c.user_id == user_id) {
            return Ok(existing.clone());
        }
        if !self.work.users.contains_key(&user_id) {
            return Err(StoreError::InvalidReference);
        }
        let cart = Cart::for_user(user_id);
        self.work.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>, StoreError> {
        Ok(self.work.cart_items.values().filter(|i| i.cart_id == cart_id).cloned().collect())
    }

    async fn upsert_cart_item(&mut self, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, StoreError> {
        if !self.work.carts.contains_key(&cart_id) || !self.work.products.contains_key(&item.product_id) {
            return Err(StoreError::InvalidReference);
        }
        let now = Utc::now();
        let existing = self
            .work
            .cart_items
            .values_mut()
            .find(|i| i.cart_id == cart_id && i.matches(item.product_id, item.size.as_deref(), item.color.as_deref()));

        if let Some(existing) = existing {
            existing.quantity = existing
                .quantity
                .checked_add(item.quantity)
                .ok_or_else(|| StoreError::Constraint("cart_items_quantity".to_string()))?;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = CartItem {
            id: Uuid::now_v7(),
            cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            size: item.size,
            color: item.color,
            created_at: now,
            updated_at: now,
        };
        self.work.cart_items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_cart_item_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<CartItem, StoreError> {
        let item = self.work.cart_items.get_mut(&item_id).ok_or(StoreError::NotFound)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete_cart_item(&mut self, cart_id: Uuid, item_id: Uuid) -> Result<u64, StoreError> {
        match self.work.cart_items.get(&item_id) {
            Some(item) if item.cart_id == cart_id => {
                self.work.cart_items.remove(&item_id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn clear_cart(&mut self, cart_id: Uuid) -> Result<u64, StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.work.check(FailPoint::ClearCart)?;
        let before = self.work.cart_items.len();
        self.work.cart_items.retain(|_, i| i.cart_id != cart_id);
        Ok((before - self.work.cart_items.len()) as u64)
    }

    async fn find_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Ok(self.work.coupons.get(code.as_str()).cloned())
    }

    async fn lock_coupon(&mut self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        self.find_coupon(code).await
    }

    async fn increment_coupon_usage(&mut self, id: Uuid) -> Result<Coupon, StoreError> {
        let coupon = self.work.coupons.values_mut().find(|c| c.id == id).ok_or(StoreError::NotFound)?;
        if coupon.usage_limit.is_some_and(|limit| coupon.used_count >= limit) {
            return Err(StoreError::Constraint("coupons_usage_within_limit".to_string()));
        }
        coupon.record_use();
        Ok(coupon.clone())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        if self.work.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        let created = Order {
            id: Uuid::now_v7(),
            order_number: order.order_number,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            subtotal: order.subtotal,
            shipping: order.shipping,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            coupon_code: order.coupon_code,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            notes: order.notes,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };
        self.work.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn insert_order_item(&mut self, order_id: Uuid, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.work.check(FailPoint::InsertOrderItem)?;
        if !self.work.orders.contains_key(&order_id) {
            return Err(StoreError::InvalidReference);
        }
        let total = item.total();
        let created = OrderItem {
            id: Uuid::now_v7(),
            order_id,
            product_id: item.product_id,
            product_name: item.product_name,
            price: item.price,
            quantity: item.quantity,
            size: item.size,
            color: item.color,
            total,
        };
        self.work.order_items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.find_order(id).await
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.work.order_items.values().filter(|i| i.order_id == order_id).cloned().collect())
    }

    async fn list_orders(&mut self, filter: OrderFilter, page: Page) -> Result<(Vec<Order>, i64), StoreError> {
        let mut orders: Vec<Order> = self
            .work
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |user| o.user_id == user))
            .filter(|o| filter.status.map_or(true, |status| o.status == status))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        let total = orders.len() as i64;
        Ok((paginate(orders, page), total))
    }

    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        let order = self.work.orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        order.status = status;
        if status == OrderStatus::Cancelled {
            order.cancelled_at = Some(now);
        }
        order.updated_at = now;
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(Product::new("Lamp", Decimal::from(10), 5)).await;

        let mut tx = db.begin().await.unwrap();
        tx.adjust_stock(product.id, -3).await.unwrap();
        drop(tx);
        assert_eq!(db.product(product.id).await.unwrap().stock, 5);

        let mut tx = db.begin().await.unwrap();
        tx.adjust_stock(product.id, -3).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(db.product(product.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn stock_cannot_go_negative() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(Product::new("Lamp", Decimal::from(10), 1)).await;

        let mut tx = db.begin().await.unwrap();
        let result = tx.adjust_stock(product.id, -2).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))), "got {result:?}");
    }

    #[tokio::test]
    async fn upsert_merges_same_variant() {
        let db = MemoryDatabase::new();
        let user = db.insert_user("Ada", "ada@example.com", false, "tok").await;
        let product = db.insert_product(Product::new("Shirt", Decimal::from(20), 10)).await;

        let mut tx = db.begin().await.unwrap();
        let cart = tx.create_cart(user.id).await.unwrap();
        let new = |qty, size: &str| NewCartItem {
            product_id: product.id,
            quantity: qty,
            size: Some(size.into()),
            color: None,
        };
        let first = tx.upsert_cart_item(cart.id, new(1, "M")).await.unwrap();
        let merged = tx.upsert_cart_item(cart.id, new(2, "M")).await.unwrap();
        tx.upsert_cart_item(cart.id, new(1, "L")).await.unwrap();

        assert_eq!(first.id, merged.id);
        assert_eq!(merged.quantity, 3);
        assert_eq!(tx.cart_items(cart.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_commit_keeps_previous_state() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(Product::new("Lamp", Decimal::from(10), 5)).await;
        db.fail_at(Some(FailPoint::Commit)).await;

        let mut tx = db.begin().await.unwrap();
        tx.adjust_stock(product.id, -1).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert_eq!(db.product(product.id).await.unwrap().stock, 5);
    }
}
