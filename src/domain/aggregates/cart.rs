//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::QuantityError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, created_at: now, updated_at: now }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Whether this item occupies the given (product, size, color) slot.
    pub fn matches(&self, product_id: Uuid, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id && self.size.as_deref() == size && self.color.as_deref() == color
    }
}

/// Item to merge into a cart.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A cart item joined with its live product.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn total(&self) -> Decimal { self.product.price * Decimal::from(self.item.quantity) }
}

/// Sums quantities per product across variant lines. A total that does not
/// fit in `i32` is an overflow, never a wrapped value.
pub fn requested_per_product(items: &[CartItem]) -> Result<BTreeMap<Uuid, i32>, QuantityError> {
    let mut totals: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        let total = totals.entry(item.product_id).or_insert(0);
        *total = total.checked_add(item.quantity).ok_or(QuantityError::Overflow)?;
    }
    Ok(totals)
}

#[derive(Clone, Debug, Serialize)]
pub struct CartSummary {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartSummary {
    pub fn subtotal(&self) -> Decimal { self.lines.iter().map(CartLine::total).sum() }
    pub fn item_count(&self) -> i64 { self.lines.iter().map(|l| i64::from(l.item.quantity)).sum() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}
