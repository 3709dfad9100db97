//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, stock: i32) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), name: name.into(), price, stock, is_active: true, created_at: now, updated_at: now }
    }

    /// Quantity that can actually be sold. Inactive products sell nothing.
    pub fn available(&self) -> i32 {
        if self.is_active { self.stock.max(0) } else { 0 }
    }

    pub fn ensure_available(&self, requested: i32) -> Result<(), ProductError> {
        let available = self.available();
        if requested > available {
            return Err(ProductError::InsufficientStock { product: self.name.clone(), available, requested });
        }
        Ok(())
    }

    /// Applies a stock delta, refusing to go below zero.
    pub fn adjust_stock(&mut self, delta: i32) -> Result<(), ProductError> {
        let next = self.stock.checked_add(delta).filter(|s| *s >= 0).ok_or_else(|| ProductError::InsufficientStock {
            product: self.name.clone(),
            available: self.stock,
            requested: delta.saturating_neg(),
        })?;
        self.stock = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock { product: String, available: i32, requested: i32 },
}
