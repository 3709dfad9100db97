//! Service errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::{OrderStatus, ProductError};
use crate::domain::value_objects::QuantityError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {product}. Available: {available}")]
    InsufficientStock { product: String, available: i32, requested: i32 },

    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart item not found")]
    CartItemNotFound,

    #[error("{0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Coupon is invalid or expired")]
    CouponInvalid,

    #[error("Minimum order amount of {minimum} required for this coupon")]
    CouponMinimumNotMet { minimum: Decimal },

    #[error("Order not found")]
    OrderNotFound,

    #[error("Only pending orders can be cancelled (order is {status})")]
    OrderNotCancellable { status: OrderStatus },

    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Failed to create order")]
    OrderCreationFailed(#[source] StoreError),

    #[error("storage error")]
    Storage(#[from] StoreError),
}

impl From<ProductError> for ServiceError {
    fn from(error: ProductError) -> Self {
        match error {
            ProductError::InsufficientStock { product, available, requested } => {
                Self::InsufficientStock { product, available, requested }
            }
        }
    }
}

impl ServiceError {
    /// Underlying storage failure, if this error is one.
    pub fn storage_source(&self) -> Option<&StoreError> {
        match self {
            Self::OrderCreationFailed(source) | Self::Storage(source) => Some(source),
            _ => None,
        }
    }
}
