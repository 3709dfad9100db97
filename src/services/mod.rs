//! Application services. Each call runs in its own storage transaction.

pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod error;
pub mod orders;

use serde::Serialize;

use crate::storage::Page;

pub use cart::{AddToCart, CartService};
pub use catalog::CatalogService;
pub use coupons::{CouponQuote, CouponService};
pub use error::ServiceError;
pub use orders::{OrderService, PlaceOrder};

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: Page) -> Self {
        Self { data, total, page: page.number(), per_page: page.limit() }
    }
}
