use std::sync::Arc;

use crate::domain::pricing::PricingPolicy;
use crate::messaging::EventPublisher;
use crate::services::{CartService, CatalogService, CouponService, OrderService};
use crate::storage::Database;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub coupons: CouponService,
    pub orders: OrderService,
    /// Expose internal error details in responses.
    pub debug: bool,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, pricing: PricingPolicy, events: Arc<dyn EventPublisher>, debug: bool) -> Self {
        Self {
            catalog: CatalogService::new(Arc::clone(&db)),
            carts: CartService::new(Arc::clone(&db)),
            coupons: CouponService::new(Arc::clone(&db)),
            orders: OrderService::new(Arc::clone(&db), pricing, events),
            db,
            debug,
        }
    }
}
