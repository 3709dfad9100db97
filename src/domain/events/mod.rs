//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Coupon(CouponEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    StockReserved { product_id: Uuid, quantity: i32 },
    StockRestored { product_id: Uuid, quantity: i32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, user_id: Uuid, total: Decimal },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: Uuid, by_admin: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponEvent {
    Redeemed { coupon_id: Uuid, code: String, order_id: Uuid },
}

impl DomainEvent {
    /// Messaging subject, e.g. `storefront.orders.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::StockReserved { .. }) => "storefront.products.stock_reserved",
            Self::Product(ProductEvent::StockRestored { .. }) => "storefront.products.stock_restored",
            Self::Order(OrderEvent::Placed { .. }) => "storefront.orders.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.orders.status_changed",
            Self::Order(OrderEvent::Cancelled { .. }) => "storefront.orders.cancelled",
            Self::Coupon(CouponEvent::Redeemed { .. }) => "storefront.coupons.redeemed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = DomainEvent::Order(OrderEvent::Cancelled { order_id: Uuid::nil(), by_admin: true });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["event"]["type"], "cancelled");
        assert_eq!(json["event"]["by_admin"], true);
        assert_eq!(event.subject(), "storefront.orders.cancelled");
    }
}
