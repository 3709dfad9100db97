//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Snapshot of one purchased line, decoupled from the live product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Forward moves along the fulfilment line, or cancellation from anything
    /// not already cancelled.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self.rank(), next.rank()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(from), Some(to)) => to > from,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::CashOnDelivery => "cash_on_delivery",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant {0:?}")]
pub struct UnknownVariant(pub String);

/// Order row to insert; items are written separately.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl NewOrderItem {
    pub fn total(&self) -> Decimal { self.price * Decimal::from(self.quantity) }
}

/// `ORD-YYYYMMDD-XXXXXXXX`, random hex suffix.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}-{:08X}", now.format("%Y%m%d"), rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(Delivered.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Confirmed));
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("returned".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_number_format() {
        let now = "2024-03-05T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let number = generate_order_number(now);
        assert!(number.starts_with("ORD-20240305-"));
        assert_eq!(number.len(), "ORD-20240305-".len() + 8);
    }
}
