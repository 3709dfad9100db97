//! Coupon Aggregate
//!
//! A coupon is a named discount rule. Validity depends on the active flag,
//! the optional validity window and the optional usage limit; the discount
//! itself depends on the order amount.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::{round_money, CouponCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "percentage", Self::Fixed => "fixed" }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DiscountType {
    type Err = UnknownDiscountType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(UnknownDiscountType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown discount type {0:?}")]
pub struct UnknownDiscountType(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of trying a coupon against an order amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouponOutcome {
    Invalid,
    BelowMinimum { minimum: Decimal },
    Applied { discount: Decimal },
}

impl Coupon {
    pub fn new(code: CouponCode, discount_type: DiscountType, discount_value: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), code, description: None, discount_type, discount_value,
            min_order_amount: None, max_discount: None, usage_limit: None, used_count: 0,
            starts_at: None, expires_at: None, is_active: true, created_at: now, updated_at: now,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.map_or(true, |start| now >= start)
            && self.expires_at.map_or(true, |end| now <= end)
            && self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    pub fn meets_minimum(&self, amount: Decimal) -> bool {
        self.min_order_amount.map_or(true, |min| amount >= min)
    }

    /// Discount for `amount`, or zero when the minimum order amount is not met.
    /// Does not look at validity.
    pub fn calculate_discount(&self, amount: Decimal) -> Decimal {
        if !self.meets_minimum(amount) {
            return Decimal::ZERO;
        }
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                // Divide first only when the full product does not fit.
                let raw = amount
                    .checked_mul(self.discount_value)
                    .map(|product| product / Decimal::ONE_HUNDRED)
                    .or_else(|| (amount / Decimal::ONE_HUNDRED).checked_mul(self.discount_value))
                    .unwrap_or(amount)
                    .min(amount);
                self.max_discount.map_or(raw, |cap| raw.min(cap))
            }
            DiscountType::Fixed => self.discount_value.min(amount),
        };
        round_money(discount.max(Decimal::ZERO))
    }

    pub fn evaluate(&self, now: DateTime<Utc>, amount: Decimal) -> CouponOutcome {
        if !self.is_valid(now) {
            return CouponOutcome::Invalid;
        }
        match self.min_order_amount {
            Some(minimum) if amount < minimum => CouponOutcome::BelowMinimum { minimum },
            _ => CouponOutcome::Applied { discount: self.calculate_discount(amount) },
        }
    }

    pub fn record_use(&mut self) {
        self.used_count += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon::new(CouponCode::new("TEST").unwrap(), discount_type, Decimal::from(value))
    }

    #[test]
    fn test_percentage_is_capped() {
        let mut c = coupon(DiscountType::Percentage, 20);
        c.max_discount = Some(Decimal::from(100));
        assert_eq!(c.calculate_discount(Decimal::from(1000)), Decimal::from(100));
        assert_eq!(c.calculate_discount(Decimal::from(300)), Decimal::from(60));
    }

    #[test]
    fn test_fixed_never_exceeds_amount() {
        let c = coupon(DiscountType::Fixed, 50);
        assert_eq!(c.calculate_discount(Decimal::from(30)), Decimal::from(30));
        assert_eq!(c.calculate_discount(Decimal::from(80)), Decimal::from(50));
    }

    #[test]
    fn test_minimum_not_met_gives_zero() {
        let mut c = coupon(DiscountType::Fixed, 50);
        c.min_order_amount = Some(Decimal::from(500));
        assert_eq!(c.calculate_discount(Decimal::from(300)), Decimal::ZERO);
        assert_eq!(
            c.evaluate(Utc::now(), Decimal::from(300)),
            CouponOutcome::BelowMinimum { minimum: Decimal::from(500) }
        );
        assert_eq!(c.evaluate(Utc::now(), Decimal::from(500)), CouponOutcome::Applied { discount: Decimal::from(50) });
    }

    #[test]
    fn test_percentage_rounds_to_cents() {
        let c = coupon(DiscountType::Percentage, 15);
        assert_eq!(c.calculate_discount(Decimal::new(3333, 2)), Decimal::new(500, 2));
    }

    #[test]
    fn test_validity_window_and_usage() {
        let now = Utc::now();
        let mut c = coupon(DiscountType::Fixed, 10);
        assert!(c.is_valid(now));

        c.starts_at = Some(now + Duration::hours(1));
        assert!(!c.is_valid(now));
        c.starts_at = Some(now - Duration::hours(1));
        c.expires_at = Some(now - Duration::minutes(1));
        assert!(!c.is_valid(now));
        c.expires_at = Some(now);
        assert!(c.is_valid(now));

        c.usage_limit = Some(1);
        assert!(c.is_valid(now));
        c.record_use();
        assert!(!c.is_valid(now));
        assert_eq!(c.evaluate(now, Decimal::from(100)), CouponOutcome::Invalid);

        c.usage_limit = None;
        c.is_active = false;
        assert!(!c.is_valid(now));
    }

    #[test]
    fn test_percentage_of_huge_amount_does_not_overflow() {
        let c = coupon(DiscountType::Percentage, 20);
        let discount = c.calculate_discount(Decimal::MAX);
        assert!(discount > Decimal::ZERO && discount < Decimal::MAX, "got {discount}");

        let over = coupon(DiscountType::Percentage, 250);
        assert_eq!(over.calculate_discount(Decimal::MAX), Decimal::MAX);
        assert_eq!(over.calculate_discount(Decimal::from(40)), Decimal::from(40));
    }

    #[test]
    fn test_discount_type_parse() {
        assert_eq!("percentage".parse::<DiscountType>().unwrap(), DiscountType::Percentage);
        assert!("bogo".parse::<DiscountType>().is_err());
    }
}
