//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amounts are kept at two decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to the storefront's money scale, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Coupon code value object. Codes are case-insensitive and stored upper-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(CouponCodeError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self { code.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponCodeError {
    #[error("coupon code is empty")]
    Empty,
    #[error("coupon code is longer than {} characters", CouponCode::MAX_LEN)]
    TooLong,
}

/// Line quantity value object; always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self, QuantityError> {
        if value < 1 { return Err(QuantityError::NotPositive(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> i32 { self.0 }
    pub fn add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).map(Self).ok_or(QuantityError::Overflow)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1, got {0}")]
    NotPositive(i32),
    #[error("quantity overflow")]
    Overflow,
}

/// Optional variant tag (size or colour). Blank tags are treated as absent.
pub fn normalize_variant(tag: Option<String>) -> Option<String> {
    tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_normalized() {
        let code = CouponCode::new("  save20 ").unwrap();
        assert_eq!(code.as_str(), "SAVE20");
    }

    #[test]
    fn test_coupon_code_rejects_blank() {
        assert_eq!(CouponCode::new("   "), Err(CouponCodeError::Empty));
        assert_eq!(CouponCode::new("X".repeat(51)), Err(CouponCodeError::TooLong));
    }

    #[test]
    fn test_quantity() {
        assert!(Quantity::new(0).is_err());
        let q = Quantity::new(2).unwrap();
        assert_eq!(q.add(Quantity::new(3).unwrap()).unwrap().value(), 5);
        assert_eq!(Quantity::new(i32::MAX).unwrap().add(q), Err(QuantityError::Overflow));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(32, 0)), Decimal::new(32, 0));
    }

    #[test]
    fn test_normalize_variant() {
        assert_eq!(normalize_variant(Some(" M ".into())), Some("M".into()));
        assert_eq!(normalize_variant(Some("  ".into())), None);
        assert_eq!(normalize_variant(None), None);
    }
}
