//! Order totals: subtotal, discount, tax, shipping.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::value_objects::round_money;

/// Flat shipping fee and tax rate applied at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    pub shipping_fee: Decimal,
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self { shipping_fee: Decimal::new(1500, 2), tax_rate: Decimal::new(8, 2) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PricingPolicy {
    /// Tax is charged on the discounted subtotal; shipping is untaxed.
    pub fn quote(&self, subtotal: Decimal, discount: Decimal) -> Totals {
        let taxable = (subtotal - discount).max(Decimal::ZERO);
        let tax = round_money(taxable * self.tax_rate);
        let shipping = round_money(self.shipping_fee);
        Totals {
            subtotal: round_money(subtotal),
            discount: round_money(discount),
            shipping,
            tax,
            total: round_money(taxable + shipping + tax),
        }
    }
}
