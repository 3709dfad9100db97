//! Coupon preview: what a code would take off a given amount.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::ServiceError;
use crate::domain::aggregates::{Coupon, CouponOutcome};
use crate::domain::value_objects::{round_money, CouponCode};
use crate::storage::Database;

#[derive(Debug, Clone, Serialize)]
pub struct CouponQuote {
    pub coupon: Coupon,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<dyn Database>,
}

impl CouponService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Unknown code, invalid coupon and unmet minimum are distinct errors.
    #[instrument(skip(self))]
    pub async fn preview(&self, code: &str, order_amount: Decimal) -> Result<CouponQuote, ServiceError> {
        let code = CouponCode::new(code).map_err(|_| ServiceError::CouponNotFound)?;

        let mut tx = self.db.begin().await?;
        let coupon = tx.find_coupon(&code).await?;
        tx.commit().await?;
        let coupon = coupon.ok_or(ServiceError::CouponNotFound)?;

        match coupon.evaluate(Utc::now(), order_amount) {
            CouponOutcome::Invalid => Err(ServiceError::CouponInvalid),
            CouponOutcome::BelowMinimum { minimum } => Err(ServiceError::CouponMinimumNotMet { minimum }),
            CouponOutcome::Applied { discount } => Ok(CouponQuote {
                final_amount: round_money((order_amount - discount).max(Decimal::ZERO)),
                discount_amount: discount,
                coupon,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::aggregates::DiscountType;
    use crate::storage::memory::MemoryDatabase;

    async fn service_with(coupon: Coupon) -> CouponService {
        let db = MemoryDatabase::new();
        db.insert_coupon(coupon).await;
        CouponService::new(Arc::new(db))
    }

    fn coupon(code: &str, discount_type: DiscountType, value: i64) -> Coupon {
        Coupon::new(CouponCode::new(code).unwrap(), discount_type, Decimal::from(value))
    }

    #[tokio::test]
    async fn preview_is_case_insensitive() {
        let mut c = coupon("SAVE20", DiscountType::Percentage, 20);
        c.max_discount = Some(Decimal::from(100));
        let service = service_with(c).await;

        let quote = service.preview("save20", Decimal::from(1000)).await.unwrap();
        assert_eq!(quote.discount_amount, Decimal::from(100));
        assert_eq!(quote.final_amount, Decimal::from(900));
    }

    #[tokio::test]
    async fn preview_distinguishes_outcomes() {
        let mut c = coupon("BIG", DiscountType::Fixed, 50);
        c.min_order_amount = Some(Decimal::from(500));
        let service = service_with(c).await;

        assert!(matches!(service.preview("NOPE", Decimal::from(600)).await, Err(ServiceError::CouponNotFound)));
        assert!(matches!(
            service.preview("BIG", Decimal::from(300)).await,
            Err(ServiceError::CouponMinimumNotMet { .. })
        ));
        assert!(service.preview("BIG", Decimal::from(600)).await.is_ok());
    }

    #[tokio::test]
    async fn preview_of_maximal_amount_is_computed() {
        let service = service_with(coupon("SAVE20", DiscountType::Percentage, 20)).await;
        let quote = service.preview("SAVE20", Decimal::MAX).await.unwrap();
        assert!(quote.discount_amount > Decimal::ZERO);
        assert!(quote.final_amount > Decimal::ZERO && quote.final_amount < Decimal::MAX);
    }

    #[tokio::test]
    async fn expired_coupon_is_invalid() {
        let mut c = coupon("OLD", DiscountType::Fixed, 5);
        c.expires_at = Some(Utc::now() - Duration::days(1));
        let service = service_with(c).await;
        assert!(matches!(service.preview("OLD", Decimal::from(10)).await, Err(ServiceError::CouponInvalid)));
    }
}
