//! Coupons repository

use sqlx::{postgres::PgRow, query_as, FromRow, Row};
use uuid::Uuid;

use super::{decode_error, PgTx};
use crate::domain::aggregates::Coupon;
use crate::domain::value_objects::CouponCode;
use crate::storage::StoreError;

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, min_order_amount, \
     max_discount, usage_limit, used_count, starts_at, expires_at, is_active, created_at, updated_at";

#[derive(Debug)]
struct CouponRow(Coupon);

impl<'r> FromRow<'r, PgRow> for CouponRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let code: String = row.try_get("code")?;
        let discount_type: String = row.try_get("discount_type")?;

        Ok(Self(Coupon {
            id: row.try_get("id")?,
            code: CouponCode::new(code).map_err(|e| decode_error("code", e))?,
            description: row.try_get("description")?,
            discount_type: discount_type.parse().map_err(|e| decode_error("discount_type", e))?,
            discount_value: row.try_get("discount_value")?,
            min_order_amount: row.try_get("min_order_amount")?,
            max_discount: row.try_get("max_discount")?,
            usage_limit: row.try_get("usage_limit")?,
            used_count: row.try_get("used_count")?,
            starts_at: row.try_get("starts_at")?,
            expires_at: row.try_get("expires_at")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

/// Looks a coupon up by its normalized code, optionally locking the row.
pub(super) async fn find(tx: &mut PgTx, code: &CouponCode, for_update: bool) -> Result<Option<Coupon>, StoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1{lock}");
    let row = query_as::<_, CouponRow>(&sql).bind(code.as_str()).fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.0))
}

pub(super) async fn increment_usage(tx: &mut PgTx, id: Uuid) -> Result<Coupon, StoreError> {
    let sql = format!(
        "UPDATE coupons SET used_count = used_count + 1, updated_at = NOW() WHERE id = $1 RETURNING {COUPON_COLUMNS}"
    );
    let row = query_as::<_, CouponRow>(&sql).bind(id).fetch_one(&mut **tx).await?;
    Ok(row.0)
}
