//! Products repository

use sqlx::{postgres::PgRow, query_as, query_scalar, FromRow, Row};
use uuid::Uuid;

use super::{limit_offset, PgTx};
use crate::domain::aggregates::Product;
use crate::storage::{Page, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, price, stock, is_active, created_at, updated_at";

#[derive(Debug)]
struct ProductRow(Product);

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

pub(super) async fn list_active(tx: &mut PgTx, page: Page) -> Result<(Vec<Product>, i64), StoreError> {
    let (limit, offset) = limit_offset(page);
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
    );
    let rows = query_as::<_, ProductRow>(&sql).bind(limit).bind(offset).fetch_all(&mut **tx).await?;
    let total: i64 = query_scalar("SELECT COUNT(*) FROM products WHERE is_active").fetch_one(&mut **tx).await?;
    Ok((rows.into_iter().map(|r| r.0).collect(), total))
}

pub(super) async fn find(tx: &mut PgTx, id: Uuid) -> Result<Option<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = query_as::<_, ProductRow>(&sql).bind(id).fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.0))
}

/// `FOR UPDATE` in id order so concurrent checkouts lock in the same sequence.
pub(super) async fn lock(tx: &mut PgTx, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE");
    let rows = query_as::<_, ProductRow>(&sql).bind(ids).fetch_all(&mut **tx).await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub(super) async fn adjust_stock(tx: &mut PgTx, id: Uuid, delta: i32) -> Result<Product, StoreError> {
    let sql = format!(
        "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    let row = query_as::<_, ProductRow>(&sql).bind(id).bind(delta).fetch_one(&mut **tx).await?;
    Ok(row.0)
}
