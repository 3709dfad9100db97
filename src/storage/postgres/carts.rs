//! Carts repository

use sqlx::{postgres::PgRow, query, query_as, FromRow, Row};
use uuid::Uuid;

use super::{tag_from_column, tag_to_column, PgTx};
use crate::domain::aggregates::{Cart, CartItem, NewCartItem};
use crate::storage::StoreError;

const CART_COLUMNS: &str = "id, user_id, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, size, color, created_at, updated_at";

#[derive(Debug)]
struct CartRow(Cart);

impl<'r> FromRow<'r, PgRow> for CartRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(Cart {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

#[derive(Debug)]
struct CartItemRow(CartItem);

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(CartItem {
            id: row.try_get("id")?,
            cart_id: row.try_get("cart_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            size: tag_from_column(row.try_get("size")?),
            color: tag_from_column(row.try_get("color")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

pub(super) async fn find(tx: &mut PgTx, user_id: Uuid, for_update: bool) -> Result<Option<Cart>, StoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1{lock}");
    let row = query_as::<_, CartRow>(&sql).bind(user_id).fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.0))
}

/// Lazily creates the user's cart; a concurrent creator wins and its row is returned.
pub(super) async fn create(tx: &mut PgTx, user_id: Uuid) -> Result<Cart, StoreError> {
    let sql = format!(
        "INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) \
         ON CONFLICT (user_id) DO UPDATE SET updated_at = carts.updated_at RETURNING {CART_COLUMNS}"
    );
    let row = query_as::<_, CartRow>(&sql).bind(Uuid::now_v7()).bind(user_id).fetch_one(&mut **tx).await?;
    Ok(row.0)
}

pub(super) async fn items(tx: &mut PgTx, cart_id: Uuid) -> Result<Vec<CartItem>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY created_at, id");
    let rows = query_as::<_, CartItemRow>(&sql).bind(cart_id).fetch_all(&mut **tx).await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub(super) async fn upsert_item(tx: &mut PgTx, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, StoreError> {
    let sql = format!(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity, size, color, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
         ON CONFLICT (cart_id, product_id, size, color) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
         RETURNING {ITEM_COLUMNS}"
    );
    let row = query_as::<_, CartItemRow>(&sql)
        .bind(Uuid::now_v7())
        .bind(cart_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(tag_to_column(item.size.as_deref()))
        .bind(tag_to_column(item.color.as_deref()))
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.0)
}

pub(super) async fn set_item_quantity(tx: &mut PgTx, item_id: Uuid, quantity: i32) -> Result<CartItem, StoreError> {
    let sql = format!(
        "UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING {ITEM_COLUMNS}"
    );
    let row = query_as::<_, CartItemRow>(&sql).bind(item_id).bind(quantity).fetch_one(&mut **tx).await?;
    Ok(row.0)
}

pub(super) async fn delete_item(tx: &mut PgTx, cart_id: Uuid, item_id: Uuid) -> Result<u64, StoreError> {
    let rows_affected = query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(rows_affected)
}

pub(super) async fn clear(tx: &mut PgTx, cart_id: Uuid) -> Result<u64, StoreError> {
    let rows_affected = query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(rows_affected)
}
