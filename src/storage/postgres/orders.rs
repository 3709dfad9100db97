//! Orders repository

use sqlx::{postgres::PgRow, query_as, query_scalar, types::Json, FromRow, Row};
use uuid::Uuid;

use super::{decode_error, limit_offset, tag_from_column, tag_to_column, PgTx};
use crate::domain::aggregates::{Address, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
use crate::storage::{OrderFilter, Page, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_method, subtotal, shipping, tax, \
     discount, total, coupon_code, shipping_address, billing_address, notes, cancelled_at, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, price, quantity, size, color, total";

#[derive(Debug)]
struct OrderRow(Order);

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let payment_method: String = row.try_get("payment_method")?;
        let Json(shipping_address) = row.try_get::<Json<Address>, _>("shipping_address")?;
        let Json(billing_address) = row.try_get::<Json<Address>, _>("billing_address")?;

        Ok(Self(Order {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            user_id: row.try_get("user_id")?,
            status: status.parse().map_err(|e| decode_error("status", e))?,
            payment_method: payment_method.parse().map_err(|e| decode_error("payment_method", e))?,
            subtotal: row.try_get("subtotal")?,
            shipping: row.try_get("shipping")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            coupon_code: row.try_get("coupon_code")?,
            shipping_address,
            billing_address,
            notes: row.try_get("notes")?,
            cancelled_at: row.try_get("cancelled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
        }))
    }
}

#[derive(Debug)]
struct OrderItemRow(OrderItem);

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(OrderItem {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            size: tag_from_column(row.try_get("size")?),
            color: tag_from_column(row.try_get("color")?),
            total: row.try_get("total")?,
        }))
    }
}

pub(super) async fn insert(tx: &mut PgTx, order: NewOrder) -> Result<Order, StoreError> {
    let sql = format!(
        "INSERT INTO orders (id, order_number, user_id, status, payment_method, subtotal, shipping, tax, discount, \
         total, coupon_code, shipping_address, billing_address, notes, created_at, updated_at) \
         VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW()) \
         RETURNING {ORDER_COLUMNS}"
    );
    let row = query_as::<_, OrderRow>(&sql)
        .bind(Uuid::now_v7())
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.payment_method.as_str())
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.tax)
        .bind(order.discount)
        .bind(order.total)
        .bind(&order.coupon_code)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.billing_address))
        .bind(&order.notes)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.0)
}

pub(super) async fn insert_item(tx: &mut PgTx, order_id: Uuid, item: NewOrderItem) -> Result<OrderItem, StoreError> {
    let sql = format!(
        "INSERT INTO order_items (id, order_id, product_id, product_name, price, quantity, size, color, total) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ITEM_COLUMNS}"
    );
    let row = query_as::<_, OrderItemRow>(&sql)
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.price)
        .bind(item.quantity)
        .bind(tag_to_column(item.size.as_deref()))
        .bind(tag_to_column(item.color.as_deref()))
        .bind(item.total())
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.0)
}

pub(super) async fn find(tx: &mut PgTx, id: Uuid, for_update: bool) -> Result<Option<Order>, StoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}");
    let row = query_as::<_, OrderRow>(&sql).bind(id).fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.0))
}

pub(super) async fn items(tx: &mut PgTx, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
    let rows = query_as::<_, OrderItemRow>(&sql).bind(order_id).fetch_all(&mut **tx).await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub(super) async fn list(tx: &mut PgTx, filter: OrderFilter, page: Page) -> Result<(Vec<Order>, i64), StoreError> {
    let (limit, offset) = limit_offset(page);
    let status = filter.status.map(|s| s.as_str());
    let condition = "($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)";

    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE {condition} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
    );
    let rows = query_as::<_, OrderRow>(&sql)
        .bind(filter.user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut **tx)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM orders WHERE {condition}");
    let total: i64 = query_scalar(&count_sql)
        .bind(filter.user_id)
        .bind(status)
        .fetch_one(&mut **tx)
        .await?;

    Ok((rows.into_iter().map(|r| r.0).collect(), total))
}

pub(super) async fn update_status(tx: &mut PgTx, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
    let sql = format!(
        "UPDATE orders SET status = $2, \
         cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END, \
         updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let row = query_as::<_, OrderRow>(&sql).bind(id).bind(status.as_str()).fetch_one(&mut **tx).await?;
    Ok(row.0)
}
