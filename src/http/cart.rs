//! Cart endpoints. Every response carries the whole cart.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{
    auth::AuthUser,
    error::ApiError,
    requests::{AddCartItemRequest, ApiPath, UpdateCartItemRequest, ValidatedJson},
};
use crate::domain::aggregates::{CartLine, CartSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub available: i32,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub item_count: i64,
    pub subtotal: Decimal,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        let total = line.total();
        Self {
            id: line.item.id,
            product_id: line.product.id,
            available: line.product.available(),
            product_name: line.product.name,
            price: line.product.price,
            quantity: line.item.quantity,
            size: line.item.size,
            color: line.item.color,
            total,
        }
    }
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        let item_count = summary.item_count();
        let subtotal = summary.subtotal();
        Self {
            id: summary.cart.id,
            items: summary.lines.into_iter().map(Into::into).collect(),
            item_count,
            subtotal,
        }
    }
}

pub async fn get_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.carts.get_cart(user.id).await?.into()))
}

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<AddCartItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let summary = state.carts.add_item(user.id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(summary.into())))
}

pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(item_id): ApiPath<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.carts.update_item(user.id, item_id, request.quantity).await?.into()))
}

pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(item_id): ApiPath<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.carts.remove_item(user.id, item_id).await?.into()))
}

pub async fn clear(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<StatusCode, ApiError> {
    state.carts.clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
