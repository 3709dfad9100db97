use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{
    auth::AuthUser,
    error::ApiError,
    requests::{ApiPath, ApiQuery, ListQuery, PlaceOrderRequest, ValidatedJson},
};
use crate::domain::aggregates::Order;
use crate::services::Paginated;
use crate::state::AppState;
use crate::storage::OrderFilter;

pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let filter = OrderFilter { user_id: Some(user.id), status: query.status };
    Ok(Json(state.orders.list_orders(filter, query.page()).await?))
}

pub async fn place_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders.place_order(user.id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_order(user.id, id).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.cancel_order(user.id, id).await?))
}
