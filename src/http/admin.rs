//! Admin order management.

use axum::{extract::State, Json};
use tracing::info;
use uuid::Uuid;

use super::{
    auth::AdminUser,
    error::ApiError,
    requests::{ApiPath, ApiQuery, ListQuery, UpdateOrderStatusRequest, ValidatedJson},
};
use crate::domain::aggregates::Order;
use crate::services::Paginated;
use crate::state::AppState;
use crate::storage::OrderFilter;

pub async fn list_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let filter = OrderFilter { user_id: None, status: query.status };
    Ok(Json(state.orders.list_orders(filter, query.page()).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    info!(admin = %admin.id, order_id = %id, status = %request.status, "admin status update");
    Ok(Json(state.orders.update_status(id, request.status).await?))
}
