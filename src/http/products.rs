use axum::{extract::State, Json};
use uuid::Uuid;

use super::{
    error::ApiError,
    requests::{ApiPath, ApiQuery, ListQuery},
};
use crate::domain::aggregates::Product;
use crate::services::Paginated;
use crate::state::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Paginated<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products(query.page()).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.get_product(id).await?))
}
