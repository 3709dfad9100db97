//! HTTP surface: the `/api/v1` router and its handlers.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod coupons;
pub mod error;
pub mod orders;
pub mod products;
pub mod requests;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": env!("CARGO_PKG_NAME") }))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/cart", get(cart::get_cart).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:id", put(cart::update_item).delete(cart::remove_item))
        .route("/coupons/apply", post(coupons::apply))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/:id/status", put(admin::update_status));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.clone(), error::expose_internal_detail))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(error::panic_response))
        .with_state(state)
}
