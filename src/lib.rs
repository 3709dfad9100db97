//! Storefront Orders
//!
//! Cart, coupon and order placement service for a storefront.
//!
//! ## Features
//! - Per-user carts with size/color variants
//! - Coupon preview and redemption
//! - Transactional checkout: stock, coupon usage and cart clearing in one unit
//! - Order history, customer cancellation and admin status changes
//! - Domain events over NATS

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod messaging;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use state::AppState;
