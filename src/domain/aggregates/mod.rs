//! Aggregates module
pub mod product;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod user;

pub use product::{Product, ProductError};
pub use cart::{requested_per_product, Cart, CartItem, CartLine, CartSummary, NewCartItem};
pub use coupon::{Coupon, CouponOutcome, DiscountType};
pub use order::{generate_order_number, Address, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentMethod};
pub use user::User;
