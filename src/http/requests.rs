//! Request bodies and query strings.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::error::ApiError;
use crate::domain::aggregates::{Address, OrderStatus, PaymentMethod};
use crate::services::{AddToCart, PlaceOrder};
use crate::storage::Page;

/// JSON body that has passed its `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// URL path parameters; a bad segment is answered with a JSON 400.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query string parameters; a bad value is answered with a JSON 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Largest order amount the coupon preview accepts.
// 999_999_999_999.99, i.e. mantissa 99_999_999_999_999 at scale 2 (`Decimal::new` is not const).
pub const MAX_ORDER_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

fn order_amount_in_range(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative"));
    }
    if *value > MAX_ORDER_AMOUNT {
        return Err(ValidationError::new("range"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub line1: String,
    #[validate(length(max = 255))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 100))]
    pub country: String,
}

impl From<AddressInput> for Address {
    fn from(input: AddressInput) -> Self {
        Self {
            full_name: input.full_name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            email: input.email.trim().to_string(),
            line1: input.line1.trim().to_string(),
            line2: input.line2.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            city: input.city.trim().to_string(),
            state: input.state.trim().to_string(),
            postal_code: input.postal_code.trim().to_string(),
            country: input.country.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate]
    pub shipping_address: AddressInput,
    #[validate]
    pub billing_address: Option<AddressInput>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(max = 50))]
    pub coupon_code: Option<String>,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(request: PlaceOrderRequest) -> Self {
        Self {
            shipping_address: request.shipping_address.into(),
            billing_address: request.billing_address.map(Into::into),
            payment_method: request.payment_method,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            coupon_code: request.coupon_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}

impl From<AddCartItemRequest> for AddToCart {
    fn from(request: AddCartItemRequest) -> Self {
        Self { product_id: request.product_id, quantity: request.quantity, size: request.size, color: request.color }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(custom = "order_amount_in_range")]
    pub order_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page { page: self.page, per_page: self.per_page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> serde_json::Value {
        json!({
            "full_name": "Ada Lovelace",
            "phone": "+44 20 7946 0000",
            "email": "ada@example.com",
            "line1": "12 St James's Square",
            "city": "London",
            "state": "London",
            "postal_code": "SW1Y 4JH",
            "country": "GB"
        })
    }

    #[test]
    fn test_nested_address_is_validated() {
        let mut billing = address();
        billing["email"] = json!("not-an-email");
        let request: PlaceOrderRequest = serde_json::from_value(json!({
            "shipping_address": address(),
            "billing_address": billing,
            "payment_method": "card"
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        assert!(errors.errors().contains_key("billing_address"), "got {errors:?}");
    }

    #[test]
    fn test_unknown_payment_method_is_rejected() {
        let result = serde_json::from_value::<PlaceOrderRequest>(json!({
            "shipping_address": address(),
            "payment_method": "barter"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_order_amount_is_rejected() {
        let request = ApplyCouponRequest { code: "SAVE".into(), order_amount: Decimal::new(-1, 2) };
        assert!(request.validate().is_err());
        let request = ApplyCouponRequest { code: "SAVE".into(), order_amount: Decimal::ZERO };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_order_amount_has_an_upper_bound() {
        let request = ApplyCouponRequest { code: "SAVE".into(), order_amount: MAX_ORDER_AMOUNT };
        assert!(request.validate().is_ok());

        let request = ApplyCouponRequest { code: "SAVE".into(), order_amount: Decimal::MAX };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors()["order_amount"].iter().any(|e| e.code == "range"), "got {errors:?}");
    }
}
