use axum::{extract::State, Json};

use super::{
    auth::AuthUser,
    error::ApiError,
    requests::{ApplyCouponRequest, ValidatedJson},
};
use crate::services::CouponQuote;
use crate::state::AppState;

/// Previews a coupon against an amount; nothing is redeemed.
pub async fn apply(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ValidatedJson(request): ValidatedJson<ApplyCouponRequest>,
) -> Result<Json<CouponQuote>, ApiError> {
    Ok(Json(state.coupons.preview(&request.code, request.order_amount).await?))
}
