//! HTTP error responses.
//!
//! Every error body is `{"message": ..., "errors"?: ...}`. Internal failures
//! carry their detail in a response extension; [`expose_internal_detail`]
//! copies it into the body when debug mode is on.

use std::any::Any;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request, State,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The given data was invalid")]
    Validation(#[from] ValidationErrors),

    /// An extractor refused the request before it reached a handler.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+) => {
        $(impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                Self::Rejected { status: rejection.status(), message: rejection.body_text() }
            }
        })+
    };
}

impl_from_rejection!(JsonRejection, PathRejection, QueryRejection);

/// Detail of a 500 response, kept out of the body unless debug mode is on.
#[derive(Debug, Clone)]
pub struct InternalDetail {
    pub message: String,
    pub detail: String,
}

fn service_status(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::EmptyCart
        | ServiceError::InsufficientStock { .. }
        | ServiceError::InvalidQuantity(_)
        | ServiceError::OrderNotCancellable { .. }
        | ServiceError::InvalidStatusTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::ProductNotFound
        | ServiceError::CartItemNotFound
        | ServiceError::CouponNotFound
        | ServiceError::OrderNotFound => StatusCode::NOT_FOUND,
        ServiceError::CouponInvalid | ServiceError::CouponMinimumNotMet { .. } => StatusCode::BAD_REQUEST,
        ServiceError::OrderCreationFailed(_) | ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "The given data was invalid", "errors": errors })),
            )
                .into_response(),
            Self::Rejected { status, message } => (status, Json(json!({ "message": message }))).into_response(),
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated" }))).into_response()
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, Json(json!({ "message": "Forbidden" }))).into_response(),
            Self::Service(error) => {
                let status = service_status(&error);
                let message = error.to_string();
                let Some(detail) = error.storage_source().map(|source| {
                    error!(error = ?source, "{message}");
                    source.to_string()
                }) else {
                    return (status, Json(json!({ "message": message }))).into_response();
                };

                let message = match error {
                    ServiceError::OrderCreationFailed(_) => message,
                    _ => "Internal server error".to_string(),
                };
                let detail = InternalDetail { message: message.clone(), detail };
                let mut response = (status, Json(json!({ "message": message }))).into_response();
                response.extensions_mut().insert(detail);
                response
            }
        }
    }
}

/// Turns a handler panic into a JSON 500 for `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Internal server error" }))).into_response()
}

/// Middleware that rewrites 500 bodies to include the internal detail.
pub async fn expose_internal_detail(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if !state.debug {
        return response;
    }
    match response.extensions_mut().remove::<InternalDetail>() {
        Some(InternalDetail { message, detail }) => {
            (response.status(), Json(json!({ "message": message, "error": detail }))).into_response()
        }
        None => response,
    }
}
