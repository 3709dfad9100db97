//! Bearer token extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use super::error::ApiError;
use crate::auth::authenticate;
use crate::domain::aggregates::User;
use crate::state::AppState;

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// An authenticated user with the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        match authenticate(state.db.as_ref(), token).await? {
            Some(user) => Ok(Self(user)),
            None => {
                debug!("unknown bearer token");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}
