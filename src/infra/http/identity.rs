//! Caller identity for the like and comment routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::entities::UserId;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The signed-in user. Sessions are resolved by the gateway in front of this
/// service, which forwards the numeric user id in `x-user-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(ApiError::unauthenticated)?;

        raw.parse::<UserId>()
            .ok()
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or_else(ApiError::unauthenticated)
    }
}
