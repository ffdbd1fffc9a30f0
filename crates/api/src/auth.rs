//! Caller identity resolution.
//!
//! Session issuance and JWT validation live in the upstream gateway; by
//! the time a request reaches this service the gateway has installed the
//! resolved principal as trusted headers. The extractors here turn those
//! headers into an explicit [`Identity`] value that is passed through
//! every manager call (no ambient security context).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Identity, UserId};
use domain::OrderError;

use crate::error::ApiError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_EMAIL_HEADER: &str = "x-user-email";
const USER_ROLE_HEADER: &str = "x-user-role";

/// An authenticated caller, admin or not.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub Identity);

/// An authenticated caller that must hold the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

fn resolve_identity(parts: &Parts) -> Result<Identity, ApiError> {
    let header = |name: &str| -> Result<&str, ApiError> {
        parts
            .headers
            .get(name)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("malformed {name} header")))
    };

    let user_id: i64 = header(USER_ID_HEADER)?
        .parse()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;
    let email = header(USER_EMAIL_HEADER)?.to_string();
    let is_admin = parts
        .headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

    Ok(Identity {
        user_id: UserId::new(user_id),
        email,
        is_admin,
    })
}

impl<S: Send + Sync> FromRequestParts<S> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_identity(parts).map(AuthedUser)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = resolve_identity(parts)?;
        if !identity.is_admin {
            return Err(ApiError::Order(OrderError::Forbidden));
        }
        Ok(AdminUser(identity))
    }
}
