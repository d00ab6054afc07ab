//! Request identity extracted from headers.
//!
//! There is no login flow: callers identify themselves with `X-User-Id` and
//! pick a tenant with `X-Organization-Id`. Absent headers resolve to the nil
//! UUID, which the migrations seed as the default organization.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Caller identity for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl RequestContext {
    /// Resolve identity from request headers.
    ///
    /// # Errors
    ///
    /// Returns a 400 `ApiError` when a header is present but not a UUID.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        Ok(Self {
            user_id: header_uuid(headers, USER_HEADER)?,
            organization_id: header_uuid(headers, ORGANIZATION_HEADER)?,
        })
    }
}

fn header_uuid(headers: &HeaderMap, name: &'static str) -> Result<Uuid, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(Uuid::nil());
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::bad_request(format!("{name} header is not valid text")))?
        .trim();
    if raw.is_empty() {
        return Ok(Uuid::nil());
    }
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("{name} header must be a UUID")))
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn missing_headers_resolve_to_nil() {
        let ctx = RequestContext::from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(ctx.user_id, Uuid::nil());
        assert_eq!(ctx.organization_id, Uuid::nil());
    }

    #[test]
    fn valid_headers_are_parsed() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_str(&user.to_string()).unwrap());
        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_str(&format!(" {org} ")).unwrap());
        let ctx = RequestContext::from_headers(&headers).unwrap();
        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.organization_id, org);
    }

    #[test]
    fn malformed_header_is_bad_request() {
        let mut headers = HeaderMap::new();
        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_static("acme"));
        let err = RequestContext::from_headers(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains(ORGANIZATION_HEADER));
    }

    #[test]
    fn blank_header_resolves_to_nil() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static(""));
        let ctx = RequestContext::from_headers(&headers).unwrap();
        assert_eq!(ctx.user_id, Uuid::nil());
    }
}
