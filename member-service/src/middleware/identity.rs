//! Session identity extraction.
//!
//! The upstream identity provider forwards the opaque session token as a
//! bearer credential and the subject it was issued for in `x-subject-id`.
//! Only the token's presence is interpreted here.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Identity, ProfileRecord, SessionToken};
use crate::services::BootstrapOutcome;
use crate::AppState;

pub const SUBJECT_HEADER: &str = "x-subject-id";

/// Optional session. `None` is the anonymous fast path.
#[derive(Debug, Clone)]
pub struct SessionIdentity(pub Option<Identity>);

pub fn identity_from_headers(headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|value| SessionToken::new(value));

    let Some(token) = token else {
        return Ok(None);
    };

    let subject_id = headers
        .get(SUBJECT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!(
                "Session token present without a valid {} header",
                SUBJECT_HEADER
            ))
        })?;

    Ok(Some(Identity::new(token, subject_id)))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers).map(SessionIdentity)
    }
}

/// The caller's bootstrapped profile. Rejects anonymous callers with 401 and
/// callers whose profile could not be loaded in time with 503.
#[derive(Debug, Clone)]
pub struct ResolvedMember(pub ProfileRecord);

#[axum::async_trait]
impl FromRequestParts<AppState> for ResolvedMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionIdentity(identity) = SessionIdentity::from_request_parts(parts, state).await?;

        match state.bootstrapper.bootstrap(identity.as_ref()).await {
            BootstrapOutcome::Resolved(profile) => Ok(ResolvedMember(profile)),
            BootstrapOutcome::Unauthenticated => Err(AppError::Unauthorized(anyhow::anyhow!(
                "Missing or invalid Authorization header"
            ))),
            BootstrapOutcome::Unresolved => Err(AppError::ServiceUnavailable(
                "Profile could not be loaded; retry shortly".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn no_token_is_anonymous() {
        let headers = HeaderMap::new();
        assert!(identity_from_headers(&headers).unwrap().is_none());
    }

    #[test]
    fn blank_bearer_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(identity_from_headers(&headers).unwrap().is_none());
    }

    #[test]
    fn token_without_subject_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let err = identity_from_headers(&headers).unwrap_err();
        assert_eq!(err.code(), "unauthorized");

        headers.insert(SUBJECT_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(identity_from_headers(&headers).is_err());
    }

    #[test]
    fn token_with_subject_is_an_identity() {
        let subject = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            SUBJECT_HEADER,
            HeaderValue::from_str(&subject.to_string()).unwrap(),
        );

        let identity = identity_from_headers(&headers).unwrap().unwrap();
        assert_eq!(identity.subject_id, subject);
        assert_eq!(identity.token.expose(), "abc");
    }
}
