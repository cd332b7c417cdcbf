//! Session codec stage
//!
//! Decodes the signed `session` cookie before routing so that route logic
//! and the error boundary observe an already-verified credential. Issuing
//! builds a cookie whose secure flag is relaxed only for an explicitly
//! local environment.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ingress_common::{
    Environment, GatewayError, SessionClaims, SessionCodec, SESSION_COOKIE_NAME,
    SESSION_MAX_AGE_SECS,
};
use std::convert::Infallible;

use super::PipelineContext;

/// Decoded session state attached to every request
///
/// `None` means no credential, an unverifiable one, or an expired one; in
/// all three cases the client must re-establish the session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(pub Option<SessionClaims>);

impl SessionHandle {
    #[must_use]
    pub fn claims(&self) -> Option<&SessionClaims> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionHandle {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Middleware decoding the session cookie into request extensions
pub async fn decode_session(
    State(ctx): State<PipelineContext>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| match ctx.codec.verify(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "Session cookie rejected");
                None
            }
        });

    req.extensions_mut().insert(SessionHandle(claims));
    next.run(req).await
}

/// Build a `session` cookie carrying a freshly issued credential
///
/// # Errors
/// Returns an error if the credential cannot be encoded.
pub fn issue_session_cookie(
    codec: &SessionCodec,
    environment: Environment,
    data: serde_json::Value,
) -> Result<Cookie<'static>, GatewayError> {
    let token = codec.issue(data)?;

    Ok(Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(!environment.is_local())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE_SECS))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> SessionCodec {
        SessionCodec::new("current-key", "previous-key")
    }

    #[test]
    fn test_issued_cookie_attributes() {
        let cookie = issue_session_cookie(&codec(), Environment::Production, json!({})).unwrap();

        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(SESSION_MAX_AGE_SECS))
        );
    }

    #[test]
    fn test_local_environment_relaxes_secure_flag() {
        let cookie = issue_session_cookie(&codec(), Environment::Local, json!({})).unwrap();
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn test_issued_cookie_verifies() {
        let codec = codec();
        let cookie =
            issue_session_cookie(&codec, Environment::Local, json!({"user": "42"})).unwrap();

        let claims = codec.verify(cookie.value()).unwrap();
        assert_eq!(claims.data, json!({"user": "42"}));
    }
}
