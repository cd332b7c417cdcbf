//! Response shaping and the error boundary
//!
//! The failure serializer: every error that reaches the boundary is logged
//! and converted into the uniform `{ message, code }` body with the status
//! code the error declares. Unclassified failures become a generic 500
//! rather than passing through without a terminal response.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use ingress_common::{ErrorResponse, GatewayError};
use serde::Serialize;

/// API error type carried out of handlers and middleware
///
/// Wraps the gateway taxonomy so the boundary is the single point of
/// response shaping and logging for cross-cutting failures.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Every intercepted error is logged before the response decision.
        // Internal detail stays here; the body never carries it.
        if err.is_server_error() {
            tracing::error!(error = ?err, code = err.error_code(), "Request failed");
        } else {
            tracing::debug!(error = %err, code = err.error_code(), "Request rejected");
        }

        let body = ErrorResponse::from(&err);
        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;

/// Catch-all for requests matching no registered route
///
/// The response body carries the unmatched path.
pub async fn not_found(uri: Uri) -> ApiError {
    GatewayError::not_found(uri.path()).into()
}

/// Wrapper for successful JSON responses
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = ApiError::from(GatewayError::not_found("/nope")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(GatewayError::PayloadTooLarge).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_domain_error_uses_declared_status() {
        let response = ApiError::from(GatewayError::domain(409, "name taken")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unclassified_error_becomes_500() {
        let err = GatewayError::internal(anyhow::anyhow!("socket closed unexpectedly"));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
