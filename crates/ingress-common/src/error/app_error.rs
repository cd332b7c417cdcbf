//! Gateway error types
//!
//! Unified error taxonomy for the whole ingress layer. Every error that can
//! reach a client is representable as a [`GatewayError`]; anything foreign
//! is wrapped into `Internal` before serialization.

use serde::Serialize;
use std::fmt;

/// Gateway-wide error type
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // Startup errors (fatal, never served to clients)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store connection failed: {0}")]
    StoreConnection(String),

    // Session errors
    #[error("Invalid session credential")]
    SessionInvalid,

    #[error("Session expired")]
    SessionExpired,

    // Client request errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request payload too large")]
    PayloadTooLarge,

    #[error("Origin not allowed")]
    OriginDenied,

    #[error("{0} not found")]
    NotFound(String),

    // Domain errors raised by collaborator route logic, already shaped
    #[error("{message}")]
    Domain { status: u16, message: String },

    // Infrastructure errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Broker error: {0}")]
    Broker(String),

    // Anything unclassified
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl GatewayError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::Validation(_) => 400,

            // 401 Unauthorized
            Self::SessionInvalid | Self::SessionExpired => 401,

            // 403 Forbidden
            Self::OriginDenied => 403,

            // 404 Not Found
            Self::NotFound(_) => 404,

            // 413 Payload Too Large
            Self::PayloadTooLarge => 413,

            // Declared by the collaborator that raised it
            Self::Domain { status, .. } => *status,

            // 500 Internal Server Error
            Self::Config(_)
            | Self::StoreConnection(_)
            | Self::Store(_)
            | Self::Broker(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::StoreConnection(_) => "STORE_CONNECTION_ERROR",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::OriginDenied => "ORIGIN_DENIED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Domain { .. } => "DOMAIN_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Broker(_) => "BROKER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        let status = self.status_code();
        (400..500).contains(&status)
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        let status = self.status_code();
        (500..600).contains(&status)
    }

    /// Create a not-found error carrying the unmatched path
    #[must_use]
    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::NotFound(path.to_string())
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create a domain error with a declared status code
    #[must_use]
    pub fn domain(status: u16, message: impl Into<String>) -> Self {
        Self::Domain {
            status,
            message: message.into(),
        }
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Error response body served to clients
///
/// The top-level `message` is the contract; `code` and `details` are
/// error-specific fields. Internal causes never appear here, only in logs.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        Self {
            message: err.to_string(),
            code: err.error_code().to_string(),
            details: None,
        }
    }
}

impl From<GatewayError> for ErrorResponse {
    fn from(err: GatewayError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::SessionInvalid.status_code(), 401);
        assert_eq!(GatewayError::OriginDenied.status_code(), 403);
        assert_eq!(GatewayError::not_found("/nope").status_code(), 404);
        assert_eq!(GatewayError::PayloadTooLarge.status_code(), 413);
        assert_eq!(GatewayError::validation("bad").status_code(), 400);
        assert_eq!(GatewayError::Store("down".to_string()).status_code(), 500);
    }

    #[test]
    fn test_domain_error_keeps_declared_status() {
        let err = GatewayError::domain(409, "name taken");
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "name taken");
    }

    #[test]
    fn test_not_found_message_carries_path() {
        let err = GatewayError::not_found("/nope");
        assert_eq!(err.to_string(), "/nope not found");
    }

    #[test]
    fn test_is_client_error() {
        assert!(GatewayError::SessionExpired.is_client_error());
        assert!(GatewayError::not_found("/x").is_client_error());
        assert!(!GatewayError::Broker("down".to_string()).is_client_error());
    }

    #[test]
    fn test_is_server_error() {
        assert!(GatewayError::internal(anyhow::anyhow!("boom")).is_server_error());
        assert!(!GatewayError::PayloadTooLarge.is_server_error());
    }

    #[test]
    fn test_error_response_shape() {
        let err = GatewayError::not_found("/nope");
        let response = ErrorResponse::from(&err);

        assert_eq!(response.message, "/nope not found");
        assert_eq!(response.code, "NOT_FOUND");
        assert!(response.details.is_none());
    }

    #[test]
    fn test_internal_error_hides_cause_in_response() {
        let err = GatewayError::internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        let response = ErrorResponse::from(&err);

        assert_eq!(response.message, "Internal server error");
        assert!(!response.message.contains("10.0.0.3"));
    }
}
