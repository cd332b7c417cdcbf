//! Ingress pipeline
//!
//! The fixed, ordered chain of stages applied to every inbound request
//! before it reaches route logic. The order is a correctness requirement:
//! session/security/origin stages run before any route can observe the
//! request, and the body-size ceiling applies before a route can read a
//! body. [`apply_pipeline`] is the single place that fixes the order.

mod pollution;
mod session;

pub use pollution::dedupe_query_params;
pub use session::{decode_session, issue_session_cookie, SessionHandle};

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use ingress_common::{AppConfig, Environment, SessionCodec};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fixed request body size ceiling (50 MB)
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Request timeout before answering 503
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared by the pipeline stages
///
/// Deliberately smaller than the application state so the pipeline can be
/// assembled (and tested) without live store or broker connections.
#[derive(Clone)]
pub struct PipelineContext {
    /// Session credential codec (primary + secondary key)
    pub codec: Arc<SessionCodec>,
    /// Runtime environment tag
    pub environment: Environment,
    /// The single origin allowed to issue credentialed requests
    pub client_origin: String,
}

impl PipelineContext {
    /// Build the pipeline context from validated configuration
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            codec: Arc::new(SessionCodec::new(
                &config.session.primary_key,
                &config.session.secondary_key,
            )),
            environment: config.environment(),
            client_origin: config.cors.client_origin.clone(),
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("environment", &self.environment)
            .field("client_origin", &self.client_origin)
            .finish_non_exhaustive()
    }
}

/// Apply the ingress pipeline to a router
///
/// Layers run top-down for requests in the reverse of the order they are
/// added here, so reading bottom-up below gives the request-side order:
/// request id -> trace -> timeout -> session codec -> pollution guard ->
/// security headers -> CORS -> compression -> body ceiling -> routes.
pub fn apply_pipeline<S>(router: Router<S>, ctx: &PipelineContext) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = router
        // Stage 6: body decoding ceiling - oversized bodies answer 413
        // before any route handler runs
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        // Stage 5: transparent response compression
        .layer(CompressionLayer::new())
        // Stage 4: cross-origin policy
        .layer(cors_layer(&ctx.client_origin));

    // Stage 3: security hardening header set
    let router = apply_security_headers(router);

    router
        // Stage 2: parameter pollution guard
        .layer(from_fn(dedupe_query_params))
        // Stage 1: session codec
        .layer(from_fn_with_state(ctx.clone(), decode_session))
        // Ambient: timeout (returns 503 Service Unavailable on timeout)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            REQUEST_TIMEOUT,
        ))
        // Ambient: tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Ambient: request ID propagation and generation
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
}

/// Create the CORS layer restricted to the configured client origin
///
/// Credentialed requests are allowed from that origin only; the method set
/// is fixed. An unparseable origin value closes the door entirely.
fn cors_layer(client_origin: &str) -> CorsLayer {
    let origin = match client_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(origin = %client_origin, "Invalid client origin; cross-origin requests will be blocked");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Apply the standard hardening header set to every response
fn apply_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-dns-prefetch-control"),
            HeaderValue::from_static("off"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::not_found;
    use axum::body::{to_bytes, Bytes};
    use axum::extract::RawQuery;
    use axum::routing::{get, post};
    use ingress_common::SESSION_COOKIE_NAME;
    use tower::ServiceExt;

    fn test_context() -> PipelineContext {
        PipelineContext {
            codec: Arc::new(SessionCodec::new("current-key", "previous-key")),
            environment: Environment::Local,
            client_origin: "http://localhost:3000".to_string(),
        }
    }

    fn test_app() -> Router {
        let router = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route("/echo", get(|RawQuery(q): RawQuery| async move { q.unwrap_or_default() }))
            .route(
                "/whoami",
                get(|session: SessionHandle| async move {
                    session
                        .claims()
                        .map_or("anonymous".to_string(), |c| c.data.to_string())
                }),
            )
            .route(
                "/upload",
                post(|body: Bytes| async move { body.len().to_string() }),
            )
            .fallback(not_found);

        apply_pipeline(router, &test_context())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_path_answers_404_with_path_in_body() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], "/nope not found");
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_duplicate_query_params_keep_last() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/echo?a=1&a=2&b=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"a=2&b=3");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_before_route() {
        let oversized = vec![0u8; MAX_BODY_BYTES + 1024];

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, "application/octet-stream")
                    .body(Body::from(oversized))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_under_ceiling_reaches_route() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, "application/octet-stream")
                    .body(Body::from(vec![0u8; 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"1024");
    }

    #[tokio::test]
    async fn test_preflight_from_configured_origin_allowed() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_preflight_from_other_origin_denied() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header(header::ORIGIN, "https://evil.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_valid_session_cookie_decoded_before_route() {
        let ctx = test_context();
        let token = ctx.codec.issue(serde_json::json!({"user": "42"})).unwrap();

        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"user":"42"}"#);
    }

    #[tokio::test]
    async fn test_tampered_session_cookie_yields_no_session() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}=garbage"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"anonymous");
    }

    #[tokio::test]
    async fn test_session_signed_with_rotated_out_key_accepted() {
        // Issued before rotation: signed with what is now the secondary key
        let old_codec = SessionCodec::new("previous-key", "unused");
        let token = old_codec.issue(serde_json::json!({"user": "7"})).unwrap();

        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"user":"7"}"#);
    }
}
