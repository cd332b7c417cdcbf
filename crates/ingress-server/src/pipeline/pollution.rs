//! Parameter pollution guard
//!
//! Normalizes duplicate query parameter names before routing: the last
//! occurrence of a name wins and the query string is rewritten, so route
//! logic never observes a polluted parameter list.

use axum::{
    extract::Request,
    http::{uri::Uri, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Middleware rewriting polluted query strings
pub async fn dedupe_query_params(mut req: Request, next: Next) -> Response {
    let Some(query) = req.uri().query().map(str::to_owned) else {
        return next.run(req).await;
    };

    let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(&query) else {
        tracing::debug!(query = %query, "Unparseable query string rejected");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let deduped = keep_last(pairs);

    if let Some(normalized) = serde_urlencoded::to_string(&deduped).ok().filter(|q| q != &query) {
        match rewrite_query(req.uri(), &normalized) {
            Some(uri) => {
                tracing::debug!(original = %query, normalized = %normalized, "Query parameters deduplicated");
                *req.uri_mut() = uri;
            }
            None => {
                tracing::debug!(query = %query, "Failed to rewrite polluted query");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    }

    next.run(req).await
}

/// Keep the last value for each name, preserving first-seen name order
fn keep_last(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut deduped: Vec<(String, String)> = Vec::with_capacity(pairs.len());

    for (name, value) in pairs {
        match deduped.iter_mut().find(|(seen, _)| *seen == name) {
            Some(entry) => entry.1 = value,
            None => deduped.push((name, value)),
        }
    }

    deduped
}

fn rewrite_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path = uri.path();
    let path_and_query = if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
