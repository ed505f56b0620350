//! Middleware for request correlation and response hardening

use crate::api_handler::RequestId;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID propagation
///
/// Reuses an incoming `x-trace-id` / `x-request-id` or generates one, makes it
/// available to handlers as [`RequestId`] and echoes it on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = extract_or_generate_request_id(request.headers());
    debug!("Processing request: {}", id);

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;

    match HeaderValue::from_str(&id) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        Err(_) => warn!("Request id is not a valid header value"),
    }

    if response.status().is_client_error() {
        debug!("Client error for request {}: {}", id, response.status());
    }

    response
}

fn extract_or_generate_request_id(headers: &HeaderMap) -> String {
    ["x-trace-id", REQUEST_ID_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Security headers middleware
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "x-api-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );

    response
}
