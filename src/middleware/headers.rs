//! Response header middleware applied to every route.

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

/// Injects a unique `x-request-id` so operators can correlate a client's
/// failure with the server log line.
pub async fn request_id(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %req_id);
    let mut resp = next.run(req).instrument(span).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Security headers for every response. Gate responses in particular must
/// not be cached, since approval state changes between polls.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.remove(header::SERVER);

    resp
}
