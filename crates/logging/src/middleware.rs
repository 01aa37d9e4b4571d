//! Request logging for storefront-style axum services.
//!
//! Layer order matters: add [`request_log`] first and [`ensure_session_id`] after it,
//! so the session middleware runs outermost and the log sees fresh session ids.

use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TraceContextExt;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "shop_session-id";
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 48;
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

pub async fn request_log(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let session = request
        .extensions()
        .get::<SessionId>()
        .map(|s| s.0.clone())
        .or_else(|| cookie_value(request.headers(), SESSION_COOKIE))
        .unwrap_or_default();

    let span = tracing::info_span!(
        "http_request",
        http_req_path = %path,
        http_req_method = %method,
        http_req_id = %request_id,
    );
    let caller = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    if caller.span().span_context().is_valid() {
        span.set_parent(caller);
    }

    async move {
        tracing::debug!(
            http_req_path = %path,
            http_req_method = %method,
            http_req_id = %request_id,
            session = %session,
            "request {method} {path} started. requestID: {request_id}"
        );

        let start = Instant::now();
        let mut response = next.run(request).await;
        let took_ms = start.elapsed().as_millis() as u64;
        let status = response.status().as_u16();
        let bytes = response_bytes(&response);

        if status < 400 {
            tracing::debug!(
                http_req_path = %path,
                http_req_method = %method,
                http_req_id = %request_id,
                session = %session,
                http_resp_took_ms = took_ms,
                http_resp_status = status,
                http_resp_bytes = bytes,
                "request {method} {path} completed with status: {status}. requestID: {request_id}"
            );
        } else {
            tracing::error!(
                http_req_path = %path,
                http_req_method = %method,
                http_req_id = %request_id,
                session = %session,
                http_resp_took_ms = took_ms,
                http_resp_status = status,
                http_resp_bytes = bytes,
                "request {method} {path} failed with status: {status}. requestID: {request_id}"
            );
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

pub async fn ensure_session_id(mut request: Request, next: Next) -> Response {
    let (session_id, fresh) = match cookie_value(request.headers(), SESSION_COOKIE) {
        Some(existing) => (existing, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    request
        .extensions_mut()
        .insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;
    if fresh {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Max-Age={SESSION_MAX_AGE_SECS}");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Body size when known up front, else the declared `content-length`, else 0.
fn response_bytes(response: &Response) -> u64 {
    response
        .body()
        .size_hint()
        .exact()
        .or_else(|| {
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(0)
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
