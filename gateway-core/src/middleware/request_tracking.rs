//! Request tracking middleware: per-request `Trace-Id` generation and
//! propagation, plus sensitive-header masking in logs.

use axum::http::HeaderName;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::ids::MakeTypedRequestId;

/// The response header carrying the per-request trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Headers propagated to upstream calls and carried through logging spans.
pub const PROPAGATE_HEADERS: &[&str] = &[
    TRACE_ID_HEADER,
    "x-forwarded-for",
    "x-forwarded-proto",
];

/// Headers masked when logging request/response metadata.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

fn trace_id_header_name() -> HeaderName {
    HeaderName::from_static(TRACE_ID_HEADER)
}

/// A request-id layer that stamps every request with a TypeID-style,
/// time-sortable `Trace-Id` (`req_` prefix, UUIDv7).
pub fn request_id_layer() -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::new(trace_id_header_name(), MakeTypedRequestId)
}

/// Propagate the `Trace-Id` header from request to response.
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(trace_id_header_name())
}

/// Mask sensitive headers before they reach tracing spans.
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .map(|h| h.parse().expect("valid header name"))
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}
