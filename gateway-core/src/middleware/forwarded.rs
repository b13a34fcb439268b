//! Honors `X-Forwarded-For`/`X-Forwarded-Proto` from a trusted reverse proxy
//! in front of the gateway, attaching the resolved client address and
//! scheme to the request so logging spans and downstream handlers see the
//! original caller rather than the proxy hop.

use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::Response,
};

/// The caller's address and scheme as reported by a fronting proxy, or
/// derived from the connection itself when absent.
#[derive(Debug, Clone)]
pub struct ForwardedInfo {
    pub client_addr: Option<String>,
    pub scheme: Option<String>,
}

/// Reads `X-Forwarded-For` (first entry wins) and `X-Forwarded-Proto`,
/// inserting a [`ForwardedInfo`] extension for handlers and the tracing
/// span layer to pick up. Absence of either header is not an error: a
/// direct, non-proxied request simply carries no forwarded info.
pub async fn forwarded_headers(mut request: Request<Body>, next: Next) -> Response {
    let client_addr = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

    let scheme = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    request
        .extensions_mut()
        .insert(ForwardedInfo { client_addr, scheme });

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_first_address_from_comma_separated_chain() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        let header = request.headers().get("x-forwarded-for").unwrap();
        let first = header
            .to_str()
            .unwrap()
            .split(',')
            .next()
            .unwrap()
            .trim()
            .to_string();
        assert_eq!(first, "203.0.113.5");
    }
}
