//! Per-request authorization filter. Resolves the route's effective
//! scope and, for private routes, validates the bearer token before the
//! handler body runs.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_http::request_id::RequestId as TowerRequestId;

use crate::error::Error;
use crate::routing::{parts, router::Router};
use crate::state::AppState;

/// Axum middleware function: reads `(ms, resource, action?)` from the
/// request path, asks the router whether the route is public, and if not,
/// requires and validates an `Authorization: Bearer <token>` header.
///
/// On success the validated [`crate::auth::oidc::Principal`] is inserted
/// into the request extensions for downstream handlers. On failure responds
/// `401 Unauthorized` and does not invoke the handler — both the missing-token
/// and the invalid-token paths go through [`Error::Unauthenticated`] so the
/// two failures share the same (bodyless) response shape and the same
/// `Trace-Id` attachment as every other error the gateway returns.
pub async fn auth_filter(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(route) = parts::parse(request.uri().path(), request.method()) else {
        // Not one of the recognized route shapes; let the handler (or the
        // router's own 404) deal with it.
        return next.run(request).await;
    };

    let router = Router::new(&state.routing);
    let is_public = router.is_public(
        &route.microservice,
        &route.resource,
        Some(route.effective_action.as_str()),
    );

    if is_public {
        return next.run(request).await;
    }

    let trace_id = trace_id(&request);

    let Some(token) = extract_bearer_token(&request) else {
        return unauthenticated(&state, trace_id);
    };

    match state.oidc.validate(token).await {
        Ok(mut principal) => {
            crate::auth::claims::flatten_claims(&mut principal.claims.extra, &mut principal.claims.roles);
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(_) => unauthenticated(&state, trace_id),
    }
}

fn unauthenticated(state: &AppState, trace_id: String) -> Response {
    Error::Unauthenticated
        .into_response_with_trace_id_env(trace_id, state.config.service.is_production())
}

fn trace_id(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<TowerRequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request.headers_mut().insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer_token(&request), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_header_yields_none() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_bearer_token(&request), None);
    }

    #[test]
    fn non_bearer_scheme_yields_none() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request.headers_mut().insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(extract_bearer_token(&request), None);
    }

    #[test]
    fn trace_id_reads_the_set_request_id_extension() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(TowerRequestId::new(HeaderValue::from_static("req_test")));
        assert_eq!(trace_id(&request), "req_test");
    }

    #[test]
    fn trace_id_is_empty_without_a_request_id_extension() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(trace_id(&request), "");
    }
}
