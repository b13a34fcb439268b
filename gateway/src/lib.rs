//! Route registration for the gateway binary, split out from `main.rs` so
//! integration tests can drive the real router with `tower::ServiceExt`
//! without going through a bound TCP listener.

pub mod handlers;

use gateway_core::prelude::*;

/// Registers the gateway's eight-route REST surface plus `/api/health`,
/// layers the authorization filter over every `/api/*` route, and attaches
/// shared state.
pub fn build_router(state: AppState) -> AxumRouter {
    let api = AxumRouter::new()
        .route(
            "/{ms}/{resource}",
            get(handlers::list).post(handlers::create),
        )
        .route(
            "/{ms}/{resource}/{id}",
            get(handlers::get).put(handlers::update).delete(handlers::delete),
        )
        .route(
            "/{ms}/{resource}/actions/{action}",
            post(handlers::custom_action),
        )
        .route(
            "/{ms}/{resource}/{id}/actions/{action}",
            post(handlers::custom_action_with_id),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_filter));

    AxumRouter::new()
        .route("/api/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
}
