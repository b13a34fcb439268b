//! The eight HTTP routes of the gateway's uniform REST surface.
//!
//! Each handler resolves its `(ms, resource, action)` triple, asks the
//! router whether the call is permitted and where it should go, builds a
//! [`BusEnvelope`], invokes the bus RPC client, and shapes the reply into
//! the HTTP response the route table specifies.

use axum::{
    extract::{Extension, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use gateway_core::prelude::*;
use tower_http::request_id::RequestId as TowerRequestId;

fn trace_id(request_id: &Extension<TowerRequestId>) -> String {
    request_id
        .0
        .header_value()
        .to_str()
        .unwrap_or_default()
        .to_string()
}

/// Shared dispatch: validate permission, resolve the queue and type tag,
/// build the envelope, and perform the RPC. Every route handler is a thin
/// wrapper that supplies `(action, id, data, is_custom_action)` and shapes
/// the successful reply.
async fn dispatch(
    state: &AppState,
    ms: &str,
    resource: &str,
    action: &str,
    id: Option<i64>,
    data: Option<String>,
    is_custom_action: bool,
) -> Result<Vec<u8>> {
    let router = Router::new(&state.routing);

    if !router.is_resource_allowed(ms, resource) {
        return Err(Error::Unauthorized(format!(
            "resource '{resource}' is not available on microservice '{ms}'"
        )));
    }

    if is_custom_action && !router.is_action_allowed(ms, resource, action) {
        return Err(Error::Unauthorized(format!(
            "action '{action}' is not permitted on resource '{resource}'"
        )));
    }

    let queue = router
        .resolve_queue(ms)
        .ok_or_else(|| Error::BadConfig("Unknown microservice.".to_string()))?
        .to_string();

    let type_tag = router
        .resolve_type(ms, resource)
        .ok_or_else(|| Error::NotFound(format!("resource '{resource}' not found on '{ms}'")))?
        .to_string();

    let mut envelope = BusEnvelope::new(type_tag, resource.to_string(), action.to_string());
    if let Some(id) = id {
        envelope = envelope.with_id(id);
    }
    if let Some(data) = data {
        envelope = envelope.with_data(data);
    }

    let payload = envelope
        .to_json()
        .map_err(|e| Error::Unexpected(format!("failed to encode envelope: {e}")))?;

    state
        .bus
        .call_with_timeout(&queue, payload, state.config.nats.timeout())
        .await
}

/// `GET /api/{ms}/{resource}` — `List`.
pub async fn list(
    State(state): State<AppState>,
    Path((ms, resource)): Path<(String, String)>,
    request_id: Extension<TowerRequestId>,
) -> Response {
    match dispatch(&state, &ms, &resource, "List", None, None, false).await {
        Ok(reply) => json_ok(reply),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `POST /api/{ms}/{resource}` — `Create`.
pub async fn create(
    State(state): State<AppState>,
    Path((ms, resource)): Path<(String, String)>,
    request_id: Extension<TowerRequestId>,
    body: String,
) -> Response {
    match dispatch(&state, &ms, &resource, "Create", None, Some(body), false).await {
        Ok(reply) => created(&ms, &resource, reply),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `GET /api/{ms}/{resource}/{id}` — `Get`.
pub async fn get(
    State(state): State<AppState>,
    Path((ms, resource, id)): Path<(String, String, i64)>,
    request_id: Extension<TowerRequestId>,
) -> Response {
    match dispatch(&state, &ms, &resource, "Get", None, Some(id.to_string()), false).await {
        Ok(reply) => json_ok(reply),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `PUT /api/{ms}/{resource}/{id}` — `Update`.
pub async fn update(
    State(state): State<AppState>,
    Path((ms, resource, id)): Path<(String, String, i64)>,
    request_id: Extension<TowerRequestId>,
    body: String,
) -> Response {
    match dispatch(&state, &ms, &resource, "Update", Some(id), Some(body), false).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `DELETE /api/{ms}/{resource}/{id}` — `Delete`.
pub async fn delete(
    State(state): State<AppState>,
    Path((ms, resource, id)): Path<(String, String, i64)>,
    request_id: Extension<TowerRequestId>,
) -> Response {
    match dispatch(&state, &ms, &resource, "Delete", None, Some(id.to_string()), false).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `POST /api/{ms}/{resource}/actions/{action}` — custom action, no id.
pub async fn custom_action(
    State(state): State<AppState>,
    Path((ms, resource, action)): Path<(String, String, String)>,
    request_id: Extension<TowerRequestId>,
    body: String,
) -> Response {
    match dispatch(&state, &ms, &resource, &action, None, Some(body), true).await {
        Ok(reply) => json_ok(reply),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `POST /api/{ms}/{resource}/{id}/actions/{action}` — custom action, with id.
pub async fn custom_action_with_id(
    State(state): State<AppState>,
    Path((ms, resource, id, action)): Path<(String, String, i64, String)>,
    request_id: Extension<TowerRequestId>,
    body: String,
) -> Response {
    match dispatch(&state, &ms, &resource, &action, Some(id), Some(body), true).await {
        Ok(reply) => json_ok(reply),
        Err(e) => e.into_response_with_trace_id_env(trace_id(&request_id), state.config.service.is_production()),
    }
}

/// `200 OK`, `application/json`, body forwarded byte-for-byte from the
/// backend reply — the gateway never re-parses it.
fn json_ok(reply: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        reply,
    )
        .into_response()
}

/// `201 Created` with a `Location` header pointing at the new resource; the
/// reply body is the backend-assigned id, forwarded verbatim.
fn created(ms: &str, resource: &str, reply: Vec<u8>) -> Response {
    let id = String::from_utf8_lossy(&reply).into_owned();
    let location = format!("/api/{ms}/{resource}/{id}");
    let mut response = (StatusCode::CREATED, reply).into_response();
    if let Ok(value) = header::HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::routing::model::{Action, Microservice, Resource, Scope};

    fn sample_state() -> RoutingConfig {
        RoutingConfig {
            microservices: vec![Microservice {
                id: "mainsite".to_string(),
                queue: "mainsite_queue".to_string(),
                scope: Scope::Private,
                resources: vec![Resource {
                    name: "Countries".to_string(),
                    type_tag: "DATA".to_string(),
                    scope: Some(Scope::Public),
                    actions: vec![Action {
                        name: "List".to_string(),
                        scope: Some(Scope::Public),
                    }],
                }],
            }],
        }
    }

    #[test]
    fn unknown_resource_produces_unauthorized_not_not_found() {
        let routing = sample_state();
        let router = Router::new(&routing);
        assert!(!router.is_resource_allowed("mainsite", "Nope"));
    }

    #[test]
    fn location_header_is_built_from_ms_resource_and_reply_id() {
        let response = created("mainsite", "Countries", b"42".to_vec());
        let location = response.headers().get(header::LOCATION).unwrap();
        assert_eq!(location, "/api/mainsite/Countries/42");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn json_ok_sets_content_type() {
        let response = json_ok(br#"[{"id":1}]"#.to_vec());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn delete_envelope_carries_data_only_no_id() {
        // Mirrors exactly how `delete()` builds its envelope: `data` set to
        // the decimal id, `id` left unset.
        let envelope = BusEnvelope::new("DATA", "Countries", "Delete").with_data("5".to_string());
        let json = String::from_utf8(envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"DATA","resource":"Countries","action":"Delete","data":"5"}"#
        );
    }
}
