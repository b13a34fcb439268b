//! Aggregated health probe.
//!
//! Fans a health-check envelope out to every configured microservice in
//! parallel, folds the per-microservice outcomes into one overall status,
//! and shapes the result as `{status, checks: [...]}` for the gateway's
//! own `/api/health` endpoint.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{envelope::BusEnvelope, routing::router::Router, state::AppState};

/// Per-probe deadline; a microservice that misses this is reported
/// `Unhealthy` rather than hanging the aggregate response.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

/// One microservice's probe outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroserviceHealth {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The shape a backend microservice is expected to reply with for an
/// `INFRA/Health/Check` envelope. Anything that doesn't parse this way is
/// treated as `Unhealthy` with the raw reply preserved as diagnostic data.
#[derive(Debug, Deserialize)]
struct BackendHealthReply {
    status: Status,
    #[serde(default, flatten)]
    details: std::collections::HashMap<String, Value>,
}

/// The aggregated result: healthy only when every microservice responded
/// healthy within its deadline. A `Degraded` component still counts as
/// overall `Unhealthy` — only unanimous `Healthy` yields a healthy whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: Status,
    pub checks: Vec<MicroserviceHealth>,
}

impl HealthReport {
    fn status_code(&self) -> StatusCode {
        match self.status {
            Status::Healthy | Status::Degraded => StatusCode::OK,
            Status::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Probe every configured microservice concurrently and fold the results.
/// Never fails the HTTP response: an individual probe's broker error or
/// timeout is reported as that microservice's `Unhealthy`, not propagated
/// as a `500`.
pub async fn health_probe(state: &AppState) -> HealthReport {
    let router = Router::new(&state.routing);
    let microservice_ids: Vec<String> = router.list_microservices().map(str::to_string).collect();

    let checks = join_all(microservice_ids.into_iter().map(|id| {
        let state = state.clone();
        async move { probe_one(&state, &id).await }
    }))
    .await;

    // Overall is Healthy iff every component is Healthy; a Degraded or
    // Unhealthy component each flip the whole response to Unhealthy,
    // regardless of which one it was.
    let status = if checks.iter().all(|c| c.status == Status::Healthy) {
        Status::Healthy
    } else {
        Status::Unhealthy
    };

    HealthReport { status, checks }
}

async fn probe_one(state: &AppState, microservice_id: &str) -> MicroserviceHealth {
    let router = Router::new(&state.routing);
    let Some(queue) = router.resolve_queue(microservice_id) else {
        return MicroserviceHealth {
            name: microservice_id.to_string(),
            status: Status::Unhealthy,
            data: Some(Value::String("microservice has no configured queue".to_string())),
        };
    };

    let envelope = BusEnvelope::new("INFRA", "Health", "Check");
    let Ok(payload) = envelope.to_json() else {
        return MicroserviceHealth {
            name: microservice_id.to_string(),
            status: Status::Unhealthy,
            data: Some(Value::String("failed to encode health probe envelope".to_string())),
        };
    };

    match state.bus.call_with_timeout(queue, payload, PROBE_TIMEOUT).await {
        Ok(reply) => parse_backend_reply(microservice_id, &reply),
        Err(e) => MicroserviceHealth {
            name: microservice_id.to_string(),
            status: Status::Unhealthy,
            data: Some(Value::String(e.to_string())),
        },
    }
}

/// Parse a backend's raw reply bytes as a [`BackendHealthReply`]. A reply
/// that doesn't deserialize is itself a sign of an unhealthy backend, not a
/// gateway error, so it is folded into `Unhealthy` rather than surfaced as a
/// `500`.
fn parse_backend_reply(microservice_id: &str, reply: &[u8]) -> MicroserviceHealth {
    match serde_json::from_slice::<BackendHealthReply>(reply) {
        Ok(parsed) => MicroserviceHealth {
            name: microservice_id.to_string(),
            status: parsed.status,
            data: (!parsed.details.is_empty())
                .then(|| serde_json::to_value(parsed.details).unwrap_or(Value::Null)),
        },
        Err(_) => MicroserviceHealth {
            name: microservice_id.to_string(),
            status: Status::Unhealthy,
            data: String::from_utf8(reply.to_vec()).ok().map(Value::String),
        },
    }
}

/// Axum handler for `/api/health`: `200` iff every microservice is healthy,
/// `503` otherwise.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = health_probe(&state).await;
    let status = report.status_code();
    (status, Json(report))
}
