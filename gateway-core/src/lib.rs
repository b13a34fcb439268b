//! # gateway-core
//!
//! Routing policy, broker RPC client, and OpenID Connect authentication for
//! an API gateway that fronts backend microservices speaking only to a
//! message broker, never HTTP.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gateway_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let routing = Arc::new(config.routing.clone());
//!     validate(&routing).map_err(|errs| Error::BadConfig(errs.join("\n")))?;
//!
//!     let bus = BusRpcClient::connect(&config.nats).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod bus;
pub mod config;
pub mod envelope;
pub mod error;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod routing;
pub mod server;
pub mod state;
pub mod tls;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::claims::flatten_claims;
    pub use crate::auth::oidc::{OidcValidator, Principal};
    pub use crate::bus::client::BusRpcClient;
    pub use crate::config::Config;
    pub use crate::envelope::BusEnvelope;
    pub use crate::error::{Error, Result};
    pub use crate::health::{health_handler, health_probe, HealthReport, MicroserviceHealth, Status};
    pub use crate::ids::{MakeTypedRequestId, RequestId, RequestIdError};
    pub use crate::middleware::auth_filter::auth_filter;
    pub use crate::middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
        PROPAGATE_HEADERS, SENSITIVE_HEADERS, TRACE_ID_HEADER,
    };
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::routing::model::{Action, Microservice, Resource, RoutingConfig, Scope};
    pub use crate::routing::router::Router;
    pub use crate::routing::validator::validate;
    pub use crate::server::Server;
    pub use crate::state::AppState;

    pub use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{delete, get, post, put},
        Router as AxumRouter,
    };

    pub use serde::{Deserialize, Serialize};

    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use tokio;

    pub use std::sync::Arc;
}
