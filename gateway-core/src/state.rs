//! Shared application state handed to every request via axum's `State`
//! extractor.

use std::sync::Arc;

use crate::auth::oidc::OidcValidator;
use crate::bus::BusRpcClient;
use crate::config::Config;
use crate::routing::model::RoutingConfig;

/// Everything a handler or middleware layer needs, cloned cheaply per
/// request (every field is an `Arc` or already `Clone`-cheap).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub routing: Arc<RoutingConfig>,
    pub bus: BusRpcClient,
    pub oidc: Arc<OidcValidator>,
}

impl AppState {
    pub fn new(config: Config, bus: BusRpcClient) -> Self {
        let routing = Arc::new(config.routing.clone());
        let oidc = Arc::new(OidcValidator::new(config.oidc.clone()));
        Self {
            config: Arc::new(config),
            routing,
            bus,
            oidc,
        }
    }
}
