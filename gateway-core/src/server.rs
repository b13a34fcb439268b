//! Dual HTTP/HTTPS server with graceful shutdown.

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Request body size ceiling; no configuration knob exposes this today.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

use crate::{
    config::Config,
    error::Result,
    middleware::{forwarded_headers, request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
    tls::{load_server_config, TlsListener},
};

/// Owns the configuration and assembles the shared middleware stack around
/// whatever router the binary builds, then serves it on both listeners.
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the plain HTTP listener on `service.http_port`, and, if
    /// `tls` is configured, the TLS listener on `service.https_port`.
    /// Both listeners share the same router and the same graceful
    /// shutdown signal; the method returns once both have stopped.
    pub async fn serve(self, app: Router) -> Result<()> {
        let app = self.wrap_middleware(app);

        let http_addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.http_port));
        let http_listener = TcpListener::bind(&http_addr).await?;
        tracing::info!("{} listening on {} (http)", self.config.service.name, http_addr);

        let http_app = app.clone();
        let http_task = tokio::spawn(async move {
            axum::serve(http_listener, http_app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });

        let https_task = match &self.config.tls {
            Some(tls_config) => {
                let server_config = load_server_config(tls_config)?;
                let https_addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.https_port));
                let tcp = TcpListener::bind(&https_addr).await?;
                let listener = TlsListener::new(tcp, server_config);
                tracing::info!("{} listening on {} (https)", self.config.service.name, https_addr);

                Some(tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown_signal())
                        .await
                }))
            }
            None => {
                tracing::info!("no tls configured; https listener disabled");
                None
            }
        };

        http_task.await.map_err(|e| crate::error::Error::Unexpected(e.to_string()))??;
        if let Some(task) = https_task {
            task.await.map_err(|e| crate::error::Error::Unexpected(e.to_string()))??;
        }

        tracing::info!("server shutdown complete");
        Ok(())
    }

    fn wrap_middleware(&self, app: Router) -> Router {
        // `Router::layer` makes each successive call the new outermost layer
        // (the last `.layer()` call runs first on the request path), which is
        // the opposite of how this stack reads top-to-bottom. Assembling it
        // as one `ServiceBuilder` instead avoids that trap: `ServiceBuilder`
        // composes the other way around, so the first `.layer()` call here
        // really is outermost, and the order below is the true, documented
        // execution order: ForwardedHeaders -> CORS -> compression ->
        // timeout -> body-limit -> tracing span -> request-id -> sensitive-
        // header masking -> panic recovery -> handler. The per-route
        // authorization filter is layered separately, just inside this
        // stack, over the `/api` sub-router.
        let middleware = ServiceBuilder::new()
            .layer(axum::middleware::from_fn(forwarded_headers))
            .layer(self.build_cors_layer())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(self.config.service.timeout_secs),
            ))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(request_id_layer())
            .layer(request_id_propagation_layer())
            .layer(sensitive_headers_layer())
            .layer(CatchPanicLayer::new());

        app.layer(middleware)
    }

    /// An empty allowlist is treated as "no restriction configured", which
    /// is only ever appropriate outside `production`; a non-empty list is
    /// enforced verbatim.
    fn build_cors_layer(&self) -> CorsLayer {
        let origins = &self.config.cors.allowed_origins;
        if origins.is_empty() {
            if self.config.service.is_production() {
                tracing::warn!("no CORS allowed_origins configured in production; denying all cross-origin requests");
                return CorsLayer::new();
            }
            return CorsLayer::permissive();
        }

        let parsed: Vec<http::HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

/// Wait for SIGTERM or Ctrl+C before returning, so `axum::serve` can drain
/// in-flight requests before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().service.http_port, config.service.http_port);
    }

    #[test]
    fn cors_is_permissive_by_default_outside_production() {
        let config = Config::default();
        let server = Server::new(config);
        let _layer = server.build_cors_layer();
    }
}
