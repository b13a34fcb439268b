//! API gateway binary: loads configuration, validates the routing policy,
//! connects to the broker, registers the eight-route REST surface plus
//! `/api/health`, and serves both the plain HTTP and TLS listeners.

use anyhow::Context;
use gateway::build_router;
use gateway_core::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    init_tracing(&config).context("failed to initialize tracing")?;

    tracing::info!(
        service = %config.service.name,
        http_port = config.service.http_port,
        https_port = config.service.https_port,
        "starting gateway"
    );

    if let Err(violations) = validate(&config.routing) {
        tracing::error!("routing configuration is invalid:\n{}", violations.join("\n"));
        anyhow::bail!(
            "startup aborted: invalid routing configuration\n{}",
            violations.join("\n")
        );
    }

    let bus = BusRpcClient::connect(&config.nats)
        .await
        .context("failed to connect to broker")?;

    let state = AppState::new(config.clone(), bus);
    let app = build_router(state);

    Server::new(config)
        .serve(app)
        .await
        .context("server exited with an error")?;

    shutdown_tracing();
    Ok(())
}
