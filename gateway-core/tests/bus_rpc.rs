//! Integration tests for the correlation-based RPC contract described in
//! `bus::client`. These exercise a real `async-nats` connection and are
//! therefore `#[ignore]`d by default; run with:
//!
//! ```text
//! nats-server &
//! cargo test -p gateway-core --test bus_rpc -- --ignored
//! ```

use futures::StreamExt;
use gateway_core::bus::BusRpcClient;
use gateway_core::config::NatsConfig;
use std::time::Duration;

fn local_nats_config() -> NatsConfig {
    NatsConfig {
        url: "nats://127.0.0.1:4222".to_string(),
        username: None,
        password: None,
        timeout_secs: 5,
        max_retries: 0,
        retry_delay_secs: 1,
    }
}

/// Spawns a task that answers every message on `queue` with `reply_body`,
/// honoring the `replyTo` header exactly the way an upstream microservice
/// would.
async fn spawn_echo_responder(client: async_nats::Client, queue: &str, reply_body: Vec<u8>) {
    let mut subscriber = client.subscribe(queue.to_string()).await.unwrap();
    tokio::spawn(async move {
        while let Some(message) = subscriber.next().await {
            let Some(headers) = message.headers else { continue };
            let Some(reply_to) = headers.get("replyTo") else { continue };
            let _ = client
                .publish(reply_to.to_string(), reply_body.clone().into())
                .await;
        }
    });
}

#[tokio::test]
#[ignore]
async fn correlated_reply_reaches_its_own_waiter_under_concurrency() {
    let config = local_nats_config();
    let rpc = BusRpcClient::connect(&config).await.unwrap();

    let raw = async_nats::connect(&config.url).await.unwrap();
    spawn_echo_responder(raw, "test.echo", b"pong".to_vec()).await;

    let calls = (0..8).map(|_| {
        let rpc = rpc.clone();
        tokio::spawn(async move {
            rpc.call("test.echo", b"ping".to_vec(), std::future::pending())
                .await
        })
    });

    for handle in calls {
        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply, b"pong");
    }
}

#[tokio::test]
#[ignore]
async fn cancellation_unblocks_waiter_and_drops_correlation_entry() {
    let config = local_nats_config();
    let rpc = BusRpcClient::connect(&config).await.unwrap();

    // No responder subscribed to "test.blackhole": the call will hang until
    // cancelled.
    let result = rpc
        .call(
            "test.blackhole",
            b"ping".to_vec(),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert!(matches!(result, Err(gateway_core::error::Error::Cancelled)));
    assert_eq!(rpc.pending_count(), 0);
}

#[tokio::test]
#[ignore]
async fn late_reply_after_cancellation_is_silently_dropped() {
    let config = local_nats_config();
    let rpc = BusRpcClient::connect(&config).await.unwrap();

    let raw = async_nats::connect(&config.url).await.unwrap();
    // Responds after the caller's cancellation has already fired.
    spawn_delayed_responder(raw, "test.slow", b"too-late".to_vec(), Duration::from_millis(200)).await;

    let result = rpc
        .call(
            "test.slow",
            b"ping".to_vec(),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await;

    assert!(matches!(result, Err(gateway_core::error::Error::Cancelled)));
    assert_eq!(rpc.pending_count(), 0);

    // Give the late reply time to arrive and be discarded; the map must
    // stay empty (no leak, no panic on the unmatched send).
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(rpc.pending_count(), 0);
}

async fn spawn_delayed_responder(
    client: async_nats::Client,
    queue: &str,
    reply_body: Vec<u8>,
    delay: Duration,
) {
    let mut subscriber = client.subscribe(queue.to_string()).await.unwrap();
    tokio::spawn(async move {
        while let Some(message) = subscriber.next().await {
            let Some(headers) = message.headers else { continue };
            let Some(reply_to) = headers.get("replyTo") else { continue };
            tokio::time::sleep(delay).await;
            let _ = client
                .publish(reply_to.to_string(), reply_body.clone().into())
                .await;
        }
    });
}
