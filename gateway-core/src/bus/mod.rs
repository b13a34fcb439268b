//! Broker-backed request/reply RPC client.

pub mod client;

pub use client::BusRpcClient;
