//! Configuration management using Figment
//!
//! Configuration is loaded from, in ascending priority:
//! 1. Built-in defaults
//! 2. `config.toml` in the current working directory (if present)
//! 3. Environment variables prefixed `GATEWAY_`

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::routing::model::RoutingConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    pub oidc: OidcConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// Service-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Plain HTTP listen port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// TLS listen port.
    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production). Gates whether error bodies
    /// carry an `exception` field.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Hosts this service will answer for; opaque to the core.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl ServiceConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Broker connection configuration (RabbitMQ `Hostname`/`Username`/`Password`/
/// `Timeout` settings, mapped onto this implementation's NATS client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Per-call default timeout hint in seconds; callers may override with
    /// their own cancellation (the client itself imposes no timeout).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum connection attempts before giving up at startup.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds (exponential backoff base).
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl NatsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenID Connect identity-provider configuration (Keycloak-shaped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// IdP authority; discovery is fetched from
    /// `{authority}/.well-known/openid-configuration`.
    pub authority: String,

    /// Accepted audiences.
    #[serde(default = "default_audiences")]
    pub audience: Vec<String>,

    /// Require the discovery/JWKS endpoints to be served over HTTPS.
    #[serde(default = "default_true")]
    pub require_https_metadata: bool,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
        }
    }
}

/// TLS certificate/key material for the `:8081` listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

fn default_service_name() -> String {
    "gateway".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_https_port() -> u16 {
    8081
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_audiences() -> Vec<String> {
    vec![
        "account".to_string(),
        "gc-front".to_string(),
        "gc-gateway-api".to_string(),
    ]
}

impl Config {
    /// Load configuration from defaults, `config.toml`, and `GATEWAY_`-prefixed
    /// environment variables, in ascending priority.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path (primarily for tests).
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut figment = Figment::new().merge(Self::defaults_layer());

        if path.exists() {
            tracing::info!("loading configuration from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        } else {
            tracing::debug!("no config file found at {}, using defaults + env", path.display());
        }

        let figment = figment.merge(Env::prefixed("GATEWAY_").split("_"));
        let config: Config = figment.extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_service_name(),
                http_port: default_http_port(),
                https_port: default_https_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
                allowed_hosts: Vec::new(),
            },
            nats: NatsConfig {
                url: "nats://127.0.0.1:4222".to_string(),
                username: None,
                password: None,
                timeout_secs: default_timeout(),
                max_retries: default_max_retries(),
                retry_delay_secs: default_retry_delay(),
            },
            routing: RoutingConfig::default(),
            oidc: OidcConfig {
                authority: String::new(),
                audience: default_audiences(),
                require_https_metadata: true,
            },
            cors: CorsConfig::default(),
            tls: None,
        }
    }
}

// Figment's `Serialized::defaults` requires the type it wraps, kept as a
// free function so `Config::load*` can seed the base layer from it.
impl Config {
    fn defaults_layer() -> Serialized<Config> {
        Serialized::defaults(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sound() {
        let config = Config::default();
        assert_eq!(config.service.http_port, 8080);
        assert_eq!(config.service.https_port, 8081);
        assert_eq!(config.service.log_level, "info");
        assert!(!config.service.is_production());
    }

    #[test]
    fn production_environment_is_recognized_case_insensitively() {
        let mut config = Config::default();
        config.service.environment = "Production".to_string();
        assert!(config.service.is_production());
    }

    #[test]
    fn env_override_takes_priority_over_default() {
        std::env::set_var("GATEWAY_SERVICE_HTTP_PORT", "9999");
        let figment = Figment::new()
            .merge(Config::defaults_layer())
            .merge(Env::prefixed("GATEWAY_").split("_"));
        let config: Config = figment.extract().unwrap();
        std::env::remove_var("GATEWAY_SERVICE_HTTP_PORT");
        assert_eq!(config.service.http_port, 9999);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = Config::load_from("definitely-not-a-real-config-file.toml").unwrap();
        assert_eq!(config.service.http_port, 8080);
    }
}
