//! OpenID Connect bearer-token validation against an external identity
//! provider (Keycloak-shaped discovery document + JWKS).

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::OidcConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
struct DiscoveryDocument {
    issuer: String,
    jwks_uri: String,
}



#[derive(Debug, Clone, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

/// Claims this gateway cares about, plus everything else preserved for
/// [`crate::auth::claims::flatten_claims`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,

    #[serde(default)]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// An authenticated caller, derived from a validated bearer token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub username: Option<String>,
    pub claims: Claims,
}

struct CachedJwks {
    fetched_at: Instant,
    keys: HashMap<String, DecodingKey>,
}

/// Validates bearer tokens against a discovered OIDC authority.
///
/// Discovery and JWKS are fetched lazily on first use and cached for
/// [`Self::JWKS_TTL`]; a stale cache is refreshed transparently on the next
/// validation call.
pub struct OidcValidator {
    config: OidcConfig,
    http: reqwest::Client,
    discovery: RwLock<Option<DiscoveryDocument>>,
    jwks: RwLock<Option<CachedJwks>>,
}

impl OidcValidator {
    const JWKS_TTL: Duration = Duration::from_secs(300);

    pub fn new(config: OidcConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            discovery: RwLock::new(None),
            jwks: RwLock::new(None),
        }
    }

    /// Validate a raw `Authorization: Bearer <token>` value (without the
    /// `Bearer ` prefix) and return the authenticated principal.
    pub async fn validate(&self, token: &str) -> Result<Principal> {
        let header = decode_header(token)
            .map_err(|e| Error::Unauthorized(format!("malformed token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| Error::Unauthorized("token is missing a key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let discovery = self.discovery().await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[discovery.issuer.clone()]);
        validation.set_audience(&self.config.audience);

        let token_data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| Error::Unauthorized(format!("token validation failed: {e}")))?;

        let claims = token_data.claims;
        Ok(Principal {
            subject: claims.sub.clone(),
            username: claims.preferred_username.clone(),
            claims,
        })
    }

    async fn discovery(&self) -> Result<DiscoveryDocument> {
        if let Some(doc) = self.discovery.read().unwrap().clone() {
            return Ok(doc);
        }

        if self.config.require_https_metadata && !self.config.authority.starts_with("https://") {
            return Err(Error::BadConfig(format!(
                "OIDC authority '{}' must use https when require_https_metadata is set",
                self.config.authority
            )));
        }

        let url = format!(
            "{}/.well-known/openid-configuration",
            self.config.authority.trim_end_matches('/')
        );
        let doc: DiscoveryDocument = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        *self.discovery.write().unwrap() = Some(doc.clone());
        Ok(doc)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cache = self.jwks.read().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < Self::JWKS_TTL {
                    if let Some(key) = cached.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }
        }

        self.refresh_jwks().await?;

        let cache = self.jwks.read().unwrap();
        cache
            .as_ref()
            .and_then(|c| c.keys.get(kid))
            .cloned()
            .ok_or_else(|| Error::Unauthorized(format!("unknown signing key id: {kid}")))
    }

    async fn refresh_jwks(&self) -> Result<()> {
        let discovery = self.discovery().await?;
        let jwks: Jwks = self
            .http
            .get(&discovery.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|e| Error::Unauthorized(format!("invalid JWKS key '{}': {e}", jwk.kid)))?;
            keys.insert(jwk.kid, key);
        }

        *self.jwks.write().unwrap() = Some(CachedJwks {
            fetched_at: Instant::now(),
            keys,
        });
        Ok(())
    }
}
