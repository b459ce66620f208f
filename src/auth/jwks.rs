//! JWKS (JSON Web Key Set) cache
//!
//! Holds the identity provider's public signing keys for a configured TTL.
//!
//! - A fresh set is served straight from the read lock.
//! - A stale or missing set is refreshed under a single refresh lock; callers
//!   that queued behind it re-check freshness and reuse the new set instead of
//!   fetching again.
//! - A `kid` that is not in the current set forces one refresh (key rotation),
//!   unless the set was fetched less than `min_refresh_interval` ago.
//! - A failed fetch leaves the previous set in place.

use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// JWKS cache errors
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS from {url}: {error}")]
    FetchFailed { url: String, error: String },

    #[error("Failed to parse JWKS from {url}: {error}")]
    ParseFailed { url: String, error: String },

    #[error("JWKS from {url} contains no usable signing keys")]
    NoUsableKeys { url: String },

    #[error("Unknown key ID: {kid}")]
    KeyNotFound { kid: String },

    #[error("Token has no kid and the JWKS holds {count} signing keys")]
    AmbiguousKey { count: usize },
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<serde_json::Value>,
}

/// A single verification key from the set
#[derive(Clone)]
pub struct SigningKey {
    pub kid: Option<String>,
    /// Algorithm pinned by the JWK's `alg`, if it declared one
    pub algorithm: Option<Algorithm>,
    pub key: DecodingKey,
}

/// Immutable snapshot of the provider's signing keys
#[derive(Clone)]
pub struct KeySet {
    keys: Arc<Vec<SigningKey>>,
}

impl KeySet {
    /// Build a key set from raw JWK JSON values.
    ///
    /// Encryption keys, keys with a non-signing `alg` and entries that cannot
    /// be converted into a decoding key are skipped.
    pub fn from_jwks(raw_keys: &[serde_json::Value]) -> Self {
        let mut keys = Vec::with_capacity(raw_keys.len());

        for raw in raw_keys {
            let jwk: Jwk = match serde_json::from_value(raw.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping JWK (unsupported shape)");
                    continue;
                }
            };
            let kid = jwk.common.key_id.clone();

            if matches!(
                jwk.common.public_key_use,
                Some(PublicKeyUse::Encryption) | Some(PublicKeyUse::Other(_))
            ) {
                tracing::debug!(kid = ?kid, "Skipping JWK (not a signing key)");
                continue;
            }

            let algorithm = match &jwk.common.key_algorithm {
                Some(alg) => match Algorithm::from_str(&format!("{:?}", alg)) {
                    Ok(alg) => Some(alg),
                    Err(_) => {
                        tracing::debug!(kid = ?kid, alg = ?alg, "Skipping JWK (non-signing alg)");
                        continue;
                    }
                },
                None => None,
            };

            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => {
                    tracing::debug!(kid = ?kid, "Added key to cache");
                    keys.push(SigningKey { kid, algorithm, key });
                }
                Err(e) => {
                    tracing::debug!(kid = ?kid, error = %e, "Skipping JWK (cannot create DecodingKey)");
                }
            }
        }

        Self {
            keys: Arc::new(keys),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> Vec<&str> {
        self.keys.iter().filter_map(|k| k.kid.as_deref()).collect()
    }

    /// Find the key for a token.
    ///
    /// With a `kid` the match is exact. Without one, the set must hold
    /// exactly one key.
    pub fn find(&self, kid: Option<&str>) -> Result<&SigningKey, JwksError> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.kid.as_deref() == Some(kid))
                .ok_or_else(|| JwksError::KeyNotFound {
                    kid: kid.to_string(),
                }),
            None => match self.keys.as_slice() {
                [only] => Ok(only),
                keys => Err(JwksError::AmbiguousKey { count: keys.len() }),
            },
        }
    }
}

struct CachedKeySet {
    keys: KeySet,
    fetched_at: Instant,
}

pub struct JwksCache {
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeySet>>,
    refresh_lock: Mutex<()>,
    ttl: Duration,
    min_refresh_interval: Duration,
}

impl JwksCache {
    /// Create an empty cache. Nothing is fetched until the first lookup or
    /// an explicit `prefetch`.
    pub fn new(
        jwks_url: String,
        client: reqwest::Client,
        ttl: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        Self {
            jwks_url,
            client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            ttl,
            min_refresh_interval,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Check if JWKS is cached (for readiness checks)
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Warm the cache at startup.
    pub async fn prefetch(&self) -> Result<usize, JwksError> {
        tracing::info!(url = %self.jwks_url, "Prefetching JWKS");
        let keys = self.get_key_set().await?;
        Ok(keys.len())
    }

    /// Return the current key set, refreshing it if it is missing or older
    /// than the TTL.
    pub async fn get_key_set(&self) -> Result<KeySet, JwksError> {
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }

        self.refresh_locked().await
    }

    /// Resolve the verification key for a token's `kid`.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<SigningKey, JwksError> {
        let keys = self.get_key_set().await?;
        let kid = match (keys.find(kid), kid) {
            (Ok(key), _) => return Ok(key.clone()),
            (Err(JwksError::KeyNotFound { .. }), Some(kid)) => kid,
            (Err(e), _) => return Err(e),
        };

        let _guard = self.refresh_lock.lock().await;

        // Re-check under the lock: a concurrent miss may already have rotated
        // the set in
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if let Ok(key) = cached.keys.find(Some(kid)) {
                    return Ok(key.clone());
                }
                if cached.fetched_at.elapsed() < self.min_refresh_interval {
                    tracing::warn!(
                        kid = %kid,
                        available_kids = ?cached.keys.kids(),
                        "Unknown key ID and JWKS was refreshed recently, not refetching"
                    );
                    return Err(JwksError::KeyNotFound {
                        kid: kid.to_string(),
                    });
                }
            }
        }

        tracing::warn!(kid = %kid, "Key ID not found in cache, forcing JWKS refresh");
        let keys = self.refresh_locked().await?;

        match keys.find(Some(kid)) {
            Ok(key) => Ok(key.clone()),
            Err(e) => {
                tracing::error!(
                    kid = %kid,
                    available_kids = ?keys.kids(),
                    "Unknown key ID - kid not found in JWKS even after refresh"
                );
                Err(e)
            }
        }
    }

    async fn fresh_keys(&self) -> Option<KeySet> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;

        if cached.fetched_at.elapsed() < self.ttl {
            return Some(cached.keys.clone());
        }

        tracing::info!(
            elapsed_secs = cached.fetched_at.elapsed().as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "JWKS cache expired, will refresh"
        );
        None
    }

    /// Fetch the key set and replace the cache entry. Caller holds `refresh_lock`.
    async fn refresh_locked(&self) -> Result<KeySet, JwksError> {
        let keys = self.fetch().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    async fn fetch(&self) -> Result<KeySet, JwksError> {
        tracing::info!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::FetchFailed {
                url: self.jwks_url.clone(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(JwksError::FetchFailed {
                url: self.jwks_url.clone(),
                error: format!("HTTP {}", response.status()),
            });
        }

        let body: JwksResponse = response.json().await.map_err(|e| JwksError::ParseFailed {
            url: self.jwks_url.clone(),
            error: e.to_string(),
        })?;

        let keys = KeySet::from_jwks(&body.keys);
        if keys.is_empty() {
            return Err(JwksError::NoUsableKeys {
                url: self.jwks_url.clone(),
            });
        }

        tracing::info!(
            key_count = keys.len(),
            kids = ?keys.kids(),
            "JWKS fetched successfully"
        );
        Ok(keys)
    }
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_url", &self.jwks_url)
            .field("ttl", &self.ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}
