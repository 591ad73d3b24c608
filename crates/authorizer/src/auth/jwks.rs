//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! The JWKS (JSON Web Key Set) client fetches public keys from the provider's
//! `/.well-known/jwks.json` endpoint and caches them with a configurable TTL.
//!
//! # Caching
//!
//! - Keys are cached for `cache_ttl`; a TTL of zero fetches per verification
//! - Concurrent misses coalesce into a single fetch (single-flight); callers
//!   queued behind a failed fetch share its error instead of fetching again
//! - An unknown `kid` refreshes the cache at most once per
//!   `min_refresh_interval`, so random key IDs cannot force a fetch per request
//! - A failed fetch is retried once after `retry_backoff`, then fails closed
//! - A failed refresh never replaces a cached key set

use crate::errors::AuthError;
use crate::observability::metrics::{record_jwks_cache, record_jwks_fetch};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default minimum age of the cache before an unknown `kid` may refresh it.
const DEFAULT_MIN_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// Default per-request fetch timeout.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Default delay before retrying a failed fetch.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the keys this authorizer can use).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    /// Keys published without one never match a lookup.
    #[serde(default)]
    pub kid: String,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,
}

/// Key set document, `{ "keys": [...] }`. Key order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwkSet {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by ID. First match wins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SigningKeyNotFound` if no key has this ID. There
    /// is no fallback key.
    pub fn find_key(&self, kid: &str) -> Result<&Jwk, AuthError> {
        if kid.is_empty() {
            return Err(AuthError::SigningKeyNotFound);
        }
        self.keys
            .iter()
            .find(|key| key.kid == kid)
            .ok_or(AuthError::SigningKeyNotFound)
    }
}

/// Cached JWKS data with fetch and expiry times.
struct CachedJwks {
    key_set: Arc<JwkSet>,

    /// When the key set was fetched.
    fetched_at: Instant,

    /// When this cache entry expires. `None` when the TTL runs past the
    /// end of the clock.
    expires_at: Option<Instant>,
}

impl CachedJwks {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// The most recent fetch that failed, kept under `refresh_lock`.
struct FailedRefresh {
    failed_at: Instant,
    error: AuthError,
}

/// Outcome of consulting the cache without fetching.
enum CacheLookup {
    Hit(Jwk),
    UnknownKid,
    NeedsRefresh,
}

/// JWKS client for fetching and caching public keys.
///
/// Safe to share across concurrent requests behind an `Arc`. The cache is
/// read-mostly; refreshes are serialized by `refresh_lock`.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: RwLock<Option<CachedJwks>>,

    /// Held for the duration of a fetch so concurrent misses coalesce.
    /// Guards the outcome of the last failed fetch.
    refresh_lock: Mutex<Option<FailedRefresh>>,

    /// Cache TTL duration.
    cache_ttl: Duration,

    /// Minimum cache age before an unknown kid triggers a refresh.
    min_refresh_interval: Duration,

    /// Timeout for each fetch attempt.
    fetch_timeout: Duration,

    /// Delay before the single retry.
    retry_backoff: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with default cache and fetch settings.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    pub fn new(jwks_url: String) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authz.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(None),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            min_refresh_interval: Duration::from_secs(DEFAULT_MIN_REFRESH_INTERVAL_SECONDS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Set the cache TTL. Zero disables caching.
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Set the minimum cache age before an unknown kid triggers a refresh.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Set the per-attempt fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the delay before retrying a failed fetch.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// URL this client fetches from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from cache when possible, otherwise fetches (once, shared with
    /// any concurrent callers) and looks the key up in the fresh set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if JWKS cannot be fetched.
    /// Returns `AuthError::SigningKeyNotFound` if key ID is not found.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let started = Instant::now();

        match self.lookup_cached(kid, started).await {
            CacheLookup::Hit(key) => {
                tracing::debug!(target: "authz.jwks", "JWKS cache hit");
                record_jwks_cache("hit");
                return Ok(key);
            }
            CacheLookup::UnknownKid => {
                tracing::debug!(target: "authz.jwks", "Key not found in JWKS cache, refresh suppressed");
                record_jwks_cache("unknown_kid");
                return Err(AuthError::SigningKeyNotFound);
            }
            CacheLookup::NeedsRefresh => record_jwks_cache("miss"),
        }

        let key_set = self.refresh_since(started).await?;
        match key_set.find_key(kid) {
            Ok(key) => Ok(key.clone()),
            Err(e) => {
                tracing::warn!(target: "authz.jwks", "Key not found in JWKS after refresh");
                Err(e)
            }
        }
    }

    /// Fetch the key set from the provider, retrying once after a backoff.
    ///
    /// Does not read or write the cache.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` when both attempts fail.
    #[instrument(skip(self))]
    pub async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        match self.fetch_once().await {
            Ok(key_set) => Ok(key_set),
            Err(e) => {
                tracing::warn!(
                    target: "authz.jwks",
                    error = %e,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "JWKS fetch failed, retrying once"
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.fetch_once().await
            }
        }
    }

    /// Force refresh the cache.
    ///
    /// Used by the readiness probe to warm the cache.
    pub async fn force_refresh(&self) -> Result<(), AuthError> {
        let mut last_failure = self.refresh_lock.lock().await;
        self.fetch_and_store(&mut last_failure).await?;
        Ok(())
    }

    /// Whether an unexpired key set is cached.
    pub async fn is_warm(&self) -> bool {
        self.cache
            .read()
            .await
            .as_ref()
            .is_some_and(|cached| cached.is_fresh(Instant::now()))
    }

    async fn lookup_cached(&self, kid: &str, now: Instant) -> CacheLookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return CacheLookup::NeedsRefresh;
        };
        if !cached.is_fresh(now) {
            return CacheLookup::NeedsRefresh;
        }
        if let Ok(key) = cached.key_set.find_key(kid) {
            return CacheLookup::Hit(key.clone());
        }
        // Unknown kid may mean the provider rotated keys
        if now.saturating_duration_since(cached.fetched_at) >= self.min_refresh_interval {
            CacheLookup::NeedsRefresh
        } else {
            CacheLookup::UnknownKid
        }
    }

    /// Return a key set fetched at or after `since`, fetching one if needed.
    ///
    /// A fetch that failed at or after `since` is not repeated; its error is
    /// returned instead.
    async fn refresh_since(&self, since: Instant) -> Result<Arc<JwkSet>, AuthError> {
        let mut last_failure = self.refresh_lock.lock().await;

        // Another caller may have fetched while we waited for the lock
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at >= since {
                    tracing::debug!(target: "authz.jwks", "Using key set fetched by concurrent request");
                    return Ok(Arc::clone(&cached.key_set));
                }
            }
        }

        if let Some(failure) = last_failure.as_ref() {
            if failure.failed_at >= since {
                tracing::debug!(target: "authz.jwks", "Using failure of concurrent JWKS fetch");
                return Err(failure.error.clone());
            }
        }

        self.fetch_and_store(&mut last_failure).await
    }

    /// Fetch, then cache the key set or remember the failure.
    /// Callers must hold `refresh_lock`.
    async fn fetch_and_store(
        &self,
        last_failure: &mut Option<FailedRefresh>,
    ) -> Result<Arc<JwkSet>, AuthError> {
        match self.fetch_key_set().await {
            Ok(key_set) => {
                *last_failure = None;
                let key_set = Arc::new(key_set);
                self.store(Arc::clone(&key_set)).await;
                Ok(key_set)
            }
            Err(e) => {
                *last_failure = Some(FailedRefresh {
                    failed_at: Instant::now(),
                    error: e.clone(),
                });
                Err(e)
            }
        }
    }

    async fn store(&self, key_set: Arc<JwkSet>) {
        let fetched_at = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            key_set,
            fetched_at,
            expires_at: fetched_at.checked_add(self.cache_ttl),
        });
    }

    async fn fetch_once(&self) -> Result<JwkSet, AuthError> {
        let start = Instant::now();
        let result = self.request_key_set().await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_jwks_fetch(status, start.elapsed());
        result
    }

    async fn request_key_set(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(target: "authz.jwks", url = %self.jwks_url, "Fetching JWKS from identity provider");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authz.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeySetUnavailable(if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    "request failed".to_string()
                })
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "authz.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let key_set: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(target: "authz.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable("malformed key set document".to_string())
        })?;

        tracing::info!(
            target: "authz.jwks",
            key_count = key_set.keys.len(),
            "JWKS fetched"
        );

        Ok(key_set)
    }
}
