//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables once at process start
//! and is read-only afterwards. The identity provider's JWKS URL and the
//! accepted signing algorithm are configuration, never request input.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default accepted signing algorithm.
pub const DEFAULT_JWT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default minimum interval between refreshes triggered by an unknown `kid`.
pub const DEFAULT_JWKS_MIN_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// Default upper bound on a single JWKS fetch.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Default delay before the single retry of a failed JWKS fetch.
pub const DEFAULT_JWKS_RETRY_BACKOFF_MS: u64 = 250;

/// Maximum JWKS fetch timeout. Requests are held while the fetch runs.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Maximum JWKS cache TTL (one day).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

/// Upper bound on handling one HTTP request.
///
/// A cache miss may wait for a fetch, one backoff and a retry, which must
/// finish inside this bound so the caller still gets a decision.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Algorithms the verifier can check with an RSA public key from a JWKS.
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Authorizer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider JWKS endpoint, e.g. `https://tenant/.well-known/jwks.json`.
    pub jwks_url: String,

    /// The single signing algorithm tokens must declare and be signed with.
    pub jwt_algorithm: Algorithm,

    /// Leeway in seconds for `exp`/`nbf` validation (default: 0).
    pub jwt_clock_skew_seconds: u64,

    /// Expected `iss` claim. Not checked when unset.
    pub jwt_issuer: Option<String>,

    /// Expected `aud` claim. Not checked when unset.
    pub jwt_audience: Option<String>,

    /// How long a fetched key set is served from cache. 0 disables caching.
    pub jwks_cache_ttl_seconds: u64,

    /// Minimum age of the cache before an unknown `kid` may force a refresh.
    pub jwks_min_refresh_interval_seconds: u64,

    /// Timeout applied to each JWKS HTTP request.
    pub jwks_fetch_timeout_seconds: u64,

    /// Backoff before the one retry of a failed JWKS fetch.
    pub jwks_retry_backoff_ms: u64,

    /// Drain period on graceful shutdown.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidJwtAlgorithm(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache configuration: {0}")]
    InvalidJwksCache(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid numeric value: {0}")]
    InvalidNumber(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = vars
            .get("JWKS_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWKS_URL".to_string()))?
            .clone();

        if !(jwks_url.starts_with("https://") || jwks_url.starts_with("http://")) {
            return Err(ConfigError::InvalidJwksUrl(format!(
                "JWKS_URL must be an http(s) URL, got '{}'",
                jwks_url
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse the signing algorithm and restrict it to the RSA family
        let jwt_algorithm = if let Some(value_str) = vars.get("JWT_ALGORITHM") {
            let algorithm = Algorithm::from_str(value_str).map_err(|e| {
                ConfigError::InvalidJwtAlgorithm(format!(
                    "JWT_ALGORITHM must be a JWS algorithm name, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !RSA_ALGORITHMS.contains(&algorithm) {
                return Err(ConfigError::InvalidJwtAlgorithm(format!(
                    "JWT_ALGORITHM must be an RSA algorithm (RS256/384/512, PS256/384/512), got '{}'",
                    value_str
                )));
            }

            algorithm
        } else {
            DEFAULT_JWT_ALGORITHM
        };

        let jwt_clock_skew_seconds =
            parse_u64(vars, "JWT_CLOCK_SKEW_SECONDS", DEFAULT_CLOCK_SKEW.as_secs())?;
        if jwt_clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                jwt_clock_skew_seconds
            )));
        }

        let jwt_issuer = non_empty(vars, "JWT_ISSUER");
        let jwt_audience = non_empty(vars, "JWT_AUDIENCE");

        let jwks_cache_ttl_seconds = parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?;
        if jwks_cache_ttl_seconds > MAX_JWKS_CACHE_TTL_SECONDS {
            return Err(ConfigError::InvalidJwksCache(format!(
                "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_CACHE_TTL_SECONDS, jwks_cache_ttl_seconds
            )));
        }

        let jwks_min_refresh_interval_seconds = parse_u64(
            vars,
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS",
            DEFAULT_JWKS_MIN_REFRESH_INTERVAL_SECONDS,
        )?;
        if jwks_cache_ttl_seconds > 0 && jwks_min_refresh_interval_seconds > jwks_cache_ttl_seconds
        {
            return Err(ConfigError::InvalidJwksCache(format!(
                "JWKS_MIN_REFRESH_INTERVAL_SECONDS ({}) must not exceed JWKS_CACHE_TTL_SECONDS ({})",
                jwks_min_refresh_interval_seconds, jwks_cache_ttl_seconds
            )));
        }

        let jwks_fetch_timeout_seconds = parse_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        if jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidJwksFetchTimeout(
                "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        if jwks_fetch_timeout_seconds > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_FETCH_TIMEOUT_SECONDS, jwks_fetch_timeout_seconds
            )));
        }

        let jwks_retry_backoff_ms = parse_u64(
            vars,
            "JWKS_RETRY_BACKOFF_MS",
            DEFAULT_JWKS_RETRY_BACKOFF_MS,
        )?;

        // Worst case for a miss: two timed-out attempts plus the backoff
        let fetch_budget_ms = jwks_fetch_timeout_seconds
            .saturating_mul(2_000)
            .saturating_add(jwks_retry_backoff_ms);
        if fetch_budget_ms >= REQUEST_TIMEOUT_SECONDS.saturating_mul(1_000) {
            return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                "2 * JWKS_FETCH_TIMEOUT_SECONDS + JWKS_RETRY_BACKOFF_MS must stay under the {}s request timeout, got {}ms",
                REQUEST_TIMEOUT_SECONDS, fetch_budget_ms
            )));
        }

        let drain_seconds = parse_u64(vars, "AUTHORIZER_DRAIN_SECONDS", 0)?;

        Ok(Config {
            bind_address,
            jwks_url,
            jwt_algorithm,
            jwt_clock_skew_seconds,
            jwt_issuer,
            jwt_audience,
            jwks_cache_ttl_seconds,
            jwks_min_refresh_interval_seconds,
            jwks_fetch_timeout_seconds,
            jwks_retry_backoff_ms,
            drain_seconds,
        })
    }

    /// Cache TTL as a `Duration`.
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }

    /// Minimum refresh interval as a `Duration`.
    pub fn jwks_min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.jwks_min_refresh_interval_seconds)
    }

    /// Fetch timeout as a `Duration`.
    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_seconds)
    }

    /// Retry backoff as a `Duration`.
    pub fn jwks_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.jwks_retry_backoff_ms)
    }
}

fn parse_u64(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.trim().parse().map_err(|e| {
            ConfigError::InvalidNumber(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}

fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "JWKS_URL".to_string(),
            "https://idp.example.com/.well-known/jwks.json".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.jwks_url,
            "https://idp.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.jwt_algorithm, Algorithm::RS256);
        assert_eq!(config.jwt_clock_skew_seconds, 0);
        assert!(config.jwt_issuer.is_none());
        assert!(config.jwt_audience.is_none());
        assert_eq!(config.jwks_cache_ttl_seconds, DEFAULT_JWKS_CACHE_TTL_SECONDS);
        assert_eq!(
            config.jwks_min_refresh_interval_seconds,
            DEFAULT_JWKS_MIN_REFRESH_INTERVAL_SECONDS
        );
        assert_eq!(
            config.jwks_fetch_timeout_seconds,
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
        );
        assert_eq!(config.jwks_retry_backoff_ms, DEFAULT_JWKS_RETRY_BACKOFF_MS);
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_from_vars_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("JWT_ALGORITHM".to_string(), "PS384".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "30".to_string());
        vars.insert(
            "JWT_ISSUER".to_string(),
            "https://idp.example.com/".to_string(),
        );
        vars.insert("JWT_AUDIENCE".to_string(), "todo-api".to_string());
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "600".to_string());
        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "60".to_string(),
        );
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string());
        vars.insert("JWKS_RETRY_BACKOFF_MS".to_string(), "100".to_string());
        vars.insert("AUTHORIZER_DRAIN_SECONDS".to_string(), "15".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwt_algorithm, Algorithm::PS384);
        assert_eq!(config.jwt_clock_skew_seconds, 30);
        assert_eq!(
            config.jwt_issuer.as_deref(),
            Some("https://idp.example.com/")
        );
        assert_eq!(config.jwt_audience.as_deref(), Some("todo-api"));
        assert_eq!(config.jwks_cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.jwks_min_refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.jwks_fetch_timeout(), Duration::from_secs(2));
        assert_eq!(config.jwks_retry_backoff(), Duration::from_millis(100));
        assert_eq!(config.drain_seconds, 15);
    }

    #[test]
    fn test_missing_jwks_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref var)) if var == "JWKS_URL"),
            "Expected MissingEnvVar(JWKS_URL), got {:?}",
            result
        );
    }

    #[test]
    fn test_blank_jwks_url_is_missing() {
        let vars = HashMap::from([("JWKS_URL".to_string(), "  ".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_non_http_jwks_url_rejected() {
        let vars = HashMap::from([(
            "JWKS_URL".to_string(),
            "file:///etc/jwks.json".to_string(),
        )]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksUrl(_))
        ));
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_ALGORITHM".to_string(), "HS256".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtAlgorithm(ref msg)) if msg.contains("RSA")),
            "Expected InvalidJwtAlgorithm, got {:?}",
            result
        );
    }

    #[test]
    fn test_elliptic_curve_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_ALGORITHM".to_string(), "ES256".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_ALGORITHM".to_string(), "none".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtAlgorithm(_))
        ));
    }

    #[test]
    fn test_clock_skew_above_max_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(ref msg)) if msg.contains("600")),
            "Expected InvalidJwtClockSkew, got {:?}",
            result
        );
    }

    #[test]
    fn test_clock_skew_at_max_accepted() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());
        assert_eq!(
            Config::from_vars(&vars).unwrap().jwt_clock_skew_seconds,
            600
        );
    }

    #[test]
    fn test_negative_clock_skew_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "-5".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_non_numeric_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "five".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidNumber(ref msg)) if msg.contains("JWKS_CACHE_TTL_SECONDS")),
            "Expected InvalidNumber, got {:?}",
            result
        );
    }

    #[test]
    fn test_zero_ttl_disables_cache_and_skips_interval_check() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwks_cache_ttl(), Duration::ZERO);
    }

    #[test]
    fn test_refresh_interval_above_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "10".to_string());
        vars.insert(
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS".to_string(),
            "11".to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksCache(_))
        ));
    }

    #[test]
    fn test_zero_fetch_timeout_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksFetchTimeout(_))
        ));
    }

    #[test]
    fn test_fetch_timeout_above_max_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "31".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksFetchTimeout(_))
        ));
    }

    #[test]
    fn test_cache_ttl_above_max_rejected() {
        let mut vars = base_vars();
        vars.insert(
            "JWKS_CACHE_TTL_SECONDS".to_string(),
            u64::MAX.to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwksCache(ref msg)) if msg.contains("86400")),
            "Expected InvalidJwksCache, got {:?}",
            result
        );
    }

    #[test]
    fn test_cache_ttl_at_max_accepted() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "86400".to_string());
        assert_eq!(
            Config::from_vars(&vars).unwrap().jwks_cache_ttl(),
            Duration::from_secs(MAX_JWKS_CACHE_TTL_SECONDS)
        );
    }

    #[test]
    fn test_fetch_and_retry_must_fit_request_timeout() {
        // 2 * 15s already reaches the request timeout
        let mut vars = base_vars();
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "15".to_string());
        vars.insert("JWKS_RETRY_BACKOFF_MS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksFetchTimeout(_))
        ));

        // 2 * 14s + 2s backoff reaches it too
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "14".to_string());
        vars.insert("JWKS_RETRY_BACKOFF_MS".to_string(), "2000".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksFetchTimeout(_))
        ));

        vars.insert("JWKS_RETRY_BACKOFF_MS".to_string(), "1999".to_string());
        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_huge_retry_backoff_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_RETRY_BACKOFF_MS".to_string(), u64::MAX.to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksFetchTimeout(_))
        ));
    }

    #[test]
    fn test_blank_issuer_and_audience_are_unset() {
        let mut vars = base_vars();
        vars.insert("JWT_ISSUER".to_string(), "".to_string());
        vars.insert("JWT_AUDIENCE".to_string(), "   ".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert!(config.jwt_issuer.is_none());
        assert!(config.jwt_audience.is_none());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("JWKS_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: JWKS_URL"
        );
    }
}
