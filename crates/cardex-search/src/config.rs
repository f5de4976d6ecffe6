//! Configuration for the search subsystem.

use std::time::Duration;

use cardex_core::defaults;
use cardex_core::ScoreWeights;

/// Tunables for the search service and its caches.
///
/// Defaults come from [`cardex_core::defaults`]; every knob has a `with_*`
/// builder, and [`SearchConfig::from_env`] reads `CARDEX_SEARCH_*` overrides
/// for deployments that tune without recompiling.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Relevance scoring weights.
    pub weights: ScoreWeights,
    /// Default page size when the caller supplies none.
    pub default_limit: i64,
    /// Ceiling on caller-supplied limits (clamped, not rejected).
    pub max_limit: i64,
    /// Default suggestion count.
    pub default_suggest_limit: i64,
    /// Ceiling on caller-supplied suggestion limits.
    pub max_suggest_limit: i64,
    /// Bound on store calls made from the index path; a timeout falls back
    /// to the database search instead of failing the request.
    pub store_timeout: Duration,
    /// Age after which an index is rebuilt in the background on next access.
    pub index_max_age: Duration,
    /// TTL for cached responses.
    pub response_cache_ttl: Duration,
    /// Maximum cached responses.
    pub response_cache_capacity: usize,
    /// Maximum resolved context names cached by the filter resolver.
    pub resolver_cache_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            default_limit: defaults::SEARCH_LIMIT,
            max_limit: defaults::MAX_SEARCH_LIMIT,
            default_suggest_limit: defaults::SUGGEST_LIMIT,
            max_suggest_limit: defaults::MAX_SUGGEST_LIMIT,
            store_timeout: Duration::from_secs(defaults::STORE_TIMEOUT_SECS),
            index_max_age: Duration::from_secs(defaults::INDEX_MAX_AGE_SECS),
            response_cache_ttl: Duration::from_secs(defaults::RESPONSE_CACHE_TTL_SECS),
            response_cache_capacity: defaults::RESPONSE_CACHE_CAPACITY,
            resolver_cache_capacity: defaults::RESOLVER_CACHE_CAPACITY,
        }
    }
}

impl SearchConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment. Unset or unparsable values keep
    /// the defaults.
    ///
    /// Recognized variables:
    /// - `CARDEX_SEARCH_STORE_TIMEOUT_SECS`
    /// - `CARDEX_SEARCH_INDEX_MAX_AGE_SECS`
    /// - `CARDEX_SEARCH_CACHE_TTL_SECS`
    /// - `CARDEX_SEARCH_MAX_LIMIT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("CARDEX_SEARCH_STORE_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse() {
                config.store_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("CARDEX_SEARCH_INDEX_MAX_AGE_SECS") {
            if let Ok(secs) = raw.parse() {
                config.index_max_age = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("CARDEX_SEARCH_CACHE_TTL_SECS") {
            if let Ok(secs) = raw.parse() {
                config.response_cache_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("CARDEX_SEARCH_MAX_LIMIT") {
            if let Ok(n) = raw.parse() {
                config.max_limit = n;
            }
        }
        config
    }

    /// Set the relevance scoring weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the default page size.
    pub fn with_default_limit(mut self, limit: i64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_limit(mut self, limit: i64) -> Self {
        self.max_limit = limit;
        self
    }

    /// Set the store timeout for index-path calls.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the index staleness threshold.
    pub fn with_index_max_age(mut self, max_age: Duration) -> Self {
        self.index_max_age = max_age;
        self
    }

    /// Set the response cache TTL.
    pub fn with_response_cache_ttl(mut self, ttl: Duration) -> Self {
        self.response_cache_ttl = ttl;
        self
    }

    /// Set the response cache capacity.
    pub fn with_response_cache_capacity(mut self, capacity: usize) -> Self {
        self.response_cache_capacity = capacity;
        self
    }

    /// Set the resolver cache capacity.
    pub fn with_resolver_cache_capacity(mut self, capacity: usize) -> Self {
        self.resolver_cache_capacity = capacity;
        self
    }

    /// Clamp a caller-supplied limit into `1..=max_limit`, applying the
    /// default when absent.
    pub fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }

    /// Clamp a caller-supplied suggestion limit into `1..=max_suggest_limit`.
    pub fn clamp_suggest_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_suggest_limit)
            .clamp(1, self.max_suggest_limit)
    }
}
