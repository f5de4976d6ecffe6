//! Short-lived response cache and canonical request identity.
//!
//! A response snapshot lives for a fixed TTL (default 30s) or until the
//! entity type it covers is written, whichever comes first. Capacity is
//! LRU-bounded. The cache never serves a stale-beyond-TTL entry: expiry is
//! checked on read and expired entries are dropped there.
//!
//! Request identity is built once per request: [`canonical_request`] is
//! the exact string the deduplicator coalesces on, and [`cache_key`]
//! hashes it (SHA-256, first 16 hex chars) behind an
//! `operation:kinds:` prefix. Keeping the operation and kind segments in
//! the clear is what lets [`ResponseCache::invalidate`] sweep one entity
//! type without consulting the hash.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use cardex_core::text::normalize;
use cardex_core::{EntityKind, SearchOptions};

fn join_kinds(kinds: &[EntityKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join("+")
}

/// Canonical identity of one request:
/// `operation:kinds:normalized-query:filters:options`.
///
/// The deduplicator keys on this string directly; the cache keys on its
/// hash. Query text is normalized so `" Pika "` and `"pika"` coalesce.
pub fn canonical_request(
    operation: &str,
    kinds: &[EntityKind],
    query: &str,
    options: &SearchOptions,
) -> String {
    let filters = &options.filters;
    let fold = |value: Option<&str>| {
        value
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default()
    };
    let number = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
    format!(
        "{}:{}:{}:set={}|category={}|line={}:limit={}|page={}|sort={}",
        operation,
        join_kinds(kinds),
        normalize(query),
        fold(filters.set_name.as_deref()),
        fold(filters.category.as_deref()),
        fold(filters.set_product_name.as_deref()),
        number(options.limit),
        number(options.page),
        fold(options.sort.as_deref()),
    )
}

/// Cache key for a canonical request: the operation and kind segments in
/// the clear, then the first 16 hex chars of the SHA-256 of the whole
/// canonical string.
pub fn cache_key(operation: &str, kinds: &[EntityKind], canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}:{}:{}", operation, join_kinds(kinds), &digest[..16])
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// TTL + LRU cache of response snapshots.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct ResponseCache<V> {
    entries: Arc<Mutex<LruCache<String, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("Cache size must be non-zero");
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    /// Unexpired snapshot for a key, promoting its recency. An expired
    /// entry is dropped here and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a snapshot. The capacity bound may evict the least recently
    /// used entry.
    pub async fn put(&self, key: String, value: V) {
        let mut entries = self.entries.lock().await;
        entries.put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every snapshot covering an entity type. Unified-search entries
    /// list several kinds in their key segment; any mention drops them.
    pub async fn invalidate(&self, kind: EntityKind) {
        let mut entries = self.entries.lock().await;
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| {
                key.split(':')
                    .nth(1)
                    .is_some_and(|kinds| kinds.split('+').any(|k| k == kind.as_str()))
            })
            .map(|(key, _)| key.clone())
            .collect();
        let dropped = doomed.len();
        for key in doomed {
            entries.pop(&key);
        }
        if dropped > 0 {
            debug!(kind = %kind, dropped, "Response cache invalidated");
        }
    }

    /// Drop every snapshot.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of stored snapshots, counting not-yet-collected expired
    /// entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when no snapshots are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cardex_core::SearchFilter;

    fn options_with_set(name: &str) -> SearchOptions {
        SearchOptions::new().with_filters(SearchFilter::new().with_set_name(name))
    }

    #[test]
    fn test_canonical_request_is_deterministic() {
        let options = options_with_set("Base Set").with_limit(20);
        let a = canonical_request("search", &[EntityKind::Cards], "Pikachu", &options);
        let b = canonical_request("search", &[EntityKind::Cards], "Pikachu", &options);
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_request_folds_query_case_and_whitespace() {
        let options = SearchOptions::new();
        let a = canonical_request("search", &[EntityKind::Cards], "  Pikachu  ", &options);
        let b = canonical_request("search", &[EntityKind::Cards], "pikachu", &options);
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_request_separates_distinct_requests() {
        let options = SearchOptions::new();
        let base = canonical_request("search", &[EntityKind::Cards], "pikachu", &options);

        assert_ne!(
            base,
            canonical_request("suggest", &[EntityKind::Cards], "pikachu", &options)
        );
        assert_ne!(
            base,
            canonical_request("search", &[EntityKind::Products], "pikachu", &options)
        );
        assert_ne!(
            base,
            canonical_request("search", &[EntityKind::Cards], "raichu", &options)
        );
        assert_ne!(
            base,
            canonical_request(
                "search",
                &[EntityKind::Cards],
                "pikachu",
                &options_with_set("Jungle")
            )
        );
        assert_ne!(
            base,
            canonical_request(
                "search",
                &[EntityKind::Cards],
                "pikachu",
                &SearchOptions::new().with_page(2)
            )
        );
    }

    #[test]
    fn test_cache_key_shape() {
        let kinds = [EntityKind::Cards, EntityKind::Products];
        let canonical = canonical_request("search", &kinds, "pikachu", &SearchOptions::new());
        let key = cache_key("search", &kinds, &canonical);

        let segments: Vec<&str> = key.split(':').collect();
        assert_eq!(segments[0], "search");
        assert_eq!(segments[1], "cards+products");
        assert_eq!(segments[2].len(), 16);
        assert!(segments[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_get_returns_fresh_entry() {
        let cache: ResponseCache<String> = ResponseCache::new(16, Duration::from_secs(30));
        cache.put("search:cards:abc".to_string(), "hit".to_string()).await;
        assert_eq!(cache.get("search:cards:abc").await.as_deref(), Some("hit"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_read() {
        let cache: ResponseCache<String> = ResponseCache::new(16, Duration::from_millis(5));
        cache.put("search:cards:abc".to_string(), "hit".to_string()).await;

        tokio::time::sleep(Duration::from_millis(15)).await;

        assert!(cache.get("search:cards:abc").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache: ResponseCache<u32> = ResponseCache::new(2, Duration::from_secs(30));
        cache.put("search:cards:a".to_string(), 1).await;
        cache.put("search:cards:b".to_string(), 2).await;
        // Touch "a" so "b" is the eviction victim.
        cache.get("search:cards:a").await;
        cache.put("search:cards:c".to_string(), 3).await;

        assert!(cache.get("search:cards:a").await.is_some());
        assert!(cache.get("search:cards:b").await.is_none());
        assert!(cache.get("search:cards:c").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_sweeps_only_the_named_kind() {
        let cache: ResponseCache<u32> = ResponseCache::new(16, Duration::from_secs(30));
        cache.put("search:cards:aaaa".to_string(), 1).await;
        cache.put("search:products:bbbb".to_string(), 2).await;
        cache.put("search:cards+products:cccc".to_string(), 3).await;
        cache.put("suggest:cards:dddd".to_string(), 4).await;

        cache.invalidate(EntityKind::Cards).await;

        assert!(cache.get("search:cards:aaaa").await.is_none());
        assert!(cache.get("suggest:cards:dddd").await.is_none());
        // The unified entry covered cards, so it goes too.
        assert!(cache.get("search:cards+products:cccc").await.is_none());
        assert_eq!(cache.get("search:products:bbbb").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache: ResponseCache<u32> = ResponseCache::new(16, Duration::from_secs(30));
        cache.put("search:cards:aaaa".to_string(), 1).await;
        cache.put("search:sets:bbbb".to_string(), 2).await;

        cache.clear().await;

        assert_eq!(cache.len().await, 0);
    }
}
