//! Resolution of caller-supplied context names to internal ids.
//!
//! Callers filter by display name ("Base Set"), never by id. The resolver
//! turns a [`SearchFilter`] into a [`ResolvedFilter`] through
//! case-insensitive exact-name lookups, LRU-cached by lowercased name.
//! A name that matches no parent produces the `match_none` sentinel: the
//! filter stays active and matches nothing, so a mistyped set name yields
//! an empty result set instead of silently dropping the filter and
//! returning everything.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use cardex_core::{ProductCategory, ResolvedFilter, Result, SearchFilter, SearchStore};

/// Resolves hierarchical filter names to ids, with one LRU cache per
/// parent table.
#[derive(Clone)]
pub struct FilterResolver {
    store: Arc<dyn SearchStore>,
    set_cache: Arc<Mutex<LruCache<String, Uuid>>>,
    set_product_cache: Arc<Mutex<LruCache<String, Uuid>>>,
}

impl FilterResolver {
    /// Create a resolver with the given per-table cache capacity.
    pub fn new(store: Arc<dyn SearchStore>, cache_capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(cache_capacity.max(1)).expect("Cache size must be non-zero");
        Self {
            store,
            set_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            set_product_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Resolve the caller's raw filter into internal ids.
    ///
    /// Constraints compose as AND. Any context that matches nothing, a
    /// category label outside the closed set included, returns the
    /// `match_none` sentinel.
    pub async fn resolve(&self, filter: &SearchFilter) -> Result<ResolvedFilter> {
        let mut resolved = ResolvedFilter::new();

        if let Some(raw) = filter.category.as_deref() {
            match ProductCategory::parse(raw) {
                Ok(category) => resolved.category = Some(category),
                Err(_) => {
                    debug!(category = %raw, "Category label matched no category");
                    return Ok(ResolvedFilter::none_matching());
                }
            }
        }

        if let Some(name) = filter.set_name.as_deref() {
            match self.resolve_set(name).await? {
                Some(id) => resolved.set_id = Some(id),
                None => {
                    debug!(set_name = %name, "Set name matched no set");
                    return Ok(ResolvedFilter::none_matching());
                }
            }
        }

        if let Some(name) = filter.set_product_name.as_deref() {
            match self.resolve_set_product(name).await? {
                Some(id) => resolved.set_product_id = Some(id),
                None => {
                    debug!(set_product_name = %name, "Product line name matched no product line");
                    return Ok(ResolvedFilter::none_matching());
                }
            }
        }

        Ok(resolved)
    }

    /// Resolve a set name to its id. Case-insensitive exact match.
    ///
    /// Returns `Ok(None)` if no set carries the name.
    pub async fn resolve_set(&self, name: &str) -> Result<Option<Uuid>> {
        let key = name.trim().to_lowercase();

        // Check cache first
        {
            let mut cache = self.set_cache.lock().await;
            if let Some(&id) = cache.get(&key) {
                return Ok(Some(id));
            }
        }

        if let Some(set) = self.store.find_set_by_name(name).await? {
            // Cache and return
            let mut cache = self.set_cache.lock().await;
            cache.put(key, set.id);
            return Ok(Some(set.id));
        }

        // Only hits are cached; the parent may be created at any moment.
        Ok(None)
    }

    /// Resolve a product-line name to its id. Case-insensitive exact match.
    ///
    /// Returns `Ok(None)` if no product line carries the name.
    pub async fn resolve_set_product(&self, name: &str) -> Result<Option<Uuid>> {
        let key = name.trim().to_lowercase();

        // Check cache first
        {
            let mut cache = self.set_product_cache.lock().await;
            if let Some(&id) = cache.get(&key) {
                return Ok(Some(id));
            }
        }

        if let Some(set_product) = self.store.find_set_product_by_name(name).await? {
            // Cache and return
            let mut cache = self.set_product_cache.lock().await;
            cache.put(key, set_product.id);
            return Ok(Some(set_product.id));
        }

        Ok(None)
    }

    /// Drop cached set resolutions. Called after set writes.
    pub async fn clear_sets(&self) {
        self.set_cache.lock().await.clear();
    }

    /// Drop cached product-line resolutions. Called after product-line
    /// writes.
    pub async fn clear_set_products(&self) {
        self.set_product_cache.lock().await.clear();
    }

    /// Drop every cached resolution.
    pub async fn clear(&self) {
        self.clear_sets().await;
        self.clear_set_products().await;
    }
}
