//! Lazy, memoized registry of per-kind in-memory indexes.
//!
//! One slot per entity kind holds the current [`InvertedIndex`] behind an
//! `Arc`. The first reader builds the index from a store scan; concurrent
//! readers during that build await the same build instead of scanning
//! twice. A build always constructs a fresh index and atomically swaps the
//! `Arc`, so a published index is never mutated in place and readers never
//! observe a half-built one.
//!
//! Invalidate-on-write is the primary freshness mechanism. As a backstop,
//! each slot records when it was built; once it exceeds `max_age` the next
//! reader keeps the stale index and a background task rebuilds the slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use cardex_core::{EntityKind, Result, ScoreWeights, SearchStore};

use crate::index::{DocumentIndex, IndexDocument, InvertedIndex};

/// Snapshot of one kind's slot for operational logging.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub kind: EntityKind,
    pub built: bool,
    pub documents: usize,
    pub tokens: usize,
    /// Time since the slot was built, `None` when it never was.
    pub age: Option<Duration>,
}

struct BuiltIndex {
    index: Arc<InvertedIndex>,
    built_at: Instant,
}

#[derive(Default)]
struct KindSlot {
    current: RwLock<Option<BuiltIndex>>,
    build_lock: Mutex<()>,
    rebuilding: AtomicBool,
}

struct Inner {
    store: Arc<dyn SearchStore>,
    weights: ScoreWeights,
    max_age: Duration,
    cards: KindSlot,
    products: KindSlot,
    sets: KindSlot,
    set_products: KindSlot,
}

impl Inner {
    fn slot(&self, kind: EntityKind) -> &KindSlot {
        match kind {
            EntityKind::Cards => &self.cards,
            EntityKind::Products => &self.products,
            EntityKind::Sets => &self.sets,
            EntityKind::SetProducts => &self.set_products,
        }
    }

    async fn build(&self, kind: EntityKind) -> Result<InvertedIndex> {
        let start = Instant::now();
        let records = self.store.fetch_index_documents(kind).await?;
        let mut index = InvertedIndex::new(self.weights.clone());
        for record in &records {
            index.add(IndexDocument::from_record(record));
        }
        info!(
            kind = %kind,
            documents = index.len(),
            tokens = index.token_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search index built"
        );
        Ok(index)
    }

    /// Build a fresh index and swap it into the slot. Callers hold the
    /// slot's build lock.
    async fn build_and_publish(&self, kind: EntityKind) -> Result<Arc<InvertedIndex>> {
        let index = Arc::new(self.build(kind).await?);
        let mut guard = self.slot(kind).current.write().await;
        *guard = Some(BuiltIndex {
            index: Arc::clone(&index),
            built_at: Instant::now(),
        });
        Ok(index)
    }
}

/// Registry of lazily built per-kind indexes.
///
/// Constructed once and injected wherever an index is read; clones are
/// cheap and share the same slots.
#[derive(Clone)]
pub struct SearchIndexRegistry {
    inner: Arc<Inner>,
}

impl SearchIndexRegistry {
    pub fn new(store: Arc<dyn SearchStore>, weights: ScoreWeights, max_age: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                weights,
                max_age,
                cards: KindSlot::default(),
                products: KindSlot::default(),
                sets: KindSlot::default(),
                set_products: KindSlot::default(),
            }),
        }
    }

    /// Current index for a kind, building it on first access.
    ///
    /// Concurrent callers during a build share one build. A slot past
    /// `max_age` is served as-is while a background rebuild replaces it.
    #[instrument(skip(self), fields(
        subsystem = "search",
        component = "index_registry",
        op = "index_for",
        kind = %kind,
    ))]
    pub async fn index_for(&self, kind: EntityKind) -> Result<Arc<InvertedIndex>> {
        {
            let guard = self.inner.slot(kind).current.read().await;
            if let Some(built) = guard.as_ref() {
                let index = Arc::clone(&built.index);
                let age = built.built_at.elapsed();
                drop(guard);
                if age > self.inner.max_age {
                    debug!(
                        kind = %kind,
                        age_secs = age.as_secs(),
                        "Index past max age, scheduling background rebuild"
                    );
                    self.spawn_rebuild(kind);
                }
                return Ok(index);
            }
        }

        let slot = self.inner.slot(kind);
        let _build = slot.build_lock.lock().await;
        // Another caller may have finished the build while we waited.
        if let Some(built) = slot.current.read().await.as_ref() {
            return Ok(Arc::clone(&built.index));
        }
        self.inner.build_and_publish(kind).await
    }

    /// Drop a kind's index so the next reader rebuilds it. Called after
    /// any write to that collection.
    pub async fn invalidate(&self, kind: EntityKind) {
        let mut guard = self.inner.slot(kind).current.write().await;
        if guard.take().is_some() {
            debug!(kind = %kind, "Search index invalidated");
        }
    }

    /// Drop every kind's index.
    pub async fn invalidate_all(&self) {
        for kind in EntityKind::ALL {
            self.invalidate(kind).await;
        }
    }

    /// Build every index up front, typically at service start.
    pub async fn warm(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            self.index_for(kind).await?;
        }
        Ok(())
    }

    /// Rebuild one index immediately and publish it. Readers keep
    /// serving the previous index for the duration of the build,
    /// where `invalidate` would leave the slot cold for the next
    /// reader to pay for.
    pub async fn rebuild(&self, kind: EntityKind) -> Result<()> {
        let _build = self.inner.slot(kind).build_lock.lock().await;
        self.inner.build_and_publish(kind).await?;
        Ok(())
    }

    /// Per-kind snapshot for operational logging.
    pub async fn stats(&self) -> Vec<IndexStats> {
        let mut stats = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let guard = self.inner.slot(kind).current.read().await;
            stats.push(match guard.as_ref() {
                Some(built) => IndexStats {
                    kind,
                    built: true,
                    documents: built.index.len(),
                    tokens: built.index.token_count(),
                    age: Some(built.built_at.elapsed()),
                },
                None => IndexStats {
                    kind,
                    built: false,
                    documents: 0,
                    tokens: 0,
                    age: None,
                },
            });
        }
        stats
    }

    /// Kick off a rebuild unless one is already in flight for this kind.
    fn spawn_rebuild(&self, kind: EntityKind) {
        let slot = self.inner.slot(kind);
        if slot
            .rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = {
                let _build = inner.slot(kind).build_lock.lock().await;
                inner.build_and_publish(kind).await
            };
            if let Err(e) = result {
                warn!(
                    kind = %kind,
                    error = %e,
                    "Background index rebuild failed, serving previous index"
                );
            }
            inner.slot(kind).rebuilding.store(false, Ordering::Release);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use futures::future::join_all;
    use uuid::Uuid;

    use cardex_core::{CardSet, EntityRecord, Error, ResolvedFilter, SetProduct, SortSpec};

    fn set_record(name: &str) -> EntityRecord {
        EntityRecord::Set(CardSet {
            id: Uuid::new_v4(),
            name: name.to_string(),
            year: Some(1999),
            card_count: 102,
            total_population: 50_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    /// Store that counts scans, optionally sleeps per scan, optionally
    /// fails, and grows by one record per scan so rebuilds are observable.
    struct CountingStore {
        fetches: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchStore for CountingStore {
        async fn fetch_index_documents(&self, _kind: EntityKind) -> Result<Vec<EntityRecord>> {
            let scan = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Search("index scan failed".to_string()));
            }
            Ok((0..scan).map(|i| set_record(&format!("Set {i}"))).collect())
        }

        async fn find_by_ids(
            &self,
            _kind: EntityKind,
            _ids: &[Uuid],
            _filter: &ResolvedFilter,
        ) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }

        async fn find_filtered(
            &self,
            _kind: EntityKind,
            _filter: &ResolvedFilter,
            _sort: &[SortSpec],
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }

        async fn count_matching(
            &self,
            _kind: EntityKind,
            _filter: &ResolvedFilter,
        ) -> Result<i64> {
            Ok(0)
        }

        async fn find_set_by_name(&self, _name: &str) -> Result<Option<CardSet>> {
            Ok(None)
        }

        async fn find_set_product_by_name(&self, _name: &str) -> Result<Option<SetProduct>> {
            Ok(None)
        }

        async fn text_search(
            &self,
            _kind: EntityKind,
            _query: &str,
            _filter: &ResolvedFilter,
            _limit: i64,
        ) -> Result<Vec<(EntityRecord, f32)>> {
            Ok(Vec::new())
        }
    }

    fn registry(store: Arc<CountingStore>, max_age: Duration) -> SearchIndexRegistry {
        SearchIndexRegistry::new(store, ScoreWeights::default(), max_age)
    }

    #[tokio::test]
    async fn test_build_is_memoized() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        let first = reg.index_for(EntityKind::Sets).await.unwrap();
        let second = reg.index_for(EntityKind::Sets).await.unwrap();

        assert_eq!(store.fetch_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_kinds_build_independently() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        reg.index_for(EntityKind::Sets).await.unwrap();
        reg.index_for(EntityKind::Cards).await.unwrap();

        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_build() {
        let store = Arc::new(CountingStore::with_delay(Duration::from_millis(20)));
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                async move { reg.index_for(EntityKind::Sets).await }
            })
            .collect();
        let results = join_all(tasks).await;

        for result in results {
            assert_eq!(result.unwrap().len(), 1);
        }
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        let first = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(first.len(), 1);

        reg.invalidate(EntityKind::Sets).await;
        let second = reg.index_for(EntityKind::Sets).await.unwrap();

        assert_eq!(store.fetch_count(), 2);
        // The second scan returned two records, so this is a new index.
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_publishes_without_a_cold_slot() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        let first = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(first.len(), 1);

        reg.rebuild(EntityKind::Sets).await.unwrap();

        // The rebuild itself scanned; the next reader gets the fresh
        // index without paying for a build of its own.
        assert_eq!(store.fetch_count(), 2);
        let second = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_slot_serves_old_index_and_rebuilds_in_background() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::ZERO);

        let first = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(first.len(), 1);
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Past max_age: the stale index comes back immediately.
        let stale = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(stale.len(), 1);

        // The background rebuild lands without any further reader.
        let mut rebuilt = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if store.fetch_count() >= 2 {
                rebuilt = true;
                break;
            }
        }
        assert!(rebuilt, "background rebuild never ran");
    }

    #[tokio::test]
    async fn test_build_failure_propagates_and_next_call_retries() {
        let store = Arc::new(CountingStore::new());
        store.fail.store(true, Ordering::SeqCst);
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        assert!(reg.index_for(EntityKind::Sets).await.is_err());

        store.fail.store(false, Ordering::SeqCst);
        let index = reg.index_for(EntityKind::Sets).await.unwrap();
        assert_eq!(store.fetch_count(), 2);
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_warm_builds_every_kind() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        reg.warm().await.unwrap();

        assert_eq!(store.fetch_count(), EntityKind::ALL.len());
        let stats = reg.stats().await;
        assert!(stats.iter().all(|s| s.built));
    }

    #[tokio::test]
    async fn test_stats_reports_unbuilt_slots() {
        let store = Arc::new(CountingStore::new());
        let reg = registry(Arc::clone(&store), Duration::from_secs(900));

        reg.index_for(EntityKind::Cards).await.unwrap();
        let stats = reg.stats().await;

        let cards = stats.iter().find(|s| s.kind == EntityKind::Cards).unwrap();
        assert!(cards.built);
        assert_eq!(cards.documents, 1);
        assert!(cards.age.is_some());

        let sets = stats.iter().find(|s| s.kind == EntityKind::Sets).unwrap();
        assert!(!sets.built);
        assert_eq!(sets.documents, 0);
        assert!(sets.age.is_none());
    }
}
