//! Unified search façade over the executor, resolver, index registry,
//! response cache, and request coalescer.
//!
//! [`SearchService`] is the one entry point callers hold. A search request
//! flows: validate, check the response cache, coalesce with identical
//! in-flight requests, resolve filter names once, fan out to the executor
//! per requested kind concurrently, assemble the response envelope.
//! Invalidation hooks let the write path drop indexes and caches for an
//! entity type after a mutation.
//!
//! The envelope is a compatibility contract: camelCase fields, `success`
//! on every response, `count` for unpaged kinds, `meta.pagination` for
//! products (the only server-side paged kind), and a `meta.message`
//! explaining empty results when a filter context matched nothing.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, instrument};

use cardex_core::defaults;
use cardex_core::{
    parse_sort, EntityKind, EntityRecord, Error, KindSearchResponse, PaginationMeta,
    ResolvedFilter, Result, SearchFilter, SearchMeta, SearchOptions, SearchStore, SuggestMeta,
    SuggestResponse, Suggestion, UnifiedResults, UnifiedSearchResponse,
};

use crate::cache::{cache_key, canonical_request, ResponseCache};
use crate::coalesce::RequestCoalescer;
use crate::config::SearchConfig;
use crate::executor::{Query, QueryExecutor, QueryResults};
use crate::registry::{IndexStats, SearchIndexRegistry};
use crate::resolver::FilterResolver;

/// The unified search façade. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SearchService {
    registry: SearchIndexRegistry,
    resolver: FilterResolver,
    executor: QueryExecutor,
    search_cache: ResponseCache<UnifiedSearchResponse>,
    suggest_cache: ResponseCache<SuggestResponse>,
    search_coalescer: RequestCoalescer<UnifiedSearchResponse>,
    suggest_coalescer: RequestCoalescer<SuggestResponse>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(store: Arc<dyn SearchStore>, config: SearchConfig) -> Self {
        let registry = SearchIndexRegistry::new(
            Arc::clone(&store),
            config.weights.clone(),
            config.index_max_age,
        );
        let resolver = FilterResolver::new(Arc::clone(&store), config.resolver_cache_capacity);
        let executor = QueryExecutor::new(store, registry.clone(), config.clone());
        Self {
            registry,
            resolver,
            executor,
            search_cache: ResponseCache::new(
                config.response_cache_capacity,
                config.response_cache_ttl,
            ),
            suggest_cache: ResponseCache::new(
                config.response_cache_capacity,
                config.response_cache_ttl,
            ),
            search_coalescer: RequestCoalescer::new(),
            suggest_coalescer: RequestCoalescer::new(),
            config,
        }
    }

    /// Convenience constructor over the PostgreSQL store.
    pub fn for_database(database: cardex_db::Database, config: SearchConfig) -> Self {
        Self::new(Arc::new(database), config)
    }

    /// Search the requested kinds with one query and one filter context.
    ///
    /// The kind list is deduplicated and normalized to response order, so
    /// `[products, cards]` and `[cards, products]` are the same request to
    /// the cache and the coalescer. Validation rejects an empty kind list,
    /// a blank query with no filters, and a sort expression outside the
    /// kind's whitelist; everything else that can go wrong is a store
    /// failure and propagates.
    #[instrument(skip(self, options), fields(
        subsystem = "search",
        component = "search_service",
        op = "search",
    ))]
    pub async fn search(
        &self,
        kinds: &[EntityKind],
        query: &str,
        options: &SearchOptions,
    ) -> Result<UnifiedSearchResponse> {
        let start = Instant::now();
        let kinds = normalize_kinds(kinds);
        if kinds.is_empty() {
            return Err(Error::InvalidInput(
                "at least one entity type must be requested".to_string(),
            ));
        }
        if query.trim().is_empty() && options.filters.is_empty() {
            return Err(Error::InvalidInput(
                "query is required when no filters are given".to_string(),
            ));
        }
        // Sort only applies to browse queries, and must be whitelisted for
        // every requested kind before any store access happens.
        if let (Query::Wildcard, Some(raw)) = (Query::parse(query), options.sort.as_deref()) {
            for kind in &kinds {
                parse_sort(*kind, raw)?;
            }
        }

        let canonical = canonical_request("search", &kinds, query, options);
        let key = cache_key("search", &kinds, &canonical);
        if let Some(hit) = self.search_cache.get(&key).await {
            debug!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Search served from response cache"
            );
            return Ok(hit);
        }

        let service = self.clone();
        let flight_kinds = kinds.clone();
        let flight_query = query.to_string();
        let flight_options = options.clone();
        let outcome = self
            .search_coalescer
            .coalesce(&canonical, async move {
                service
                    .execute_search(&flight_kinds, &flight_query, &flight_options)
                    .await
            })
            .await?;
        let joined = outcome.was_joined();
        let response = outcome.into_inner();
        if !joined {
            self.search_cache.put(key, response.clone()).await;
        }
        debug!(
            kinds = kinds.len(),
            joined,
            total_results = response.meta.total_results,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(response)
    }

    /// Single-kind search with the flat envelope: `count` for unpaged
    /// kinds, `meta.pagination` for products.
    pub async fn search_kind(
        &self,
        kind: EntityKind,
        query: &str,
        options: &SearchOptions,
    ) -> Result<KindSearchResponse> {
        let unified = self.search(std::slice::from_ref(&kind), query, options).await?;
        let data = match kind {
            EntityKind::Cards => unified.data.cards,
            EntityKind::Products => unified.data.products,
            EntityKind::Sets => unified.data.sets,
            EntityKind::SetProducts => unified.data.set_products,
        }
        .unwrap_or_default();
        let count = (kind != EntityKind::Products).then(|| data.len() as i64);
        Ok(KindSearchResponse {
            success: true,
            data,
            count,
            meta: unified.meta,
        })
    }

    /// Typeahead suggestions for one kind: a bounded relevance search
    /// flattened into display shapes with denormalized parent fields.
    #[instrument(skip(self), fields(
        subsystem = "search",
        component = "search_service",
        op = "suggest",
        kind = %kind,
    ))]
    pub async fn suggest(
        &self,
        kind: EntityKind,
        query: &str,
        limit: Option<i64>,
    ) -> Result<SuggestResponse> {
        let start = Instant::now();
        let Query::Text(text) = Query::parse(query) else {
            return Err(Error::InvalidInput(
                "a text query is required for suggestions".to_string(),
            ));
        };
        let limit = self.config.clamp_suggest_limit(limit);

        let kinds = [kind];
        let options = SearchOptions::new().with_limit(limit);
        let canonical = canonical_request("suggest", &kinds, query, &options);
        let key = cache_key("suggest", &kinds, &canonical);
        if let Some(hit) = self.suggest_cache.get(&key).await {
            debug!("Suggestions served from response cache");
            return Ok(hit);
        }

        let service = self.clone();
        let flight_query = query.to_string();
        let outcome = self
            .suggest_coalescer
            .coalesce(&canonical, async move {
                service
                    .execute_suggest(kind, &flight_query, &text, limit)
                    .await
            })
            .await?;
        let joined = outcome.was_joined();
        let response = outcome.into_inner();
        if !joined {
            self.suggest_cache.put(key, response.clone()).await;
        }
        debug!(
            count = response.count,
            joined,
            duration_ms = start.elapsed().as_millis() as u64,
            "Suggestions completed"
        );
        Ok(response)
    }

    /// Drop the index, cached responses, and cached name resolutions
    /// covering one entity type. The write path calls this after any
    /// mutation of that type.
    pub async fn invalidate(&self, kind: EntityKind) {
        self.registry.invalidate(kind).await;
        self.search_cache.invalidate(kind).await;
        self.suggest_cache.invalidate(kind).await;
        match kind {
            EntityKind::Sets => self.resolver.clear_sets().await,
            EntityKind::SetProducts => self.resolver.clear_set_products().await,
            _ => {}
        }
    }

    /// Drop every index, cached response, and cached name resolution.
    pub async fn invalidate_all(&self) {
        self.registry.invalidate_all().await;
        self.search_cache.clear().await;
        self.suggest_cache.clear().await;
        self.resolver.clear().await;
    }

    /// Build all indexes up front instead of on first query.
    pub async fn warm(&self) -> Result<()> {
        self.registry.warm().await
    }

    /// Eagerly rebuild one kind's index and drop responses computed
    /// against the replaced one. Queries keep being served from the
    /// previous index until the new one is published. A scheduled
    /// refresh job is the intended caller.
    pub async fn rebuild_index(&self, kind: EntityKind) -> Result<()> {
        self.registry.rebuild(kind).await?;
        self.search_cache.invalidate(kind).await;
        self.suggest_cache.invalidate(kind).await;
        Ok(())
    }

    /// Per-kind index build state, for operational introspection.
    pub async fn index_stats(&self) -> Vec<IndexStats> {
        self.registry.stats().await
    }

    /// The uncached, uncoalesced search pipeline.
    async fn execute_search(
        &self,
        kinds: &[EntityKind],
        query: &str,
        options: &SearchOptions,
    ) -> Result<UnifiedSearchResponse> {
        let parsed = Query::parse(query);
        let limit = self.config.clamp_limit(options.limit);
        let page = options.page.unwrap_or(defaults::FIRST_PAGE).max(1);
        let resolved = self.resolver.resolve(&options.filters).await?;

        let tasks = kinds.iter().map(|&kind| {
            let executor = self.executor.clone();
            let query = parsed.clone();
            let resolved = resolved.clone();
            let sort_raw = options.sort.clone();
            async move {
                let sort_override = match (&query, sort_raw.as_deref()) {
                    (Query::Wildcard, Some(raw)) => Some(parse_sort(kind, raw)?),
                    _ => None,
                };
                // Products are the only kind paged server-side.
                let offset = if kind == EntityKind::Products {
                    page.saturating_sub(1).saturating_mul(limit)
                } else {
                    0
                };
                let results = executor
                    .execute(kind, &query, &resolved, sort_override, limit, offset)
                    .await?;
                Ok::<(EntityKind, QueryResults), Error>((kind, results))
            }
        });

        let mut data = UnifiedResults::default();
        let mut total_results = 0;
        let mut products_total = None;
        for outcome in join_all(tasks).await {
            let (kind, results) = outcome?;
            total_results += results.total;
            if kind == EntityKind::Products {
                products_total = Some(results.total);
            }
            let slot = match kind {
                EntityKind::Cards => &mut data.cards,
                EntityKind::Products => &mut data.products,
                EntityKind::Sets => &mut data.sets,
                EntityKind::SetProducts => &mut data.set_products,
            };
            *slot = Some(results.records);
        }

        let mut meta = SearchMeta::new(query, options.filters.clone(), total_results);
        if let Some(total) = products_total {
            meta = meta.with_pagination(PaginationMeta::new(page, limit, total));
        }
        if resolved.match_none {
            meta = meta.with_message(no_match_message(&options.filters));
        }
        Ok(UnifiedSearchResponse {
            success: true,
            data,
            meta,
        })
    }

    /// The uncached, uncoalesced suggest pipeline.
    async fn execute_suggest(
        &self,
        kind: EntityKind,
        raw_query: &str,
        text: &str,
        limit: i64,
    ) -> Result<SuggestResponse> {
        let results = self
            .executor
            .execute(
                kind,
                &Query::Text(text.to_string()),
                &ResolvedFilter::new(),
                None,
                limit,
                0,
            )
            .await?;
        let suggestions: Vec<Suggestion> = results.records.iter().map(make_suggestion).collect();
        let count = suggestions.len() as i64;
        Ok(SuggestResponse {
            success: true,
            data: suggestions,
            count,
            meta: SuggestMeta {
                query: raw_query.to_string(),
            },
        })
    }
}

/// Deduplicate the requested kinds and put them in response order.
fn normalize_kinds(kinds: &[EntityKind]) -> Vec<EntityKind> {
    EntityKind::ALL
        .iter()
        .copied()
        .filter(|kind| kinds.contains(kind))
        .collect()
}

/// Explanation attached to `meta` when a filter context resolved to
/// nothing and the result set is empty by definition.
fn no_match_message(filters: &SearchFilter) -> String {
    let mut given: Vec<String> = Vec::new();
    if let Some(name) = &filters.set_name {
        given.push(format!("set \"{name}\""));
    }
    if let Some(name) = &filters.category {
        given.push(format!("category \"{name}\""));
    }
    if let Some(name) = &filters.set_product_name {
        given.push(format!("product line \"{name}\""));
    }
    format!("filter context matched nothing ({})", given.join(", "))
}

/// Flatten one search hit into the typeahead shape. Metadata carries the
/// denormalized parent fields a client needs to render the row without
/// another round-trip.
fn make_suggestion(record: &EntityRecord) -> Suggestion {
    match record {
        EntityRecord::Card(card) => {
            let secondary = card
                .variety
                .as_ref()
                .filter(|v| !v.eq_ignore_ascii_case(&card.name))
                .cloned();
            Suggestion {
                id: card.id,
                primary_text: card.name.clone(),
                secondary_text: secondary,
                metadata: json!({
                    "kind": EntityKind::Cards.as_str(),
                    "number": card.number,
                    "setName": card.set_name,
                    "setYear": card.set_year,
                }),
            }
        }
        EntityRecord::Product(product) => Suggestion {
            id: product.id,
            primary_text: product.name.clone(),
            secondary_text: product.set_product_name.clone(),
            metadata: json!({
                "kind": EntityKind::Products.as_str(),
                "category": product.category,
                "price": product.price,
                "available": product.available,
            }),
        },
        EntityRecord::Set(set) => Suggestion {
            id: set.id,
            primary_text: set.name.clone(),
            secondary_text: set.year.map(|year| year.to_string()),
            metadata: json!({
                "kind": EntityKind::Sets.as_str(),
                "year": set.year,
                "cardCount": set.card_count,
                "totalPopulation": set.total_population,
            }),
        },
        EntityRecord::SetProduct(line) => Suggestion {
            id: line.id,
            primary_text: line.name.clone(),
            secondary_text: None,
            metadata: json!({
                "kind": EntityKind::SetProducts.as_str(),
            }),
        },
    }
}
