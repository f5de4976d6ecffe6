//! Hybrid query execution: one parameterized path for all entity kinds.
//!
//! Per-kind variation (searchable fields, browse ordering, tiebreak) is
//! data carried by [`EntityKind::profile`], not separate code paths. A
//! wildcard query browses the store directly. A text query consults the
//! in-memory index first and re-validates the candidates against the
//! store with the filter applied; if the index yields nothing or its path
//! fails (including a store timeout), the query falls back to the store's
//! native text search. Zero matches is a normal outcome on every path.
//!
//! Ordering is settled before pagination: candidates keep their index
//! rank, fallback hits are re-scored by blending the store's native rank
//! with the field-weighted relevance bonuses, and only then is the page
//! window cut.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use cardex_core::{
    compare_card_numbers, normalize, relevance_score, EntityKind, EntityRecord, Error,
    ResolvedFilter, Result, SearchStore, SortSpec, TieBreak,
};

use crate::config::SearchConfig;
use crate::index::DocumentIndex;
use crate::registry::SearchIndexRegistry;

/// A parsed search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Browse: no text matching, filter and sort only. Parsed from the
    /// public `"*"` sentinel, or from an empty query next to filters.
    Wildcard,
    /// Relevance-ranked text search.
    Text(String),
}

impl Query {
    /// Parse the caller's raw query string. `"*"` and blank input parse
    /// to [`Query::Wildcard`]; anything else is trimmed text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" {
            Query::Wildcard
        } else {
            Query::Text(trimmed.to_string())
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Query::Wildcard)
    }
}

/// One kind's results: the requested page window plus the pre-pagination
/// match count.
#[derive(Debug, Clone)]
pub struct QueryResults {
    pub records: Vec<EntityRecord>,
    /// Matches before the page window was cut. Exact on the wildcard
    /// path; bounded by the fetch window on the text paths.
    pub total: i64,
}

impl QueryResults {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
        }
    }
}

/// Executes one query against one entity kind.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn SearchStore>,
    registry: SearchIndexRegistry,
    config: SearchConfig,
}

impl QueryExecutor {
    pub fn new(
        store: Arc<dyn SearchStore>,
        registry: SearchIndexRegistry,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Run a query for one kind. `sort_override` applies to the wildcard
    /// path only; text queries are always relevance-ordered. `limit` and
    /// `offset` cut the page window after ordering.
    #[instrument(skip(self, filter, sort_override), fields(
        subsystem = "search",
        component = "query_executor",
        op = "execute",
        kind = %kind,
    ))]
    pub async fn execute(
        &self,
        kind: EntityKind,
        query: &Query,
        filter: &ResolvedFilter,
        sort_override: Option<SortSpec>,
        limit: i64,
        offset: i64,
    ) -> Result<QueryResults> {
        let start = Instant::now();
        let results = match query {
            Query::Wildcard => self.browse(kind, filter, sort_override, limit, offset).await?,
            Query::Text(text) if normalize(text).is_empty() => {
                // Punctuation-only input normalizes to nothing and can
                // match nothing; skip the store entirely.
                debug!(kind = %kind, "Query normalized to empty, returning no results");
                QueryResults::empty()
            }
            Query::Text(text) => {
                match self.index_path(kind, text, filter, limit, offset).await {
                    Ok(Some(results)) => results,
                    Ok(None) => {
                        debug!(kind = %kind, "No index candidates, using store text search");
                        self.fallback(kind, text, filter, limit, offset).await?
                    }
                    Err(e) => {
                        warn!(
                            kind = %kind,
                            error = %e,
                            "Index path failed, falling back to store text search"
                        );
                        self.fallback(kind, text, filter, limit, offset).await?
                    }
                }
            }
        };
        debug!(
            kind = %kind,
            returned = results.records.len(),
            total = results.total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(results)
    }

    /// Wildcard path: store browse under the kind's default sort, or the
    /// caller's override.
    async fn browse(
        &self,
        kind: EntityKind,
        filter: &ResolvedFilter,
        sort_override: Option<SortSpec>,
        limit: i64,
        offset: i64,
    ) -> Result<QueryResults> {
        let sort: Vec<SortSpec> = match sort_override {
            Some(spec) => vec![spec],
            None => kind.profile().default_sort.to_vec(),
        };
        let records = self
            .store
            .find_filtered(kind, filter, &sort, limit, offset)
            .await?;
        let total = self.store.count_matching(kind, filter).await?;
        Ok(QueryResults { records, total })
    }

    /// Index path. `Ok(None)` means the index produced no candidates and
    /// the caller should fall back; `Ok(Some)` with an empty page means
    /// re-validation legitimately excluded every candidate.
    async fn index_path(
        &self,
        kind: EntityKind,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Option<QueryResults>> {
        let timeout = self.config.store_timeout;
        let index = tokio::time::timeout(timeout, self.registry.index_for(kind))
            .await
            .map_err(|_| Error::Search(format!("index build for {} timed out", kind.as_str())))??;

        let mut candidates = index.search(query);
        if candidates.is_empty() {
            return Ok(None);
        }
        // Bounded fetch: twice the page window of the best-ranked
        // candidates. Totals on this path are bounded by the same window.
        let fetch_cap = offset.saturating_add(limit).saturating_mul(2).max(limit) as usize;
        candidates.truncate(fetch_cap);
        debug!(kind = %kind, candidates = candidates.len(), "Index candidates found");

        let rows = tokio::time::timeout(timeout, self.store.find_by_ids(kind, &candidates, filter))
            .await
            .map_err(|_| {
                Error::Search(format!("candidate load for {} timed out", kind.as_str()))
            })??;

        // The filter is re-applied by the store; dropping every candidate
        // is a real empty result, not a fallback trigger.
        let total = rows.len() as i64;
        let ordered = order_to_candidates(rows, &candidates);
        Ok(Some(QueryResults {
            records: paginate(ordered, limit, offset),
            total,
        }))
    }

    /// Fallback path: the store's native text search, re-scored by
    /// blending its rank with the field-weighted relevance bonuses.
    async fn fallback(
        &self,
        kind: EntityKind,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
        offset: i64,
    ) -> Result<QueryResults> {
        let fetch_limit = offset.saturating_add(limit).saturating_mul(2).max(limit);
        let scored = self
            .store
            .text_search(kind, query, filter, fetch_limit)
            .await?;
        if scored.is_empty() {
            return Ok(QueryResults::empty());
        }

        let weights = &self.config.weights;
        let tiebreak = kind.profile().tiebreak;
        let mut ranked: Vec<(f64, EntityRecord)> = scored
            .into_iter()
            .map(|(record, native_rank)| {
                let score = f64::from(native_rank) * weights.native_rank_scale
                    + relevance_score(&record.searchable_text(), query, weights);
                (score, record)
            })
            .collect();
        ranked.sort_by(|(score_a, record_a), (score_b, record_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| compare_records(record_a, record_b, tiebreak))
        });

        let total = ranked.len() as i64;
        let records = paginate(
            ranked.into_iter().map(|(_, record)| record).collect(),
            limit,
            offset,
        );
        Ok(QueryResults { records, total })
    }
}

/// Re-impose the index ranking on store rows. Rows the index did not rank
/// (never produced here) sink to the end.
fn order_to_candidates(mut rows: Vec<EntityRecord>, candidates: &[Uuid]) -> Vec<EntityRecord> {
    let position: HashMap<Uuid, usize> = candidates
        .iter()
        .enumerate()
        .map(|(rank, id)| (*id, rank))
        .collect();
    rows.sort_by_key(|record| position.get(&record.id()).copied().unwrap_or(usize::MAX));
    rows
}

/// Cut the page window. Callers settle ordering first.
fn paginate(records: Vec<EntityRecord>, limit: i64, offset: i64) -> Vec<EntityRecord> {
    records
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn compare_records(a: &EntityRecord, b: &EntityRecord, tiebreak: TieBreak) -> std::cmp::Ordering {
    match tiebreak {
        TieBreak::CardNumber => match (a.ordinal(), b.ordinal()) {
            (Some(x), Some(y)) => compare_card_numbers(x, y),
            _ => a.primary_text().cmp(b.primary_text()),
        },
        TieBreak::Name => a.primary_text().cmp(b.primary_text()),
    }
}
