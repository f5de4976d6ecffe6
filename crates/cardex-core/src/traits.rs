//! Repository trait for read-only access to the entity collections.
//!
//! The search subsystem never writes; it consumes the persistence layer
//! through this contract. `cardex_db::Database` is the PostgreSQL
//! implementation; tests substitute in-memory stores.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::filter::ResolvedFilter;
use crate::models::{CardSet, EntityKind, EntityRecord, SetProduct, SortSpec};

/// Read-only store contract consumed by the hybrid search engine.
///
/// Implementations must honor [`ResolvedFilter::match_none`] by returning
/// empty results (and zero counts) without touching the underlying store;
/// the sentinel means "filter active, matches nothing by definition".
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Full scan of one collection for an index build, parent display
    /// names joined in (a card carries its set's name and year, a product
    /// its product line's name).
    async fn fetch_index_documents(&self, kind: EntityKind) -> Result<Vec<EntityRecord>>;

    /// Load candidate documents by id with the filter re-applied. The
    /// index is never trusted on filters; membership is re-validated here.
    /// Result order is unspecified; callers re-order.
    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        filter: &ResolvedFilter,
    ) -> Result<Vec<EntityRecord>>;

    /// Browse query: filter only, no text matching, ordered by `sort`.
    async fn find_filtered(
        &self,
        kind: EntityKind,
        filter: &ResolvedFilter,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EntityRecord>>;

    /// Total documents matching the filter, independent of paging.
    async fn count_matching(&self, kind: EntityKind, filter: &ResolvedFilter) -> Result<i64>;

    /// Case-insensitive exact-name lookup for hierarchical context
    /// resolution.
    async fn find_set_by_name(&self, name: &str) -> Result<Option<CardSet>>;

    /// Case-insensitive exact-name lookup for the product-line context.
    async fn find_set_product_by_name(&self, name: &str) -> Result<Option<SetProduct>>;

    /// Database-native text search across the kind's searchable fields:
    /// full-text match OR case-insensitive regex, filter applied, returning
    /// each document with its native relevance score.
    async fn text_search(
        &self,
        kind: EntityKind,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
    ) -> Result<Vec<(EntityRecord, f32)>>;
}
