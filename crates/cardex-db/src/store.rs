//! [`SearchStore`] implementation over the aggregated repositories.
//!
//! Dispatches each contract method to the per-kind repository and wraps
//! rows into [`EntityRecord`]s. The `match_none` sentinel short-circuits
//! here: an active filter that resolved to no parent yields empty results
//! and zero counts without touching PostgreSQL.

use async_trait::async_trait;
use uuid::Uuid;

use cardex_core::{
    CardSet, EntityKind, EntityRecord, ResolvedFilter, Result, SearchStore, SetProduct, SortSpec,
};

use crate::Database;

#[async_trait]
impl SearchStore for Database {
    async fn fetch_index_documents(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        let records = match kind {
            EntityKind::Cards => self
                .cards
                .fetch_all()
                .await?
                .into_iter()
                .map(EntityRecord::Card)
                .collect(),
            EntityKind::Products => self
                .products
                .fetch_all()
                .await?
                .into_iter()
                .map(EntityRecord::Product)
                .collect(),
            EntityKind::Sets => self
                .sets
                .fetch_all()
                .await?
                .into_iter()
                .map(EntityRecord::Set)
                .collect(),
            EntityKind::SetProducts => self
                .set_products
                .fetch_all()
                .await?
                .into_iter()
                .map(EntityRecord::SetProduct)
                .collect(),
        };
        Ok(records)
    }

    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        filter: &ResolvedFilter,
    ) -> Result<Vec<EntityRecord>> {
        if filter.match_none || ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = match kind {
            EntityKind::Cards => self
                .cards
                .find_by_ids(ids, filter)
                .await?
                .into_iter()
                .map(EntityRecord::Card)
                .collect(),
            EntityKind::Products => self
                .products
                .find_by_ids(ids, filter)
                .await?
                .into_iter()
                .map(EntityRecord::Product)
                .collect(),
            EntityKind::Sets => self
                .sets
                .find_by_ids(ids)
                .await?
                .into_iter()
                .map(EntityRecord::Set)
                .collect(),
            EntityKind::SetProducts => self
                .set_products
                .find_by_ids(ids)
                .await?
                .into_iter()
                .map(EntityRecord::SetProduct)
                .collect(),
        };
        Ok(records)
    }

    async fn find_filtered(
        &self,
        kind: EntityKind,
        filter: &ResolvedFilter,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EntityRecord>> {
        if filter.match_none {
            return Ok(Vec::new());
        }
        let records = match kind {
            EntityKind::Cards => self
                .cards
                .find_filtered(filter, sort, limit, offset)
                .await?
                .into_iter()
                .map(EntityRecord::Card)
                .collect(),
            EntityKind::Products => self
                .products
                .find_filtered(filter, sort, limit, offset)
                .await?
                .into_iter()
                .map(EntityRecord::Product)
                .collect(),
            EntityKind::Sets => self
                .sets
                .find_filtered(sort, limit, offset)
                .await?
                .into_iter()
                .map(EntityRecord::Set)
                .collect(),
            EntityKind::SetProducts => self
                .set_products
                .find_filtered(sort, limit, offset)
                .await?
                .into_iter()
                .map(EntityRecord::SetProduct)
                .collect(),
        };
        Ok(records)
    }

    async fn count_matching(&self, kind: EntityKind, filter: &ResolvedFilter) -> Result<i64> {
        if filter.match_none {
            return Ok(0);
        }
        match kind {
            EntityKind::Cards => self.cards.count(filter).await,
            EntityKind::Products => self.products.count(filter).await,
            EntityKind::Sets => self.sets.count().await,
            EntityKind::SetProducts => self.set_products.count().await,
        }
    }

    async fn find_set_by_name(&self, name: &str) -> Result<Option<CardSet>> {
        self.sets.find_by_exact_name(name).await
    }

    async fn find_set_product_by_name(&self, name: &str) -> Result<Option<SetProduct>> {
        self.set_products.find_by_exact_name(name).await
    }

    async fn text_search(
        &self,
        kind: EntityKind,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
    ) -> Result<Vec<(EntityRecord, f32)>> {
        if filter.match_none {
            return Ok(Vec::new());
        }
        let hits = match kind {
            EntityKind::Cards => self
                .cards
                .text_search(query, filter, limit)
                .await?
                .into_iter()
                .map(|(card, rank)| (EntityRecord::Card(card), rank))
                .collect(),
            EntityKind::Products => self
                .products
                .text_search(query, filter, limit)
                .await?
                .into_iter()
                .map(|(product, rank)| (EntityRecord::Product(product), rank))
                .collect(),
            EntityKind::Sets => self
                .sets
                .text_search(query, limit)
                .await?
                .into_iter()
                .map(|(set, rank)| (EntityRecord::Set(set), rank))
                .collect(),
            EntityKind::SetProducts => self
                .set_products
                .text_search(query, limit)
                .await?
                .into_iter()
                .map(|(set_product, rank)| (EntityRecord::SetProduct(set_product), rank))
                .collect(),
        };
        Ok(hits)
    }
}
