//! Shared in-memory catalog for end-to-end search tests.
//!
//! Implements the store contract faithfully enough for envelope-level
//! assertions: hierarchical filters, multi-key default sorts, adversarial
//! row order on candidate loads, and a normalized-substring stand-in for
//! the database text search.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use cardex_core::{
    compare_card_numbers, normalize, Card, CardSet, EntityKind, EntityRecord, Error, Product,
    ResolvedFilter, Result, SearchStore, SetProduct, SortSpec,
};
use cardex_search::{SearchConfig, SearchService};

#[derive(Default)]
pub struct CatalogStore {
    pub sets: Vec<CardSet>,
    pub set_products: Vec<SetProduct>,
    pub cards: Vec<Card>,
    pub products: Vec<Product>,
    pub fail_scans: AtomicBool,
    pub scans: AtomicUsize,
    pub text_searches: AtomicUsize,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_set(&mut self, name: &str, year: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.sets.push(CardSet {
            id,
            name: name.to_string(),
            year: Some(year),
            card_count: 0,
            total_population: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_card(&mut self, set_id: Uuid, name: &str, number: &str) -> Uuid {
        let id = Uuid::new_v4();
        let set = self.sets.iter().find(|s| s.id == set_id);
        self.cards.push(Card {
            id,
            name: name.to_string(),
            number: number.to_string(),
            variety: None,
            set_id,
            pop_10: 10,
            pop_9: 40,
            pop_8: 50,
            total_population: 100,
            set_name: set.map(|s| s.name.clone()),
            set_year: set.and_then(|s| s.year),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_line(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.set_products.push(SetProduct {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_product(
        &mut self,
        line_id: Option<Uuid>,
        name: &str,
        category: &str,
        available: i32,
        price: f64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let line = line_id.and_then(|lid| self.set_products.iter().find(|l| l.id == lid));
        self.products.push(Product {
            id,
            name: name.to_string(),
            category: category.to_string(),
            available,
            price,
            set_product_id: line_id,
            set_product_name: line.map(|l| l.name.clone()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn text_search_count(&self) -> usize {
        self.text_searches.load(Ordering::SeqCst)
    }

    fn records(&self, kind: EntityKind) -> Vec<EntityRecord> {
        match kind {
            EntityKind::Cards => self.cards.iter().cloned().map(EntityRecord::Card).collect(),
            EntityKind::Products => self
                .products
                .iter()
                .cloned()
                .map(EntityRecord::Product)
                .collect(),
            EntityKind::Sets => self.sets.iter().cloned().map(EntityRecord::Set).collect(),
            EntityKind::SetProducts => self
                .set_products
                .iter()
                .cloned()
                .map(EntityRecord::SetProduct)
                .collect(),
        }
    }

    fn matches(record: &EntityRecord, filter: &ResolvedFilter) -> bool {
        if filter.match_none {
            return false;
        }
        match record {
            EntityRecord::Card(c) => filter.set_id.is_none_or(|id| c.set_id == id),
            EntityRecord::Product(p) => {
                filter
                    .category
                    .is_none_or(|cat| p.category == cat.as_str())
                    && filter
                        .set_product_id
                        .is_none_or(|id| p.set_product_id == Some(id))
            }
            _ => true,
        }
    }
}

#[async_trait]
impl SearchStore for CatalogStore {
    async fn fetch_index_documents(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(Error::Search("collection scan refused".to_string()));
        }
        Ok(self.records(kind))
    }

    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        filter: &ResolvedFilter,
    ) -> Result<Vec<EntityRecord>> {
        let mut rows: Vec<EntityRecord> = self
            .records(kind)
            .into_iter()
            .filter(|r| ids.contains(&r.id()) && Self::matches(r, filter))
            .collect();
        // Row order out of a database is unspecified; be adversarial.
        rows.reverse();
        Ok(rows)
    }

    async fn find_filtered(
        &self,
        kind: EntityKind,
        filter: &ResolvedFilter,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EntityRecord>> {
        let mut rows: Vec<EntityRecord> = self
            .records(kind)
            .into_iter()
            .filter(|r| Self::matches(r, filter))
            .collect();
        rows.sort_by(|a, b| compare_sorted(a, b, sort));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_matching(&self, kind: EntityKind, filter: &ResolvedFilter) -> Result<i64> {
        Ok(self
            .records(kind)
            .iter()
            .filter(|r| Self::matches(r, filter))
            .count() as i64)
    }

    async fn find_set_by_name(&self, name: &str) -> Result<Option<CardSet>> {
        Ok(self
            .sets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn find_set_product_by_name(&self, name: &str) -> Result<Option<SetProduct>> {
        Ok(self
            .set_products
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn text_search(
        &self,
        kind: EntityKind,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
    ) -> Result<Vec<(EntityRecord, f32)>> {
        self.text_searches.fetch_add(1, Ordering::SeqCst);
        let needle = normalize(query);
        let mut hits: Vec<(EntityRecord, f32)> = self
            .records(kind)
            .into_iter()
            .filter(|r| {
                Self::matches(r, filter) && normalize(&r.searchable_text()).contains(&needle)
            })
            .map(|r| {
                // Name hits outrank hits on secondary fields, the way the
                // real tsvector weighting does.
                let native = if normalize(r.primary_text()).contains(&needle) {
                    1.0
                } else {
                    0.5
                };
                (r, native)
            })
            .collect();
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }
}

/// Chain the sort keys the way ORDER BY does.
fn compare_sorted(a: &EntityRecord, b: &EntityRecord, sort: &[SortSpec]) -> CmpOrdering {
    for spec in sort {
        let ord = compare_field(a, b, spec.field);
        let ord = if spec.descending { ord.reverse() } else { ord };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}

fn compare_field(a: &EntityRecord, b: &EntityRecord, field: &str) -> CmpOrdering {
    match (a, b) {
        (EntityRecord::Card(x), EntityRecord::Card(y)) => match field {
            "number" => compare_card_numbers(&x.number, &y.number),
            "total_population" => x.total_population.cmp(&y.total_population),
            _ => x.name.cmp(&y.name),
        },
        (EntityRecord::Product(x), EntityRecord::Product(y)) => match field {
            "available" => x.available.cmp(&y.available),
            "price" => x.price.total_cmp(&y.price),
            _ => x.name.cmp(&y.name),
        },
        (EntityRecord::Set(x), EntityRecord::Set(y)) => match field {
            "year" => x.year.cmp(&y.year),
            "total_population" => x.total_population.cmp(&y.total_population),
            _ => x.name.cmp(&y.name),
        },
        _ => a.primary_text().cmp(b.primary_text()),
    }
}

/// Wire a service over the catalog with default configuration.
pub fn service_over(store: CatalogStore) -> (Arc<CatalogStore>, SearchService) {
    let store = Arc::new(store);
    let service = SearchService::new(
        Arc::clone(&store) as Arc<dyn SearchStore>,
        SearchConfig::new(),
    );
    (store, service)
}
