//! Sealed product repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cardex_core::{EntityKind, Error, Product, ResolvedFilter, Result, SortSpec};

use crate::filter_sql::{bind_params, bind_params_as, filter_clauses, order_by_clause};
use crate::regex_pattern;

/// Shared projection: the product line name joins in for indexing and
/// display. LEFT JOIN because loose products have no line.
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.category, p.available, p.price, \
     p.set_product_id, sp.name AS set_product_name, \
     p.created_at, p.updated_at";

const PRODUCT_FROM: &str = "FROM product p LEFT JOIN set_product sp ON sp.id = p.set_product_id";

const PRODUCT_TSVECTOR: &str = "setweight(to_tsvector('simple', p.name), 'A') || \
     setweight(to_tsvector('simple', coalesce(sp.name, '')), 'B') || \
     setweight(to_tsvector('simple', p.category), 'C')";

/// PostgreSQL repository for the sealed product collection.
#[derive(Clone)]
pub struct PgProductRepository {
    pool: Pool<Postgres>,
}

impl PgProductRepository {
    /// Create a new PgProductRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Full scan for index builds.
    pub async fn fetch_all(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} ORDER BY p.name");
        sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Load candidates by id with the hierarchical filter re-applied.
    pub async fn find_by_ids(
        &self,
        ids: &[Uuid],
        filter: &ResolvedFilter,
    ) -> Result<Vec<Product>> {
        let built = filter_clauses(EntityKind::Products, filter, 1);
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} WHERE p.id = ANY($1){}",
            built.and_fragment()
        );
        let query = sqlx::query_as::<_, Product>(&sql).bind(ids);
        bind_params_as(query, built.params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Browse query: filter only, ordered by `sort`. This is the "show
    /// everything in this context" path.
    pub async fn find_filtered(
        &self,
        filter: &ResolvedFilter,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>> {
        let built = filter_clauses(EntityKind::Products, filter, 0);
        let n = built.params.len();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM}{}{} LIMIT ${} OFFSET ${}",
            built.where_fragment(),
            order_by_clause(EntityKind::Products, sort),
            n + 1,
            n + 2
        );
        let query = bind_params_as(sqlx::query_as::<_, Product>(&sql), built.params);
        query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Total products matching the filter, independent of paging.
    pub async fn count(&self, filter: &ResolvedFilter) -> Result<i64> {
        let built = filter_clauses(EntityKind::Products, filter, 0);
        let sql = format!(
            "SELECT COUNT(*) AS total FROM product p{}",
            built.where_fragment()
        );
        let row = bind_params(sqlx::query(&sql), built.params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Native text search over product name, line name, and category.
    pub async fn text_search(
        &self,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
    ) -> Result<Vec<(Product, f32)>> {
        let pattern = regex_pattern(query);
        let built = filter_clauses(EntityKind::Products, filter, 2);
        let n = built.params.len();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, \
             ts_rank({PRODUCT_TSVECTOR}, websearch_to_tsquery('simple', $1), 32) AS rank \
             {PRODUCT_FROM} \
             WHERE (({PRODUCT_TSVECTOR}) @@ websearch_to_tsquery('simple', $1) \
                OR p.name ~* $2 \
                OR coalesce(sp.name, '') ~* $2 \
                OR p.category ~* $2){} \
             ORDER BY rank DESC, p.name ASC \
             LIMIT ${}",
            built.and_fragment(),
            n + 3
        );

        let query = sqlx::query(&sql).bind(query).bind(pattern);
        let rows = bind_params(query, built.params)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| {
                let product = Product {
                    id: r.get("id"),
                    name: r.get("name"),
                    category: r.get("category"),
                    available: r.get("available"),
                    price: r.get("price"),
                    set_product_id: r.get("set_product_id"),
                    set_product_name: r.get("set_product_name"),
                    created_at: r.get("created_at"),
                    updated_at: r.get("updated_at"),
                };
                (product, r.get::<f32, _>("rank"))
            })
            .collect())
    }
}
