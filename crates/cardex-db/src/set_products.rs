//! Set product (product line) repository implementation.
//!
//! Like sets, product lines sit at the top of their hierarchy and take no
//! context filter.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cardex_core::{EntityKind, Error, Result, SetProduct, SortSpec};

use crate::filter_sql::order_by_clause;
use crate::regex_pattern;

const SET_PRODUCT_COLUMNS: &str = "sp.id, sp.name, sp.created_at, sp.updated_at";

const SET_PRODUCT_FROM: &str = "FROM set_product sp";

const SET_PRODUCT_TSVECTOR: &str = "setweight(to_tsvector('simple', sp.name), 'A')";

/// PostgreSQL repository for the set product collection.
#[derive(Clone)]
pub struct PgSetProductRepository {
    pool: Pool<Postgres>,
}

impl PgSetProductRepository {
    /// Create a new PgSetProductRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Full scan for index builds.
    pub async fn fetch_all(&self) -> Result<Vec<SetProduct>> {
        let sql = format!("SELECT {SET_PRODUCT_COLUMNS} {SET_PRODUCT_FROM} ORDER BY sp.name");
        sqlx::query_as::<_, SetProduct>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Load candidates by id.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<SetProduct>> {
        let sql = format!("SELECT {SET_PRODUCT_COLUMNS} {SET_PRODUCT_FROM} WHERE sp.id = ANY($1)");
        sqlx::query_as::<_, SetProduct>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Browse query ordered by `sort`.
    pub async fn find_filtered(
        &self,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SetProduct>> {
        let sql = format!(
            "SELECT {SET_PRODUCT_COLUMNS} {SET_PRODUCT_FROM}{} LIMIT $1 OFFSET $2",
            order_by_clause(EntityKind::SetProducts, sort)
        );
        sqlx::query_as::<_, SetProduct>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Total set products.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM set_product")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Case-insensitive exact-name lookup for context resolution.
    pub async fn find_by_exact_name(&self, name: &str) -> Result<Option<SetProduct>> {
        let sql = format!(
            "SELECT {SET_PRODUCT_COLUMNS} {SET_PRODUCT_FROM} WHERE lower(sp.name) = lower($1)"
        );
        sqlx::query_as::<_, SetProduct>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Native text search over the line name.
    pub async fn text_search(&self, query: &str, limit: i64) -> Result<Vec<(SetProduct, f32)>> {
        let pattern = regex_pattern(query);
        let sql = format!(
            "SELECT {SET_PRODUCT_COLUMNS}, \
             ts_rank({SET_PRODUCT_TSVECTOR}, websearch_to_tsquery('simple', $1), 32) AS rank \
             {SET_PRODUCT_FROM} \
             WHERE (({SET_PRODUCT_TSVECTOR}) @@ websearch_to_tsquery('simple', $1) \
                OR sp.name ~* $2) \
             ORDER BY rank DESC, sp.name ASC \
             LIMIT $3"
        );

        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| {
                let set_product = SetProduct {
                    id: r.get("id"),
                    name: r.get("name"),
                    created_at: r.get("created_at"),
                    updated_at: r.get("updated_at"),
                };
                (set_product, r.get::<f32, _>("rank"))
            })
            .collect())
    }
}
