//! Card set repository implementation.
//!
//! Sets sit at the top of the card hierarchy, so no context filter ever
//! constrains them; the store layer short-circuits `match_none` before
//! calling in here.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cardex_core::{CardSet, EntityKind, Error, Result, SortSpec};

use crate::filter_sql::order_by_clause;
use crate::regex_pattern;

const SET_COLUMNS: &str =
    "s.id, s.name, s.year, s.card_count, s.total_population, s.created_at, s.updated_at";

const SET_FROM: &str = "FROM card_set s";

const SET_TSVECTOR: &str = "setweight(to_tsvector('simple', s.name), 'A') || \
     setweight(to_tsvector('simple', coalesce(s.year::text, '')), 'B')";

/// PostgreSQL repository for the card set collection.
#[derive(Clone)]
pub struct PgSetRepository {
    pool: Pool<Postgres>,
}

impl PgSetRepository {
    /// Create a new PgSetRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Full scan for index builds.
    pub async fn fetch_all(&self) -> Result<Vec<CardSet>> {
        let sql = format!("SELECT {SET_COLUMNS} {SET_FROM} ORDER BY s.name");
        sqlx::query_as::<_, CardSet>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Load candidates by id.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CardSet>> {
        let sql = format!("SELECT {SET_COLUMNS} {SET_FROM} WHERE s.id = ANY($1)");
        sqlx::query_as::<_, CardSet>(&sql)
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
    ) -> Result<Vec<CardSet>> {
        let sql = format!(
            "SELECT {SET_COLUMNS} {SET_FROM}{} LIMIT $1 OFFSET $2",
            order_by_clause(EntityKind::Sets, sort)
        );
        sqlx::query_as::<_, CardSet>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Total sets.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM card_set")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Case-insensitive exact-name lookup for context resolution. Set
    /// names are unique, so at most one row matches.
    pub async fn find_by_exact_name(&self, name: &str) -> Result<Option<CardSet>> {
        let sql = format!("SELECT {SET_COLUMNS} {SET_FROM} WHERE lower(s.name) = lower($1)");
        sqlx::query_as::<_, CardSet>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Native text search over set name and release year.
    pub async fn text_search(&self, query: &str, limit: i64) -> Result<Vec<(CardSet, f32)>> {
        let pattern = regex_pattern(query);
        let sql = format!(
            "SELECT {SET_COLUMNS}, \
             ts_rank({SET_TSVECTOR}, websearch_to_tsquery('simple', $1), 32) AS rank \
             {SET_FROM} \
             WHERE (({SET_TSVECTOR}) @@ websearch_to_tsquery('simple', $1) \
                OR s.name ~* $2 \
                OR coalesce(s.year::text, '') ~* $2) \
             ORDER BY rank DESC, s.name ASC \
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
                let set = CardSet {
                    id: r.get("id"),
                    name: r.get("name"),
                    year: r.get("year"),
                    card_count: r.get("card_count"),
                    total_population: r.get("total_population"),
                    created_at: r.get("created_at"),
                    updated_at: r.get("updated_at"),
                };
                (set, r.get::<f32, _>("rank"))
            })
            .collect())
    }
}
