//! Card repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cardex_core::{Card, EntityKind, Error, ResolvedFilter, Result, SortSpec};

use crate::filter_sql::{bind_params, bind_params_as, filter_clauses, order_by_clause};
use crate::regex_pattern;

/// Shared projection: every card query joins the parent set so `set_name`
/// and `set_year` ride along for indexing and display.
const CARD_COLUMNS: &str = "c.id, c.name, c.number, c.variety, c.set_id, \
     c.pop_10, c.pop_9, c.pop_8, c.total_population, \
     s.name AS set_name, s.year AS set_year, \
     c.created_at, c.updated_at";

const CARD_FROM: &str = "FROM card c JOIN card_set s ON s.id = c.set_id";

/// Weighted text-search document for cards: name first, then number,
/// variety, and the parent set's name.
const CARD_TSVECTOR: &str = "setweight(to_tsvector('simple', c.name), 'A') || \
     setweight(to_tsvector('simple', c.number), 'B') || \
     setweight(to_tsvector('simple', coalesce(c.variety, '')), 'C') || \
     setweight(to_tsvector('simple', s.name), 'D')";

/// PostgreSQL repository for the card collection.
#[derive(Clone)]
pub struct PgCardRepository {
    pool: Pool<Postgres>,
}

impl PgCardRepository {
    /// Create a new PgCardRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Full scan for index builds.
    pub async fn fetch_all(&self) -> Result<Vec<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} {CARD_FROM} ORDER BY c.name");
        sqlx::query_as::<_, Card>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Load candidates by id with the hierarchical filter re-applied.
    pub async fn find_by_ids(&self, ids: &[Uuid], filter: &ResolvedFilter) -> Result<Vec<Card>> {
        let built = filter_clauses(EntityKind::Cards, filter, 1);
        let sql = format!(
            "SELECT {CARD_COLUMNS} {CARD_FROM} WHERE c.id = ANY($1){}",
            built.and_fragment()
        );
        let query = sqlx::query_as::<_, Card>(&sql).bind(ids);
        bind_params_as(query, built.params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Browse query: filter only, ordered by `sort`.
    pub async fn find_filtered(
        &self,
        filter: &ResolvedFilter,
        sort: &[SortSpec],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Card>> {
        let built = filter_clauses(EntityKind::Cards, filter, 0);
        let n = built.params.len();
        let sql = format!(
            "SELECT {CARD_COLUMNS} {CARD_FROM}{}{} LIMIT ${} OFFSET ${}",
            built.where_fragment(),
            order_by_clause(EntityKind::Cards, sort),
            n + 1,
            n + 2
        );
        let query = bind_params_as(sqlx::query_as::<_, Card>(&sql), built.params);
        query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Total cards matching the filter.
    pub async fn count(&self, filter: &ResolvedFilter) -> Result<i64> {
        let built = filter_clauses(EntityKind::Cards, filter, 0);
        let sql = format!(
            "SELECT COUNT(*) AS total FROM card c{}",
            built.where_fragment()
        );
        let row = bind_params(sqlx::query(&sql), built.params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Native text search: websearch full-text match OR case-insensitive
    /// regex across the same fields, returning each row with its
    /// normalized ts_rank.
    pub async fn text_search(
        &self,
        query: &str,
        filter: &ResolvedFilter,
        limit: i64,
    ) -> Result<Vec<(Card, f32)>> {
        let pattern = regex_pattern(query);
        let built = filter_clauses(EntityKind::Cards, filter, 2);
        let n = built.params.len();
        let sql = format!(
            "SELECT {CARD_COLUMNS}, \
             ts_rank({CARD_TSVECTOR}, websearch_to_tsquery('simple', $1), 32) AS rank \
             {CARD_FROM} \
             WHERE (({CARD_TSVECTOR}) @@ websearch_to_tsquery('simple', $1) \
                OR c.name ~* $2 \
                OR c.number ~* $2 \
                OR coalesce(c.variety, '') ~* $2 \
                OR s.name ~* $2){} \
             ORDER BY rank DESC, c.name ASC \
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
                let card = Card {
                    id: r.get("id"),
                    name: r.get("name"),
                    number: r.get("number"),
                    variety: r.get("variety"),
                    set_id: r.get("set_id"),
                    pop_10: r.get("pop_10"),
                    pop_9: r.get("pop_9"),
                    pop_8: r.get("pop_8"),
                    total_population: r.get("total_population"),
                    set_name: r.get("set_name"),
                    set_year: r.get("set_year"),
                    created_at: r.get("created_at"),
                    updated_at: r.get("updated_at"),
                };
                (card, r.get::<f32, _>("rank"))
            })
            .collect())
    }
}
