//! Hierarchical-filter-to-SQL clause generation.
//!
//! Converts a [`ResolvedFilter`] into parameterized WHERE fragments and an
//! ORDER BY clause for one entity kind. Sort fields map through a per-kind
//! column whitelist so caller input never reaches SQL as an identifier.
//!
//! The `match_none` sentinel is handled above this layer (the store
//! short-circuits to empty results); builders here only see filters with
//! real constraints.

use cardex_core::{EntityKind, ResolvedFilter, SortSpec};
use uuid::Uuid;

/// Type-safe parameter binding for dynamically assembled queries.
#[derive(Debug, Clone)]
pub enum QueryParam {
    /// Single UUID parameter.
    Uuid(Uuid),
    /// String parameter.
    Text(String),
    /// Integer parameter.
    Int(i64),
}

/// WHERE fragments plus bind parameters, numbered from `param_offset + 1`.
#[derive(Debug, Default)]
pub struct FilterClauses {
    pub clauses: Vec<String>,
    pub params: Vec<QueryParam>,
}

impl FilterClauses {
    /// Render as an `AND`-joined fragment for appending after an existing
    /// WHERE condition. Empty when no constraints apply.
    pub fn and_fragment(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" AND {}", self.clauses.join(" AND "))
        }
    }

    /// Render as a complete WHERE clause, or empty when unconstrained.
    pub fn where_fragment(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Build the WHERE fragments for `filter` against `kind`'s table aliases.
/// Constraints that do not apply to the kind are ignored (a category can
/// never constrain cards).
pub fn filter_clauses(
    kind: EntityKind,
    filter: &ResolvedFilter,
    param_offset: usize,
) -> FilterClauses {
    let mut built = FilterClauses::default();
    let mut n = param_offset;

    match kind {
        EntityKind::Cards => {
            if let Some(set_id) = filter.set_id {
                n += 1;
                built.clauses.push(format!("c.set_id = ${n}"));
                built.params.push(QueryParam::Uuid(set_id));
            }
        }
        EntityKind::Products => {
            if let Some(set_product_id) = filter.set_product_id {
                n += 1;
                built.clauses.push(format!("p.set_product_id = ${n}"));
                built.params.push(QueryParam::Uuid(set_product_id));
            }
            if let Some(category) = filter.category {
                n += 1;
                built.clauses.push(format!("p.category = ${n}"));
                built.params.push(QueryParam::Text(category.as_str().to_string()));
            }
        }
        // Sets and set-products are the top of the hierarchy; no parent
        // context constrains them.
        EntityKind::Sets | EntityKind::SetProducts => {}
    }

    built
}

/// Map a whitelisted sort field to its aliased column for `kind`.
fn sort_column(kind: EntityKind, field: &str) -> Option<&'static str> {
    match (kind, field) {
        (EntityKind::Cards, "name") => Some("c.name"),
        (EntityKind::Cards, "number") => Some("c.number"),
        (EntityKind::Cards, "total_population") => Some("c.total_population"),
        (EntityKind::Products, "name") => Some("p.name"),
        (EntityKind::Products, "price") => Some("p.price"),
        (EntityKind::Products, "available") => Some("p.available"),
        (EntityKind::Sets, "name") => Some("s.name"),
        (EntityKind::Sets, "year") => Some("s.year"),
        (EntityKind::Sets, "total_population") => Some("s.total_population"),
        (EntityKind::SetProducts, "name") => Some("sp.name"),
        _ => None,
    }
}

/// Render an ORDER BY clause for the given sort keys. Fields missing from
/// the whitelist are skipped; an entirely unknown sort yields no clause.
/// Nullable columns sort NULLS LAST when descending so unknown years do
/// not float to the top.
pub fn order_by_clause(kind: EntityKind, sort: &[SortSpec]) -> String {
    let mut keys = Vec::new();
    for spec in sort {
        let Some(column) = sort_column(kind, spec.field) else {
            continue;
        };
        let nullable = matches!((kind, spec.field), (EntityKind::Sets, "year"));
        let direction = match (spec.descending, nullable) {
            (true, true) => " DESC NULLS LAST",
            (true, false) => " DESC",
            (false, _) => " ASC",
        };
        keys.push(format!("{column}{direction}"));
    }
    if keys.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", keys.join(", "))
    }
}

/// Bind accumulated parameters onto a typed query in declaration order.
pub(crate) fn bind_params_as<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    params: Vec<QueryParam>,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Uuid(v) => query.bind(v),
            QueryParam::Text(v) => query.bind(v),
            QueryParam::Int(v) => query.bind(v),
        };
    }
    query
}

/// Bind accumulated parameters onto an untyped query in declaration order.
pub(crate) fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: Vec<QueryParam>,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Uuid(v) => query.bind(v),
            QueryParam::Text(v) => query.bind(v),
            QueryParam::Int(v) => query.bind(v),
        };
    }
    query
}
