//! # cardex-db
//!
//! PostgreSQL database layer for cardex.
//!
//! This crate provides:
//! - Connection pool management
//! - Per-kind repositories for cards, products, sets, and set products
//! - Native full-text search with PostgreSQL tsvector plus a regex arm
//! - The [`SearchStore`] implementation consumed by cardex-search
//!
//! ## Example
//!
//! ```rust,ignore
//! use cardex_db::Database;
//! use cardex_core::{EntityKind, ResolvedFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/cardex").await?;
//!
//!     let count = db.cards.count(&ResolvedFilter::default()).await?;
//!     println!("{count} cards on record");
//!     Ok(())
//! }
//! ```
pub mod cards;
pub mod filter_sql;
pub mod pool;
pub mod products;
pub mod set_products;
pub mod sets;
pub mod store;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use cardex_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Escape POSIX regex metacharacters so user text matches literally under `~*`.
pub fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(
            ch,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '\\' | '|'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Build the alternation pattern for the `~*` fallback arms.
///
/// Each token of the normalized query becomes a literal alternative, so a row
/// matches when any token appears in the column. Falls back to the escaped
/// raw query when tokenization yields nothing.
pub(crate) fn regex_pattern(query: &str) -> String {
    let tokens = cardex_core::text::tokenize(query);
    if tokens.is_empty() {
        return escape_regex(query.trim());
    }
    let escaped: Vec<String> = tokens.iter().map(|t| escape_regex(t)).collect();
    format!("({})", escaped.join("|"))
}

// Re-export repository implementations
pub use cards::PgCardRepository;
pub use filter_sql::{filter_clauses, order_by_clause, FilterClauses, QueryParam};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use products::PgProductRepository;
pub use set_products::PgSetProductRepository;
pub use sets::PgSetRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Card repository.
    pub cards: PgCardRepository,
    /// Sealed product repository.
    pub products: PgProductRepository,
    /// Card set repository.
    pub sets: PgSetRepository,
    /// Set product repository.
    pub set_products: PgSetProductRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            cards: PgCardRepository::new(pool.clone()),
            products: PgProductRepository::new(pool.clone()),
            sets: PgSetRepository::new(pool.clone()),
            set_products: PgSetProductRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_covers_wildcards() {
        assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
    }

    #[test]
    fn escape_like_passes_plain_text() {
        assert_eq!(escape_like("base set"), "base set");
    }

    #[test]
    fn escape_regex_quotes_metacharacters() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("(x|y)"), "\\(x\\|y\\)");
    }

    #[test]
    fn regex_pattern_joins_tokens() {
        assert_eq!(regex_pattern("charizard holo"), "(charizard|holo)");
    }

    #[test]
    fn regex_pattern_escapes_each_token() {
        // Punctuation is stripped by tokenization before escaping, so only
        // hyphens and word characters survive into the alternation.
        assert_eq!(regex_pattern("first-edition!"), "(first-edition)");
    }

    #[test]
    fn regex_pattern_falls_back_to_raw_query() {
        // Nothing tokenizable, so the trimmed raw text is escaped literally.
        assert_eq!(regex_pattern("  ++  "), "\\+\\+");
    }
}
