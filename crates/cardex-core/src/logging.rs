//! Structured logging schema and field name constants for cardex.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (pool connect, index build), operation completions |
//! | DEBUG | Decision points, cache hits, candidate counts |
//! | TRACE | Per-item iteration, high-volume data (tokens, hits) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "search", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "executor", "registry", "resolver", "cache", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search", "suggest", "build_index", "resolve_filter"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entity kind being searched ("cards", "products", "sets", "setProducts").
pub const ENTITY_KIND: &str = "entity_kind";

/// Search query text.
pub const QUERY: &str = "query";

/// Hierarchical context name being resolved (set or set-product name).
pub const CONTEXT_NAME: &str = "context_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of candidate ids produced by the in-memory index.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of documents scanned into an index build.
pub const DOC_COUNT: &str = "doc_count";

/// Number of distinct tokens in a built index.
pub const TOKEN_COUNT: &str = "token_count";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Whether the database fallback path served this request.
pub const FALLBACK: &str = "fallback";

/// Whether a cached response satisfied this request.
pub const CACHE_HIT: &str = "cache_hit";

/// Whether this call joined another identical in-flight request.
pub const COALESCED: &str = "coalesced";

/// Age of the served index, in seconds.
pub const INDEX_AGE_SECS: &str = "index_age_secs";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
