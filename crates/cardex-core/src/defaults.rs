//! Centralized default constants for the cardex search subsystem.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for search results.
pub const SEARCH_LIMIT: i64 = 20;

/// Hard ceiling on caller-supplied limits. Larger requests are clamped,
/// not rejected, so older clients keep working.
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// First page number. Pages are 1-based in the public contract.
pub const FIRST_PAGE: i64 = 1;

// =============================================================================
// SUGGESTIONS
// =============================================================================

/// Default number of typeahead suggestions.
pub const SUGGEST_LIMIT: i64 = 8;

/// Ceiling on caller-supplied suggestion limits.
pub const MAX_SUGGEST_LIMIT: i64 = 25;

// =============================================================================
// SCORING
// =============================================================================

/// Score awarded for exact normalized equality. Also the maximum possible
/// score: non-exact bonuses sum strictly below this value.
pub const SCORE_EXACT: f64 = 100.0;

/// Bonus when the candidate starts with the query.
pub const SCORE_PREFIX: f64 = 50.0;

/// Maximum bonus for query-token coverage, scaled by the fraction of
/// query tokens found inside candidate tokens.
pub const SCORE_TOKEN_COVERAGE: f64 = 30.0;

/// Maximum bonus for length proximity, falling off linearly to zero at
/// [`SCORE_LENGTH_FALLOFF`] characters of difference.
pub const SCORE_LENGTH: f64 = 20.0;

/// Length difference (in chars) at which the proximity bonus reaches zero.
pub const SCORE_LENGTH_FALLOFF: usize = 20;

/// Multiplier applied to the backing store's native text-search rank when
/// blending it with the custom relevance score on the fallback path.
/// ts_rank values are small fractions; this keeps them from vanishing
/// next to the 0-100 relevance scale.
pub const NATIVE_RANK_SCALE: f64 = 10.0;

// =============================================================================
// FUZZY MATCHING
// =============================================================================

/// Maximum token count for which query permutations are generated.
/// 4! = 24 patterns; anything larger is combinatorial blowup.
pub const MAX_PERMUTATION_TOKENS: usize = 4;

// =============================================================================
// CACHING
// =============================================================================

/// TTL for cached search responses, in seconds. Short by design: the
/// search layer is eventually consistent over a slowly-changing store.
pub const RESPONSE_CACHE_TTL_SECS: u64 = 30;

/// Maximum cached responses held in memory.
pub const RESPONSE_CACHE_CAPACITY: usize = 256;

/// Maximum resolved context names (set / set-product) held in memory.
pub const RESOLVER_CACHE_CAPACITY: usize = 512;

// =============================================================================
// INDEXING
// =============================================================================

/// Age after which an in-memory index is rebuilt in the background on next
/// access. Invalidate-on-write is the primary freshness mechanism; this is
/// the backstop for writers that bypass the service.
pub const INDEX_MAX_AGE_SECS: u64 = 900;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Bound on backing-store calls made from the index path. A timeout here
/// triggers the database fallback rather than failing the request.
pub const STORE_TIMEOUT_SECS: u64 = 5;
