//! Query normalization, fuzzy pattern generation, and relevance scoring.
//!
//! Pure functions shared by the in-memory index, the hybrid executor, and
//! the database fallback re-ranking. No I/O, no shared state.
//!
//! Scoring combines additively: an exact normalized match short-circuits to
//! [`ScoreWeights::exact`]; otherwise prefix, token-coverage, and
//! length-proximity bonuses sum. With default weights the non-exact sum is
//! strictly below 100 (a prefix match implies at least one character of
//! length difference), so a score of 100 identifies exact matches.

use std::cmp::Ordering;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults;

static NON_SEARCH_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, strip everything that is not a word character, whitespace,
/// or hyphen, collapse whitespace runs, and trim.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_SEARCH_CHARS.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Split into normalized tokens, dropping empties.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Order-insensitive match patterns for a query: the normalized full
/// query, each individual token, and every permutation of the token
/// sequence when there are 2 to [`defaults::MAX_PERMUTATION_TOKENS`]
/// tokens. Longer queries skip permutations (4! = 24 is the ceiling).
/// Deduplicated, original-first.
pub fn fuzzy_patterns(query: &str) -> Vec<String> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return Vec::new();
    }

    let tokens = tokenize(&normalized);
    let mut seen: HashSet<String> = HashSet::new();
    let mut patterns = Vec::new();
    let mut push = |pattern: String, patterns: &mut Vec<String>| {
        if seen.insert(pattern.clone()) {
            patterns.push(pattern);
        }
    };

    push(normalized.clone(), &mut patterns);
    for token in &tokens {
        push(token.clone(), &mut patterns);
    }
    if (2..=defaults::MAX_PERMUTATION_TOKENS).contains(&tokens.len()) {
        for permutation in permutations(&tokens) {
            push(permutation.join(" "), &mut patterns);
        }
    }
    patterns
}

fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let mut rest: Vec<String> = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, item.clone());
            result.push(tail);
        }
    }
    result
}

/// Relative weights for [`relevance_score`]. The defaults are the
/// calibration the ranking was tuned with, not a guaranteed optimum;
/// embedders may adjust them per deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    /// Score for exact normalized equality; also the scale ceiling.
    pub exact: f64,
    /// Bonus when the candidate starts with the query.
    pub prefix: f64,
    /// Maximum bonus for query-token coverage.
    pub token_coverage: f64,
    /// Maximum bonus for length proximity.
    pub length: f64,
    /// Multiplier for the backing store's native rank on the fallback path.
    pub native_rank_scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            exact: defaults::SCORE_EXACT,
            prefix: defaults::SCORE_PREFIX,
            token_coverage: defaults::SCORE_TOKEN_COVERAGE,
            length: defaults::SCORE_LENGTH,
            native_rank_scale: defaults::NATIVE_RANK_SCALE,
        }
    }
}

impl ScoreWeights {
    pub fn with_exact(mut self, exact: f64) -> Self {
        self.exact = exact;
        self
    }

    pub fn with_prefix(mut self, prefix: f64) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_token_coverage(mut self, token_coverage: f64) -> Self {
        self.token_coverage = token_coverage;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_native_rank_scale(mut self, scale: f64) -> Self {
        self.native_rank_scale = scale;
        self
    }
}

/// Rank a candidate string against the original query. Ranking only;
/// inclusion is decided by the index or the database, never by this score.
pub fn relevance_score(candidate: &str, query: &str, weights: &ScoreWeights) -> f64 {
    let cand = normalize(candidate);
    let q = normalize(query);
    if cand.is_empty() || q.is_empty() {
        return 0.0;
    }
    if cand == q {
        return weights.exact;
    }

    let mut score = 0.0;
    if cand.starts_with(&q) {
        score += weights.prefix;
    }

    let query_tokens = tokenize(&q);
    if !query_tokens.is_empty() {
        let cand_tokens = tokenize(&cand);
        let covered = query_tokens
            .iter()
            .filter(|qt| cand_tokens.iter().any(|ct| ct.contains(qt.as_str())))
            .count();
        score += weights.token_coverage * covered as f64 / query_tokens.len() as f64;
    }

    let diff = cand.chars().count().abs_diff(q.chars().count());
    if diff < defaults::SCORE_LENGTH_FALLOFF {
        score += weights.length * (1.0 - diff as f64 / defaults::SCORE_LENGTH_FALLOFF as f64);
    }

    score
}

/// Card-number-aware comparison: pure numeric strings compare numerically
/// and sort before any alphanumeric value; alphanumerics compare
/// lexicographically.
pub fn compare_card_numbers(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_numeric(s: &str) -> Option<u64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
