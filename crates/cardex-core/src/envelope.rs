//! Response envelope types.
//!
//! Field names and nesting are a compatibility contract with existing
//! clients of the collection API and must not drift: `success`, `data`,
//! `count` for unpaged kinds, `meta.totalResults`, and
//! `meta.pagination.{page, limit, total, pages}` for products. Errors are
//! the flat `{ "success": false, "message": ... }` shape.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;
use crate::filter::SearchFilter;
use crate::models::EntityRecord;

// =============================================================================
// METADATA
// =============================================================================

/// Server-side paging metadata. Products are the only paged kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl PaginationMeta {
    /// `pages` is `ceil(total / limit)`; a zero or negative limit yields a
    /// single page rather than a division by zero.
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            1
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Echo of the request plus result accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub query: String,
    pub filters: SearchFilter,
    pub total_results: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    /// Explanation for empty result sets the caller might not expect,
    /// e.g. a context name that resolved to no parent entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchMeta {
    pub fn new(query: impl Into<String>, filters: SearchFilter, total_results: i64) -> Self {
        Self {
            query: query.into(),
            filters,
            total_results,
            pagination: None,
            message: None,
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationMeta) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Results of a single-kind search. `count` is present for unpaged kinds;
/// products omit it and carry `meta.pagination` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindSearchResponse {
    pub success: bool,
    pub data: Vec<EntityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub meta: SearchMeta,
}

/// Per-kind result lists for a unified (multi-kind) search. Only requested
/// kinds appear in the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<EntityRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<EntityRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<EntityRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_products: Option<Vec<EntityRecord>>,
}

impl UnifiedResults {
    pub fn total(&self) -> i64 {
        [&self.cards, &self.products, &self.sets, &self.set_products]
            .into_iter()
            .flatten()
            .map(|list| list.len() as i64)
            .sum()
    }
}

/// Results of a unified search, keyed by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedSearchResponse {
    pub success: bool,
    pub data: UnifiedResults,
    pub meta: SearchMeta,
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

/// One typeahead suggestion: a flattened view of a result with enough
/// denormalized context for display without a second round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    pub primary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_text: Option<String>,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestMeta {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub success: bool,
    pub data: Vec<Suggestion>,
    pub count: i64,
    pub meta: SuggestMeta,
}

// =============================================================================
// ERRORS
// =============================================================================

/// The flat error shape all failures map to at the service boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            success: false,
            message: err.to_string(),
        }
    }
}
