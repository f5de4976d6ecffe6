//! Request-side filter and option types.
//!
//! [`SearchFilter`] is the raw hierarchical context exactly as the caller
//! supplied it (names, not ids). The resolver turns it into a
//! [`ResolvedFilter`] holding internal identifiers; a name that resolves to
//! no parent sets `match_none`, which downstream layers must treat as
//! "filter active, zero matches" rather than dropping the filter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{EntityKind, ProductCategory, SortSpec};

// =============================================================================
// RAW FILTER (caller-facing)
// =============================================================================

/// Hierarchical context by name, as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilter {
    /// Restrict cards to the set with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
    /// Restrict products to this category label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Restrict products to the product line with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_product_name: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set_name(mut self, name: impl Into<String>) -> Self {
        self.set_name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_set_product_name(mut self, name: impl Into<String>) -> Self {
        self.set_product_name = Some(name.into());
        self
    }

    /// True when the caller supplied no context at all.
    pub fn is_empty(&self) -> bool {
        self.set_name.is_none() && self.category.is_none() && self.set_product_name.is_none()
    }
}

// =============================================================================
// RESOLVED FILTER (store-facing)
// =============================================================================

/// Hierarchical context after name resolution, by internal id.
///
/// Multiple constraints compose as logical AND. `match_none` is the
/// resolved-but-empty sentinel: a context name was given and no parent
/// matched, so the result set is empty by definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFilter {
    pub set_id: Option<Uuid>,
    pub set_product_id: Option<Uuid>,
    pub category: Option<ProductCategory>,
    #[serde(default, skip_serializing)]
    pub match_none: bool,
}

impl ResolvedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sentinel filter: active, matches nothing.
    pub fn none_matching() -> Self {
        Self {
            match_none: true,
            ..Self::default()
        }
    }

    pub fn with_set_id(mut self, id: Uuid) -> Self {
        self.set_id = Some(id);
        self
    }

    pub fn with_set_product_id(mut self, id: Uuid) -> Self {
        self.set_product_id = Some(id);
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// True when no context was given: queries run unfiltered. A
    /// `match_none` filter is NOT empty.
    pub fn is_empty(&self) -> bool {
        self.set_id.is_none()
            && self.set_product_id.is_none()
            && self.category.is_none()
            && !self.match_none
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Caller-supplied knobs for one search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    /// Page size; clamped to the configured maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// 1-based page number. Only products honor paging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Sort override for wildcard (browse) queries, e.g. "price" or
    /// "-available". Text queries are always relevance-ordered and ignore
    /// this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    pub filters: SearchFilter,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_filters(mut self, filters: SearchFilter) -> Self {
        self.filters = filters;
        self
    }
}

// =============================================================================
// SORT PARSING
// =============================================================================

/// Columns a caller may sort by, per kind. Anything else is rejected so
/// arbitrary identifiers never reach an ORDER BY clause.
pub fn sortable_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Cards => &["name", "number", "total_population"],
        EntityKind::Products => &["name", "price", "available"],
        EntityKind::Sets => &["name", "year", "total_population"],
        EntityKind::SetProducts => &["name"],
    }
}

/// Parse a caller sort expression ("price", "-available",
/// "totalPopulation") against the kind's whitelist. A leading `-` means
/// descending.
pub fn parse_sort(kind: EntityKind, raw: &str) -> Result<SortSpec> {
    let trimmed = raw.trim();
    let (name, descending) = match trimmed.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let wanted: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    for field in sortable_fields(kind) {
        let canon: String = field.chars().filter(|c| *c != '_').collect();
        if canon == wanted {
            return Ok(SortSpec { field, descending });
        }
    }
    Err(Error::InvalidInput(format!(
        "cannot sort {} by {trimmed}",
        kind.as_str()
    )))
}
