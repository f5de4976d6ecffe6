//! # cardex-core
//!
//! Core types, traits, and abstractions for the cardex search subsystem.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other cardex crates depend on: the four entity
//! models, request/response shapes, the read-only store contract, and the
//! pure text normalization and scoring functions.

pub mod defaults;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod text;
pub mod traits;

// Re-export commonly used types at crate root
pub use envelope::{
    ErrorResponse, KindSearchResponse, PaginationMeta, SearchMeta, SuggestMeta, SuggestResponse,
    Suggestion, UnifiedResults, UnifiedSearchResponse,
};
pub use error::{Error, Result};
pub use filter::{parse_sort, sortable_fields, ResolvedFilter, SearchFilter, SearchOptions};
pub use models::{
    Card, CardSet, EntityKind, EntityProfile, EntityRecord, Product, ProductCategory, SetProduct,
    SortSpec, TieBreak,
};
pub use text::{
    compare_card_numbers, fuzzy_patterns, normalize, relevance_score, tokenize, ScoreWeights,
};
pub use traits::SearchStore;
