//! # cardex-search
//!
//! Hierarchical multi-strategy search engine for the cardex collection
//! backend.
//!
//! This crate provides:
//! - A forward-prefix in-memory inverted index per entity kind, built
//!   lazily with single-flight semantics and atomic swap on rebuild
//! - A hybrid query executor: wildcard browse, index-first text search
//!   with store re-validation, and a database text-search fallback
//! - Hierarchical filter resolution from display names to internal ids
//! - Request coalescing and a TTL response cache around the whole path
//! - The [`SearchService`] façade producing the public response envelope
//!
//! ## Example
//!
//! ```ignore
//! use cardex_search::{SearchConfig, SearchService};
//! use cardex_core::{EntityKind, SearchOptions};
//! use cardex_db::Database;
//!
//! let db = Database::connect("postgres://...").await?;
//! let service = SearchService::for_database(db, SearchConfig::from_env());
//!
//! // Unified search over two kinds
//! let response = service
//!     .search(
//!         &[EntityKind::Cards, EntityKind::Products],
//!         "pikachu",
//!         &SearchOptions::new().with_limit(20),
//!     )
//!     .await?;
//!
//! // Typeahead
//! let suggestions = service
//!     .suggest(EntityKind::Cards, "pika", None)
//!     .await?;
//! ```

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod executor;
pub mod index;
pub mod registry;
pub mod resolver;
pub mod service;

// Re-export core types
pub use cardex_core::*;

// Re-export search types
pub use cache::{cache_key, canonical_request, ResponseCache};
pub use coalesce::{CoalesceMetrics, CoalesceOutcome, RequestCoalescer};
pub use config::SearchConfig;
pub use executor::{Query, QueryExecutor, QueryResults};
pub use index::{DocumentIndex, IndexDocument, InvertedIndex};
pub use registry::{IndexStats, SearchIndexRegistry};
pub use resolver::FilterResolver;
pub use service::SearchService;
