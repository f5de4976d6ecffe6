//! Forward-prefix inverted index over entity display text.
//!
//! Every searchable document is indexed under each prefix (length >= 1) of
//! each of its tokens, and under each prefix of its full normalized text.
//! A lookup for `boo` therefore matches `booster`, and the phrase lookup
//! `booster b` matches `Booster Box Display`. Queries are expanded through
//! [`fuzzy_patterns`]: the full phrase, each token, and token permutations
//! all probe the postings, so multi-word queries match regardless of word
//! order (`box booster` finds `Booster Box Display`).
//!
//! The index ranks candidates but never filters them further: inclusion is
//! purely prefix membership, and hierarchical filters are re-applied by the
//! store when the candidate rows are loaded.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use cardex_core::text::{fuzzy_patterns, normalize, relevance_score, tokenize};
use cardex_core::{compare_card_numbers, EntityRecord, ScoreWeights};

/// One indexed entity: its id, the text it matches on, and the ordinal used
/// for numeric-aware tie-breaking (a card's collector number).
#[derive(Debug, Clone)]
pub struct IndexDocument {
    pub id: Uuid,
    pub text: String,
    pub ordinal: Option<String>,
}

impl IndexDocument {
    /// Build an index document from an entity record.
    pub fn from_record(record: &EntityRecord) -> Self {
        Self {
            id: record.id(),
            text: record.searchable_text(),
            ordinal: record.ordinal().map(str::to_string),
        }
    }
}

/// Behavior contract for a replaceable in-memory document index.
pub trait DocumentIndex: Send + Sync {
    /// Add a document, indexing its searchable text.
    fn add(&mut self, doc: IndexDocument);

    /// Remove a document and all its postings.
    fn remove(&mut self, id: Uuid);

    /// Ranked candidate ids for a text query. Empty when the query
    /// normalizes to nothing or nothing matches.
    fn search(&self, query: &str) -> Vec<Uuid>;
}

/// Concrete inverted index: prefix postings plus a document table.
#[derive(Debug)]
pub struct InvertedIndex {
    postings: HashMap<String, HashSet<Uuid>>,
    documents: HashMap<Uuid, IndexDocument>,
    weights: ScoreWeights,
}

impl InvertedIndex {
    /// Create an empty index ranking with the given weights.
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            postings: HashMap::new(),
            documents: HashMap::new(),
            weights,
        }
    }

    /// Build an index from a scan of entity records.
    pub fn from_records(records: &[EntityRecord], weights: ScoreWeights) -> Self {
        let mut index = Self::new(weights);
        for record in records {
            index.add(IndexDocument::from_record(record));
        }
        index
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of distinct posting keys (token and phrase prefixes).
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Look up a document by id.
    pub fn document(&self, id: Uuid) -> Option<&IndexDocument> {
        self.documents.get(&id)
    }

    /// Every posting key a document's text produces: prefixes of each token
    /// plus prefixes of the full normalized text.
    fn keys_for(text: &str) -> HashSet<String> {
        let mut keys = HashSet::new();
        let normalized = normalize(text);
        let mut prefix = String::with_capacity(normalized.len());
        for ch in normalized.chars() {
            prefix.push(ch);
            keys.insert(prefix.clone());
        }
        for token in tokenize(text) {
            let mut prefix = String::with_capacity(token.len());
            for ch in token.chars() {
                prefix.push(ch);
                keys.insert(prefix.clone());
            }
        }
        keys
    }

    /// Rank candidate ids by relevance against the originating query,
    /// tie-broken by numeric-aware ordinal comparison, then id for
    /// determinism.
    fn rank(&self, candidates: HashSet<Uuid>, query: &str) -> Vec<Uuid> {
        let mut scored: Vec<(f64, &IndexDocument)> = candidates
            .into_iter()
            .filter_map(|id| self.documents.get(&id))
            .map(|doc| (relevance_score(&doc.text, query, &self.weights), doc))
            .collect();
        scored.sort_by(|(score_a, doc_a), (score_b, doc_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| match (&doc_a.ordinal, &doc_b.ordinal) {
                    (Some(a), Some(b)) => compare_card_numbers(a, b),
                    _ => std::cmp::Ordering::Equal,
                })
                .then_with(|| doc_a.id.cmp(&doc_b.id))
        });
        scored.into_iter().map(|(_, doc)| doc.id).collect()
    }
}

impl DocumentIndex for InvertedIndex {
    fn add(&mut self, doc: IndexDocument) {
        // Re-adding an id replaces its previous postings.
        if self.documents.contains_key(&doc.id) {
            self.remove(doc.id);
        }
        for key in Self::keys_for(&doc.text) {
            self.postings.entry(key).or_default().insert(doc.id);
        }
        self.documents.insert(doc.id, doc);
    }

    fn remove(&mut self, id: Uuid) {
        let Some(doc) = self.documents.remove(&id) else {
            return;
        };
        for key in Self::keys_for(&doc.text) {
            if let Some(ids) = self.postings.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.postings.remove(&key);
                }
            }
        }
    }

    fn search(&self, query: &str) -> Vec<Uuid> {
        let patterns = fuzzy_patterns(query);
        if patterns.is_empty() {
            return Vec::new();
        }
        let mut candidates: HashSet<Uuid> = HashSet::new();
        for pattern in &patterns {
            if let Some(ids) = self.postings.get(pattern) {
                candidates.extend(ids.iter().copied());
            }
        }
        self.rank(candidates, query)
    }
}
