//! Core data models for cardex.
//!
//! These types are shared across all cardex crates and represent the four
//! searchable entity collections plus the per-kind search configuration.
//!
//! Entity structs serialize with camelCase field names because the response
//! payloads are consumed by existing clients of the original collection API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// ENTITY KINDS
// =============================================================================

/// The four searchable entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "cards")]
    Cards,
    #[serde(rename = "products")]
    Products,
    #[serde(rename = "sets")]
    Sets,
    #[serde(rename = "setProducts")]
    SetProducts,
}

impl EntityKind {
    /// All kinds, in the order unified responses list them.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Cards,
        EntityKind::Products,
        EntityKind::Sets,
        EntityKind::SetProducts,
    ];

    /// Public wire label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Cards => "cards",
            EntityKind::Products => "products",
            EntityKind::Sets => "sets",
            EntityKind::SetProducts => "setProducts",
        }
    }

    /// Parse a caller-supplied kind label. Accepts the wire label
    /// case-insensitively plus the snake_case spelling of set products.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cards" | "card" => Ok(EntityKind::Cards),
            "products" | "product" => Ok(EntityKind::Products),
            "sets" | "set" => Ok(EntityKind::Sets),
            "setproducts" | "set_products" | "set-products" | "setproduct" => {
                Ok(EntityKind::SetProducts)
            }
            other => Err(Error::InvalidInput(format!(
                "unknown entity type: {other}"
            ))),
        }
    }

    /// Per-kind search configuration (searchable fields, default sort,
    /// tiebreak). Variation between kinds is data, not separate code paths.
    pub fn profile(&self) -> &'static EntityProfile {
        match self {
            EntityKind::Cards => &CARD_PROFILE,
            EntityKind::Products => &PRODUCT_PROFILE,
            EntityKind::Sets => &SET_PROFILE,
            EntityKind::SetProducts => &SET_PRODUCT_PROFILE,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PER-KIND SEARCH PROFILES
// =============================================================================

/// One sort key with direction, mapped to a whitelisted column by the
/// database layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub descending: bool,
}

/// Which field breaks ties after relevance ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Card-number comparison: pure numerics sort numerically and before
    /// any alphanumeric value.
    CardNumber,
    /// Plain lexicographic name comparison.
    Name,
}

/// Static per-kind search configuration.
#[derive(Debug)]
pub struct EntityProfile {
    pub kind: EntityKind,
    /// Columns combined into the text-search document, highest weight first.
    pub searchable_fields: &'static [&'static str],
    /// Ordering for wildcard (browse) queries.
    pub default_sort: &'static [SortSpec],
    pub tiebreak: TieBreak,
}

static CARD_PROFILE: EntityProfile = EntityProfile {
    kind: EntityKind::Cards,
    searchable_fields: &["name", "number", "variety", "set_name"],
    default_sort: &[
        SortSpec { field: "total_population", descending: true },
        SortSpec { field: "name", descending: false },
    ],
    tiebreak: TieBreak::CardNumber,
};

static PRODUCT_PROFILE: EntityProfile = EntityProfile {
    kind: EntityKind::Products,
    searchable_fields: &["name", "set_product_name", "category"],
    default_sort: &[
        SortSpec { field: "available", descending: true },
        SortSpec { field: "price", descending: false },
    ],
    tiebreak: TieBreak::Name,
};

static SET_PROFILE: EntityProfile = EntityProfile {
    kind: EntityKind::Sets,
    searchable_fields: &["name", "year"],
    default_sort: &[
        SortSpec { field: "year", descending: true },
        SortSpec { field: "total_population", descending: true },
    ],
    tiebreak: TieBreak::Name,
};

static SET_PRODUCT_PROFILE: EntityProfile = EntityProfile {
    kind: EntityKind::SetProducts,
    searchable_fields: &["name"],
    default_sort: &[SortSpec { field: "name", descending: false }],
    tiebreak: TieBreak::Name,
};

// =============================================================================
// PRODUCT CATEGORIES
// =============================================================================

/// Closed set of sealed-product categories. Stored as kebab-case slugs in
/// the database (`Product.category` stays a `String` on the row; this enum
/// validates filter input and enumerates the legal values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    Blisters,
    BoosterBoxes,
    Boosters,
    BoxSets,
    EliteTrainerBoxes,
    ThemeDecks,
    Tins,
    TrainerKits,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 8] = [
        ProductCategory::Blisters,
        ProductCategory::BoosterBoxes,
        ProductCategory::Boosters,
        ProductCategory::BoxSets,
        ProductCategory::EliteTrainerBoxes,
        ProductCategory::ThemeDecks,
        ProductCategory::Tins,
        ProductCategory::TrainerKits,
    ];

    /// Database slug for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Blisters => "blisters",
            ProductCategory::BoosterBoxes => "booster-boxes",
            ProductCategory::Boosters => "boosters",
            ProductCategory::BoxSets => "box-sets",
            ProductCategory::EliteTrainerBoxes => "elite-trainer-boxes",
            ProductCategory::ThemeDecks => "theme-decks",
            ProductCategory::Tins => "tins",
            ProductCategory::TrainerKits => "trainer-kits",
        }
    }

    /// Human-readable label for display metadata.
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Blisters => "Blisters",
            ProductCategory::BoosterBoxes => "Booster Boxes",
            ProductCategory::Boosters => "Boosters",
            ProductCategory::BoxSets => "Box Sets",
            ProductCategory::EliteTrainerBoxes => "Elite Trainer Boxes",
            ProductCategory::ThemeDecks => "Theme Decks",
            ProductCategory::Tins => "Tins",
            ProductCategory::TrainerKits => "Trainer Kits",
        }
    }

    /// Parse a caller-supplied category label. Case-insensitive; accepts
    /// the slug ("booster-boxes"), the display label ("Booster Boxes"),
    /// and underscore spellings. Unknown labels are an input error, not a
    /// silently-ignored filter.
    pub fn parse(s: &str) -> Result<Self> {
        let slug = s.trim().to_lowercase().replace([' ', '_'], "-");
        for category in ProductCategory::ALL {
            if category.as_str() == slug {
                return Ok(category);
            }
        }
        Err(Error::InvalidInput(format!("unknown product category: {s}")))
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A graded card. Belongs to exactly one [`CardSet`].
///
/// `set_name` / `set_year` are join projections populated by every query
/// this subsystem issues; they ride along so index builds and suggestion
/// metadata need no second round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub name: String,
    /// Card number within its set ("25", "102a", "SP1"). Text, not numeric:
    /// promo and subset numbering is alphanumeric.
    pub number: String,
    pub variety: Option<String>,
    pub set_id: Uuid,
    pub pop_10: i32,
    pub pop_9: i32,
    pub pop_8: i32,
    pub total_population: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A card set (release). Parent of many [`Card`]s. Names are unique.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub id: Uuid,
    pub name: String,
    pub year: Option<i32>,
    pub card_count: i32,
    pub total_population: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sealed product. Optionally belongs to a [`SetProduct`] line.
///
/// `category` holds a [`ProductCategory`] slug; it stays a `String` on the
/// row and is validated at the filter boundary.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub available: i32,
    pub price: f64,
    pub set_product_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_product_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product line grouping ("Base Set", "Jungle"), parent of many
/// [`Product`]s. Plays the same role for products that [`CardSet`] plays
/// for cards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SetProduct {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// One search result document of any kind.
///
/// Serializes untagged so response payloads carry the plain entity object.
/// Variant order matters for deserialization: kinds with more required
/// fields are tried first so `SetProduct` (a subset of every other shape)
/// cannot shadow them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRecord {
    Card(Card),
    Product(Product),
    Set(CardSet),
    SetProduct(SetProduct),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Card(_) => EntityKind::Cards,
            EntityRecord::Product(_) => EntityKind::Products,
            EntityRecord::Set(_) => EntityKind::Sets,
            EntityRecord::SetProduct(_) => EntityKind::SetProducts,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EntityRecord::Card(c) => c.id,
            EntityRecord::Product(p) => p.id,
            EntityRecord::Set(s) => s.id,
            EntityRecord::SetProduct(sp) => sp.id,
        }
    }

    /// Primary display text (the entity's name).
    pub fn primary_text(&self) -> &str {
        match self {
            EntityRecord::Card(c) => &c.name,
            EntityRecord::Product(p) => &p.name,
            EntityRecord::Set(s) => &s.name,
            EntityRecord::SetProduct(sp) => &sp.name,
        }
    }

    /// All searchable text for this record, joined with spaces: the fields
    /// named by the kind's [`EntityProfile`], including the parent display
    /// name pulled in at query time.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let year_buf;
        match self {
            EntityRecord::Card(c) => {
                parts.push(&c.name);
                parts.push(&c.number);
                if let Some(v) = &c.variety {
                    parts.push(v);
                }
                if let Some(sn) = &c.set_name {
                    parts.push(sn);
                }
            }
            EntityRecord::Product(p) => {
                parts.push(&p.name);
                if let Some(spn) = &p.set_product_name {
                    parts.push(spn);
                }
                parts.push(&p.category);
            }
            EntityRecord::Set(s) => {
                parts.push(&s.name);
                if let Some(y) = s.year {
                    year_buf = y.to_string();
                    parts.push(&year_buf);
                }
            }
            EntityRecord::SetProduct(sp) => {
                parts.push(&sp.name);
            }
        }
        parts.join(" ")
    }

    /// The value compared by [`TieBreak::CardNumber`] ordering, when this
    /// kind has one.
    pub fn ordinal(&self) -> Option<&str> {
        match self {
            EntityRecord::Card(c) => Some(&c.number),
            _ => None,
        }
    }
}
