//! Media catalog vocabulary
//!
//! Item, person, and query types shared by the daemon and its adapters.
//! The catalog itself is externally owned; these types only describe what
//! it hands back and what may be asked of it.

use crate::names_match;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a library item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of library item a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Series,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movie",
            ItemKind::Series => "series",
        }
    }
}

/// Kind of artwork attached to an item or person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Primary,
    Backdrop,
    Logo,
    Thumb,
}

/// A single artwork reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemImage {
    pub kind: ImageKind,
    pub path: String,
}

impl ItemImage {
    pub fn primary(path: &str) -> Self {
        Self {
            kind: ImageKind::Primary,
            path: path.to_string(),
        }
    }
}

/// Role a person holds on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditKind {
    Actor,
    Director,
    Writer,
}

/// A person credited on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCredit {
    pub name: String,
    pub kind: CreditKind,
}

impl PersonCredit {
    pub fn new(name: &str, kind: CreditKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// A movie record as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub credits: Vec<PersonCredit>,
    #[serde(default)]
    pub images: Vec<ItemImage>,
    #[serde(default)]
    pub premiere_year: Option<i32>,
}

/// A series record as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub credits: Vec<PersonCredit>,
    #[serde(default)]
    pub images: Vec<ItemImage>,
    #[serde(default)]
    pub premiere_year: Option<i32>,
    #[serde(default)]
    pub ended: bool,
}

/// A library item of any supported kind, with shared accessors.
///
/// Collections mix movies and series freely; downstream code reads items
/// through the accessors and matches on the variant only when the kind
/// itself matters.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Movie(Movie),
    Series(Series),
}

impl CatalogItem {
    pub fn id(&self) -> ItemId {
        match self {
            CatalogItem::Movie(m) => m.id,
            CatalogItem::Series(s) => s.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogItem::Movie(_) => ItemKind::Movie,
            CatalogItem::Series(_) => ItemKind::Series,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.name,
            CatalogItem::Series(s) => &s.name,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            CatalogItem::Movie(m) => &m.tags,
            CatalogItem::Series(s) => &s.tags,
        }
    }

    pub fn genres(&self) -> &[String] {
        match self {
            CatalogItem::Movie(m) => &m.genres,
            CatalogItem::Series(s) => &s.genres,
        }
    }

    pub fn credits(&self) -> &[PersonCredit] {
        match self {
            CatalogItem::Movie(m) => &m.credits,
            CatalogItem::Series(s) => &s.credits,
        }
    }

    pub fn images(&self) -> &[ItemImage] {
        match self {
            CatalogItem::Movie(m) => &m.images,
            CatalogItem::Series(s) => &s.images,
        }
    }

    /// First primary image on the item, if any.
    pub fn primary_image(&self) -> Option<&ItemImage> {
        self.images().iter().find(|i| i.kind == ImageKind::Primary)
    }

    /// Whether the item satisfies a single query predicate.
    pub fn matches(&self, filter: &ItemFilter) -> bool {
        match filter {
            ItemFilter::Tag(term) => self.tags().iter().any(|t| names_match(t, term)),
            ItemFilter::Genre(term) => self.genres().iter().any(|g| names_match(g, term)),
            ItemFilter::Credit { person, kinds } => self
                .credits()
                .iter()
                .any(|c| kinds.contains(&c.kind) && names_match(&c.name, person)),
        }
    }
}

/// A person entry in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ItemImage>,
}

impl Person {
    pub fn primary_image(&self) -> Option<&ItemImage> {
        self.images.iter().find(|i| i.kind == ImageKind::Primary)
    }
}

/// One predicate a catalog query matches items against.
///
/// The catalog boundary takes exactly one predicate per call; callers
/// union or intersect results themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFilter {
    /// Tag equality, case-insensitive.
    Tag(String),
    /// Genre equality, case-insensitive.
    Genre(String),
    /// Credited person by exact name, restricted to the given roles.
    Credit {
        person: String,
        kinds: Vec<CreditKind>,
    },
}

impl ItemFilter {
    /// The free-text term behind the predicate, for logging and counting.
    pub fn term(&self) -> &str {
        match self {
            ItemFilter::Tag(t) | ItemFilter::Genre(t) => t,
            ItemFilter::Credit { person, .. } => person,
        }
    }
}

/// A single-predicate catalog query scoped to one item kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub kind: ItemKind,
    pub filter: ItemFilter,
}

impl CatalogQuery {
    pub fn tagged(kind: ItemKind, term: &str) -> Self {
        Self {
            kind,
            filter: ItemFilter::Tag(term.to_string()),
        }
    }

    pub fn genre(kind: ItemKind, term: &str) -> Self {
        Self {
            kind,
            filter: ItemFilter::Genre(term.to_string()),
        }
    }

    pub fn credited(kind: ItemKind, person: &str, kinds: Vec<CreditKind>) -> Self {
        Self {
            kind,
            filter: ItemFilter::Credit {
                person: person.to_string(),
                kinds,
            },
        }
    }
}

/// On-disk library snapshot consumed by the snapshot catalog adapter.
///
/// Also the backing structure of the fake catalog, so query semantics are
/// identical in production and in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl LibrarySnapshot {
    /// Items of the queried kind matching the predicate, in library order.
    pub fn query(&self, query: &CatalogQuery) -> Vec<CatalogItem> {
        let items: Vec<CatalogItem> = match query.kind {
            ItemKind::Movie => self.movies.iter().cloned().map(CatalogItem::Movie).collect(),
            ItemKind::Series => self.series.iter().cloned().map(CatalogItem::Series).collect(),
        };
        items
            .into_iter()
            .filter(|item| item.matches(&query.filter))
            .collect()
    }

    /// Person lookup by exact name, case-insensitive.
    pub fn find_person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| names_match(&p.name, name))
    }
}
