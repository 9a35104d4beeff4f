//! Shared types for the curator daemon and control CLI.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod ipc;
pub mod report;
pub mod rules;

pub use catalog::{
    CatalogItem, CatalogQuery, CreditKind, ImageKind, ItemFilter, ItemId, ItemImage, ItemKind,
    LibrarySnapshot, Movie, Person, PersonCredit, Series,
};
pub use collection::{Collection, CollectionId, DisplayOrder, NewCollection, MANAGED_TAG};
pub use config::{Config, SOCKET_PATH};
pub use report::{ArtworkOutcome, PassReport, PassSummary, RuleDisposition, RuleReport};
pub use rules::{MatchMode, MatchRule};

/// Case-insensitive, whitespace-trimmed name equality.
///
/// Used everywhere two library names are compared: tags, genres, person
/// names, and collection titles.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
