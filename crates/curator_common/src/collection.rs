//! Collection model
//!
//! Collections are externally owned; the daemon only observes them and
//! requests deltas through the store boundary. The marker tag separates
//! curator-managed collections from user-created ones with the same name.

use crate::catalog::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tag identifying a collection as curator-managed.
pub const MANAGED_TAG: &str = "curator-managed";

/// Stable identity of a collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CollectionId(pub Uuid);

impl CollectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation order of a collection's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOrder {
    #[default]
    Default,
    SortName,
    PremiereDate,
}

/// A collection as the store reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub locked: bool,
    pub display_order: DisplayOrder,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub members: Vec<ItemId>,
    #[serde(default)]
    pub primary_image: Option<String>,
}

impl Collection {
    pub fn is_managed(&self) -> bool {
        self.tags.iter().any(|t| t == MANAGED_TAG)
    }
}

/// Creation request handed to the collection store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub locked: bool,
    pub display_order: DisplayOrder,
    pub tags: Vec<String>,
}

impl NewCollection {
    /// Managed-collection defaults: locked against manual edits, marker
    /// tag applied, members shown in premiere order.
    pub fn managed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            locked: true,
            display_order: DisplayOrder::PremiereDate,
            tags: vec![MANAGED_TAG.to_string()],
        }
    }
}
