//! Representative artwork selection
//!
//! Picks one primary image for a collection from competing candidate
//! sources with a fixed priority, then issues at most one image write.
//! Nothing here can fail a rule: store rejections and lookup errors come
//! back as an `ArtworkOutcome` and are logged.

use crate::catalog::{CatalogError, MediaCatalog};
use crate::store::CollectionStore;
use curator_common::catalog::{CatalogItem, Person};
use curator_common::collection::Collection;
use curator_common::report::ArtworkOutcome;
use tracing::{debug, info, warn};

/// Selects and applies collection artwork.
pub struct ArtworkSelector<'a> {
    catalog: &'a dyn MediaCatalog,
    store: &'a dyn CollectionStore,
}

impl<'a> ArtworkSelector<'a> {
    pub fn new(catalog: &'a dyn MediaCatalog, store: &'a dyn CollectionStore) -> Self {
        Self { catalog, store }
    }

    /// Pick one representative image and write it if it differs from the
    /// collection's current primary image.
    ///
    /// Candidate priority, first hit wins:
    /// 1. the anchor person's primary image
    /// 2. a library person whose name equals the collection's name
    /// 3. the first member item with a primary image, in catalog order
    ///
    /// `members` is the converged membership in catalog order.
    pub async fn apply(
        &self,
        collection: &Collection,
        anchor: Option<&Person>,
        members: &[CatalogItem],
    ) -> ArtworkOutcome {
        let candidate = match self.pick(collection, anchor, members).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(
                    "Artwork lookup failed for collection '{}': {}",
                    collection.name, e
                );
                return ArtworkOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let Some(path) = candidate else {
            debug!("No artwork candidate for collection '{}'", collection.name);
            return ArtworkOutcome::NoCandidate;
        };

        if collection.primary_image.as_deref() == Some(path.as_str()) {
            debug!(
                "Collection '{}' already uses {}, skipping image write",
                collection.name, path
            );
            return ArtworkOutcome::Unchanged;
        }

        match self.store.set_primary_image(collection.id, &path).await {
            Ok(()) => {
                info!("Set artwork for collection '{}' from {}", collection.name, path);
                ArtworkOutcome::Applied { path }
            }
            Err(e) => {
                warn!(
                    "Artwork update failed for collection '{}': {}",
                    collection.name, e
                );
                ArtworkOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn pick(
        &self,
        collection: &Collection,
        anchor: Option<&Person>,
        members: &[CatalogItem],
    ) -> Result<Option<String>, CatalogError> {
        if let Some(person) = anchor {
            if let Some(image) = person.primary_image() {
                debug!(
                    "Using anchor person '{}' artwork for '{}'",
                    person.name, collection.name
                );
                return Ok(Some(image.path.clone()));
            }
        }

        // The collection title itself may name a person even when no rule
        // term anchored, e.g. an explicit title set by the operator.
        if let Some(person) = self.catalog.find_person(&collection.name).await? {
            if let Some(image) = person.primary_image() {
                debug!(
                    "Using title person '{}' artwork for '{}'",
                    person.name, collection.name
                );
                return Ok(Some(image.path.clone()));
            }
        }

        for item in members {
            if let Some(image) = item.primary_image() {
                debug!(
                    "Using member '{}' artwork for '{}'",
                    item.name(),
                    collection.name
                );
                return Ok(Some(image.path.clone()));
            }
        }

        Ok(None)
    }
}
