//! Membership reconciliation
//!
//! Converges a collection's stored membership to a freshly computed
//! wanted set. Collection state is never the source of truth here; the
//! delta is recomputed from scratch on every pass.

use crate::store::{CollectionStore, StoreError};
use curator_common::catalog::ItemId;
use curator_common::collection::Collection;
use std::collections::HashSet;
use tracing::info;

/// Add/remove delta between current membership and a wanted set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipDelta {
    pub to_add: Vec<ItemId>,
    pub to_remove: Vec<ItemId>,
}

impl MembershipDelta {
    /// Diff current membership against the wanted identity set.
    ///
    /// Both vectors keep their input order so mutation requests are
    /// deterministic for the same inputs.
    pub fn compute(existing: &[ItemId], wanted: &[ItemId]) -> Self {
        let existing_set: HashSet<ItemId> = existing.iter().copied().collect();
        let wanted_set: HashSet<ItemId> = wanted.iter().copied().collect();
        Self {
            to_add: wanted
                .iter()
                .filter(|id| !existing_set.contains(id))
                .copied()
                .collect(),
            to_remove: existing
                .iter()
                .filter(|id| !wanted_set.contains(id))
                .copied()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Applies membership deltas through the collection store.
pub struct Reconciler<'a> {
    store: &'a dyn CollectionStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn CollectionStore) -> Self {
        Self { store }
    }

    /// Converge membership to the wanted set.
    ///
    /// Issues at most one removal and one addition request; empty deltas
    /// issue nothing at all. Returns `(added, removed)` counts.
    pub async fn reconcile(
        &self,
        collection: &Collection,
        wanted: &[ItemId],
    ) -> Result<(usize, usize), StoreError> {
        let delta = MembershipDelta::compute(&collection.members, wanted);
        if delta.is_empty() {
            return Ok((0, 0));
        }
        if !delta.to_remove.is_empty() {
            info!(
                "Removing {} items from collection '{}'",
                delta.to_remove.len(),
                collection.name
            );
            self.store
                .remove_members(collection.id, &delta.to_remove)
                .await?;
        }
        if !delta.to_add.is_empty() {
            info!(
                "Adding {} items to collection '{}'",
                delta.to_add.len(),
                collection.name
            );
            self.store.add_members(collection.id, &delta.to_add).await?;
        }
        Ok((delta.to_add.len(), delta.to_remove.len()))
    }
}
