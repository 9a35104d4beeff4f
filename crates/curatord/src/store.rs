//! Collection store boundary
//!
//! Trait abstraction over collection storage. The store owns collection
//! state; the engine only observes it and requests deltas.
//!
//! Production code uses `JsonCollectionStore`, a single JSON file with
//! read-modify-write cycles serialized behind an async mutex. Test code
//! uses `FakeCollectionStore`, which keeps collections in memory and
//! records every mutation for assertions.

use async_trait::async_trait;
use curator_common::catalog::ItemId;
use curator_common::collection::{Collection, CollectionId, NewCollection};
use curator_common::names_match;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by collection storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read collections file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write collections file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse collections file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("no collection with id {0}")]
    NotFound(CollectionId),

    #[error("collection store rejected the mutation: {0}")]
    Rejected(String),
}

// ============================================================================
// Collection Store Trait
// ============================================================================

/// Owning interface to collection storage.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Find a curator-managed collection by display name.
    ///
    /// Collections without the marker tag are invisible here, so a user
    /// collection with the same name is never touched.
    async fn find_managed(&self, name: &str) -> Result<Option<Collection>, StoreError>;

    /// Create a collection and return its stored form.
    async fn create(&self, new: NewCollection) -> Result<Collection, StoreError>;

    /// Add members; identities already present are ignored.
    async fn add_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError>;

    /// Remove members; identities not present are ignored.
    async fn remove_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError>;

    /// Set the collection's primary image path.
    async fn set_primary_image(&self, id: CollectionId, path: &str) -> Result<(), StoreError>;
}

// ============================================================================
// JSON Collection Store (Production)
// ============================================================================

/// On-disk format of the collections file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionsFile {
    #[serde(default)]
    collections: Vec<Collection>,
}

/// Store adapter over a single JSON collections file.
pub struct JsonCollectionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    guard: tokio::sync::Mutex<()>,
}

impl JsonCollectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_file(&self) -> Result<CollectionsFile, StoreError> {
        let path = self.path.display().to_string();
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| StoreError::Parse { path, source })
            }
            // A store that does not exist yet is just empty
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionsFile::default()),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn write_file(&self, file: &CollectionsFile) -> Result<(), StoreError> {
        let path = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: path.clone(),
                    source,
                })?;
        }
        let content = serde_json::to_string_pretty(file).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Write { path, source })
    }

    /// Read, apply one collection mutation, write back.
    async fn mutate<F>(&self, id: CollectionId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Collection),
    {
        let _guard = self.guard.lock().await;
        let mut file = self.read_file().await?;
        let collection = file
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))?;
        apply(collection);
        self.write_file(&file).await
    }
}

#[async_trait]
impl CollectionStore for JsonCollectionStore {
    async fn find_managed(&self, name: &str) -> Result<Option<Collection>, StoreError> {
        let _guard = self.guard.lock().await;
        let file = self.read_file().await?;
        Ok(file
            .collections
            .into_iter()
            .find(|c| c.is_managed() && names_match(&c.name, name)))
    }

    async fn create(&self, new: NewCollection) -> Result<Collection, StoreError> {
        let _guard = self.guard.lock().await;
        let mut file = self.read_file().await?;
        let collection = Collection {
            id: CollectionId::new(),
            name: new.name,
            locked: new.locked,
            display_order: new.display_order,
            tags: new.tags,
            members: vec![],
            primary_image: None,
        };
        info!("Created collection '{}' ({})", collection.name, collection.id);
        file.collections.push(collection.clone());
        self.write_file(&file).await?;
        Ok(collection)
    }

    async fn add_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError> {
        self.mutate(id, |collection| {
            for item in items {
                if !collection.members.contains(item) {
                    collection.members.push(*item);
                }
            }
        })
        .await
    }

    async fn remove_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError> {
        self.mutate(id, |collection| {
            collection.members.retain(|m| !items.contains(m));
        })
        .await
    }

    async fn set_primary_image(&self, id: CollectionId, path: &str) -> Result<(), StoreError> {
        let path = path.to_string();
        self.mutate(id, move |collection| {
            debug!("Setting primary image on '{}'", collection.name);
            collection.primary_image = Some(path);
        })
        .await
    }
}

// ============================================================================
// Fake Collection Store (Testing)
// ============================================================================

/// A recorded store mutation, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Created { name: String },
    MembersAdded { name: String, items: Vec<ItemId> },
    MembersRemoved { name: String, items: Vec<ItemId> },
    ImageSet { name: String, path: String },
}

/// Fake store for deterministic testing
///
/// Keeps collections in memory and logs every mutation. With
/// `reject_mutations` set, all writes fail while reads keep working,
/// which drives the mutation-failure paths.
pub struct FakeCollectionStore {
    collections: Mutex<Vec<Collection>>,
    ops: Mutex<Vec<StoreOp>>,
    reject_mutations: AtomicBool,
}

impl FakeCollectionStore {
    pub fn new() -> Self {
        Self::with_collections(vec![])
    }

    pub fn with_collections(collections: Vec<Collection>) -> Self {
        Self {
            collections: Mutex::new(collections),
            ops: Mutex::new(vec![]),
            reject_mutations: AtomicBool::new(false),
        }
    }

    /// Make every mutation fail from now on
    pub fn set_reject_mutations(&self, reject: bool) {
        self.reject_mutations.store(reject, Ordering::Relaxed);
    }

    /// All mutations recorded so far, in order
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Number of mutations recorded so far
    pub fn mutation_count(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    /// Current state of a collection by name, managed or not
    pub fn collection_named(&self, name: &str) -> Option<Collection> {
        self.collections
            .lock()
            .unwrap()
            .iter()
            .find(|c| names_match(&c.name, name))
            .cloned()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.lock().unwrap().len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.reject_mutations.load(Ordering::Relaxed) {
            return Err(StoreError::Rejected("mutations disabled".to_string()));
        }
        Ok(())
    }

    fn record(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn name_of(&self, id: CollectionId) -> Result<String, StoreError> {
        self.collections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .ok_or(StoreError::NotFound(id))
    }
}

impl Default for FakeCollectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollectionStore for FakeCollectionStore {
    async fn find_managed(&self, name: &str) -> Result<Option<Collection>, StoreError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.is_managed() && names_match(&c.name, name))
            .cloned())
    }

    async fn create(&self, new: NewCollection) -> Result<Collection, StoreError> {
        self.check_writable()?;
        let collection = Collection {
            id: CollectionId::new(),
            name: new.name,
            locked: new.locked,
            display_order: new.display_order,
            tags: new.tags,
            members: vec![],
            primary_image: None,
        };
        self.record(StoreOp::Created {
            name: collection.name.clone(),
        });
        self.collections.lock().unwrap().push(collection.clone());
        Ok(collection)
    }

    async fn add_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = self.name_of(id)?;
        {
            let mut collections = self.collections.lock().unwrap();
            let collection = collections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::NotFound(id))?;
            for item in items {
                if !collection.members.contains(item) {
                    collection.members.push(*item);
                }
            }
        }
        self.record(StoreOp::MembersAdded {
            name,
            items: items.to_vec(),
        });
        Ok(())
    }

    async fn remove_members(&self, id: CollectionId, items: &[ItemId]) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = self.name_of(id)?;
        {
            let mut collections = self.collections.lock().unwrap();
            let collection = collections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::NotFound(id))?;
            collection.members.retain(|m| !items.contains(m));
        }
        self.record(StoreOp::MembersRemoved {
            name,
            items: items.to_vec(),
        });
        Ok(())
    }

    async fn set_primary_image(&self, id: CollectionId, path: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = self.name_of(id)?;
        {
            let mut collections = self.collections.lock().unwrap();
            let collection = collections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::NotFound(id))?;
            collection.primary_image = Some(path.to_string());
        }
        self.record(StoreOp::ImageSet {
            name,
            path: path.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use curator_common::collection::MANAGED_TAG;

    #[tokio::test]
    async fn test_fake_store_create_and_find() {
        let store = FakeCollectionStore::new();
        let created = store
            .create(NewCollection::managed("Christmas Collection"))
            .await
            .unwrap();
        assert!(created.locked);
        assert!(created.members.is_empty());

        let found = store
            .find_managed("christmas collection")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(store.ops().len(), 1);
    }

    #[tokio::test]
    async fn test_fake_store_ignores_unmanaged_collections() {
        let unmanaged = Collection {
            id: CollectionId::new(),
            name: "Christmas Collection".to_string(),
            locked: false,
            display_order: Default::default(),
            tags: vec![],
            members: vec![],
            primary_image: None,
        };
        let store = FakeCollectionStore::with_collections(vec![unmanaged]);
        assert!(store
            .find_managed("Christmas Collection")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fake_store_membership_mutations() {
        let store = FakeCollectionStore::new();
        let collection = store.create(NewCollection::managed("C")).await.unwrap();
        let a = ItemId::new();
        let b = ItemId::new();

        store.add_members(collection.id, &[a, b, a]).await.unwrap();
        assert_eq!(store.collection_named("C").unwrap().members, vec![a, b]);

        store.remove_members(collection.id, &[a]).await.unwrap();
        assert_eq!(store.collection_named("C").unwrap().members, vec![b]);
    }

    #[tokio::test]
    async fn test_fake_store_rejects_when_read_only() {
        let store = FakeCollectionStore::new();
        let collection = store.create(NewCollection::managed("C")).await.unwrap();
        store.set_reject_mutations(true);

        let err = store
            .add_members(collection.id, &[ItemId::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        // Reads still work, and the rejected op was not recorded
        assert!(store.find_managed("C").await.unwrap().is_some());
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collections.json");
        let store = JsonCollectionStore::new(&path);

        let created = store
            .create(NewCollection::managed("Halloween Collection"))
            .await
            .unwrap();
        let item = ItemId::new();
        store.add_members(created.id, &[item]).await.unwrap();
        store
            .set_primary_image(created.id, "/img/pumpkin.jpg")
            .await
            .unwrap();

        // A second adapter over the same file sees the committed state
        let reopened = JsonCollectionStore::new(&path);
        let found = reopened
            .find_managed("Halloween Collection")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.members, vec![item]);
        assert_eq!(found.primary_image.as_deref(), Some("/img/pumpkin.jpg"));
        assert!(found.tags.contains(&MANAGED_TAG.to_string()));
    }

    #[tokio::test]
    async fn test_json_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCollectionStore::new(dir.path().join("missing.json"));
        assert!(store.find_managed("Anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_store_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCollectionStore::new(dir.path().join("collections.json"));
        let err = store
            .add_members(CollectionId::new(), &[ItemId::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
