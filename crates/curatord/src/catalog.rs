//! Media catalog boundary
//!
//! Trait abstraction over the library catalog so the engine can be
//! driven deterministically in tests:
//! - No filesystem reads required for testing
//! - Injectable failures for error-isolation coverage
//!
//! Production code uses `SnapshotCatalog`, which serves queries from a
//! JSON library snapshot on disk. Test code uses `FakeCatalog` with
//! canned items.

use async_trait::async_trait;
use curator_common::catalog::{
    CatalogItem, CatalogQuery, ItemKind, LibrarySnapshot, Movie, Person, Series,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read library snapshot {path}: {source}")]
    SnapshotRead {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse library snapshot {path}: {source}")]
    SnapshotParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("catalog query failed: {0}")]
    Query(String),
}

// ============================================================================
// Media Catalog Trait
// ============================================================================

/// Read-only view of the media library.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Items of one kind matching a single predicate, in library order.
    async fn query_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>, CatalogError>;

    /// Person lookup by exact name, case-insensitive.
    async fn find_person(&self, name: &str) -> Result<Option<Person>, CatalogError>;
}

// ============================================================================
// Snapshot Catalog (Production)
// ============================================================================

/// Catalog adapter over an on-disk JSON library snapshot.
///
/// The snapshot is re-read per call so an externally refreshed file is
/// picked up mid-pass without a daemon restart.
pub struct SnapshotCatalog {
    path: PathBuf,
}

impl SnapshotCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<LibrarySnapshot, CatalogError> {
        let path = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::SnapshotRead {
                path: path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| CatalogError::SnapshotParse { path, source })
    }
}

#[async_trait]
impl MediaCatalog for SnapshotCatalog {
    async fn query_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        let snapshot = self.load().await?;
        let items = snapshot.query(query);
        debug!(
            "Snapshot query {}:'{}' matched {} items",
            query.kind.as_str(),
            query.filter.term(),
            items.len()
        );
        Ok(items)
    }

    async fn find_person(&self, name: &str) -> Result<Option<Person>, CatalogError> {
        let snapshot = self.load().await?;
        Ok(snapshot.find_person(name).cloned())
    }
}

// ============================================================================
// Fake Catalog (Testing)
// ============================================================================

/// Fake catalog for deterministic testing
///
/// Serves canned items through the same snapshot query logic production
/// uses, tracks per-term call counts, and can be poisoned to fail on
/// chosen terms.
pub struct FakeCatalog {
    snapshot: LibrarySnapshot,
    /// Terms whose queries and person lookups fail
    fail_terms: Vec<String>,
    /// Track call counts for assertions
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeCatalog {
    /// Create an empty fake catalog
    pub fn new() -> Self {
        Self::with_snapshot(LibrarySnapshot::default())
    }

    pub fn with_snapshot(snapshot: LibrarySnapshot) -> Self {
        Self {
            snapshot,
            fail_terms: vec![],
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a movie to the backing snapshot
    pub fn with_movie(mut self, movie: Movie) -> Self {
        self.snapshot.movies.push(movie);
        self
    }

    /// Add a series to the backing snapshot
    pub fn with_series(mut self, series: Series) -> Self {
        self.snapshot.series.push(series);
        self
    }

    /// Add a person to the backing snapshot
    pub fn with_person(mut self, person: Person) -> Self {
        self.snapshot.people.push(person);
        self
    }

    /// Make every query and person lookup mentioning this term fail
    pub fn fail_on_term(mut self, term: &str) -> Self {
        self.fail_terms.push(term.to_lowercase());
        self
    }

    /// Number of item queries issued for a kind and term
    pub fn query_count(&self, kind: ItemKind, term: &str) -> usize {
        self.count_for(&Self::query_key(kind, term))
    }

    /// Number of person lookups issued for a name
    pub fn person_lookup_count(&self, name: &str) -> usize {
        self.count_for(&Self::person_key(name))
    }

    /// Total calls across all queries and lookups
    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    fn count_for(&self, key: &str) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, key: String) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(key).or_insert(0) += 1;
    }

    fn poisoned(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.fail_terms.iter().any(|t| *t == term)
    }

    fn query_key(kind: ItemKind, term: &str) -> String {
        format!("{}:{}", kind.as_str(), term.trim().to_lowercase())
    }

    fn person_key(name: &str) -> String {
        format!("person:{}", name.trim().to_lowercase())
    }
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaCatalog for FakeCatalog {
    async fn query_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        let term = query.filter.term();
        self.record(Self::query_key(query.kind, term));
        if self.poisoned(term) {
            return Err(CatalogError::Query(format!(
                "injected failure for term '{}'",
                term
            )));
        }
        Ok(self.snapshot.query(query))
    }

    async fn find_person(&self, name: &str) -> Result<Option<Person>, CatalogError> {
        self.record(Self::person_key(name));
        if self.poisoned(name) {
            return Err(CatalogError::Query(format!(
                "injected failure for term '{}'",
                name
            )));
        }
        Ok(self.snapshot.find_person(name).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================
