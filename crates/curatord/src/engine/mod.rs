//! Sync engine
//!
//! Orchestrates one reconciliation pass: per rule, resolve the managed
//! collection, evaluate the wanted set, converge membership, then pick
//! artwork. Rule failures are isolated; the pass runs every rule to the
//! end of the list unless shutdown is requested between rules.

pub mod artwork;
pub mod evaluator;
pub mod reconcile;

pub use artwork::ArtworkSelector;
pub use evaluator::{Evaluation, PredicateBasis, RuleEvaluator};
pub use reconcile::{MembershipDelta, Reconciler};

use crate::catalog::{CatalogError, MediaCatalog};
use crate::store::{CollectionStore, StoreError};
use chrono::Utc;
use curator_common::collection::NewCollection;
use curator_common::report::{PassReport, RuleDisposition, RuleReport};
use curator_common::rules::MatchRule;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// Error from one rule's sync attempt; caught at the pass boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs reconciliation passes over a configured rule set.
///
/// Rules are fixed at construction; the catalog and store are the only
/// state read at run time, so every pass recomputes membership from
/// scratch.
pub struct SyncEngine {
    rules: Vec<MatchRule>,
    catalog: Arc<dyn MediaCatalog>,
    store: Arc<dyn CollectionStore>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl SyncEngine {
    pub fn new(
        rules: Vec<MatchRule>,
        catalog: Arc<dyn MediaCatalog>,
        store: Arc<dyn CollectionStore>,
    ) -> Self {
        Self {
            rules,
            catalog,
            store,
            shutdown: None,
        }
    }

    /// Observe a shutdown flag between rules; a pass in flight finishes
    /// its current rule and stops before the next one.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run one full reconciliation pass.
    ///
    /// Always returns a report; per-rule failures land in the report and
    /// the logs, never in a pass-level error.
    pub async fn run_pass(&self) -> PassReport {
        let started_at = Utc::now().to_rfc3339();
        let start = Instant::now();
        let mut rules = Vec::new();
        let mut interrupted = false;

        info!("Reconciliation pass starting: {} rules", self.rules.len());
        for (idx, rule) in self.rules.iter().enumerate() {
            if self.shutdown_requested() {
                warn!(
                    "Shutdown requested, stopping pass after {} of {} rules",
                    idx,
                    self.rules.len()
                );
                interrupted = true;
                break;
            }

            let title = rule
                .display_title()
                .unwrap_or_else(|| format!("rule {}", idx + 1));
            let disposition = match self.sync_rule(&title, rule).await {
                Ok(disposition) => disposition,
                Err(e) => {
                    error!("Rule '{}' failed: {}", title, e);
                    RuleDisposition::Failed {
                        error: e.to_string(),
                    }
                }
            };
            rules.push(RuleReport { title, disposition });
        }

        let report = PassReport {
            started_at,
            duration_secs: start.elapsed().as_secs_f64(),
            rules,
            interrupted,
        };
        info!(
            "Reconciliation pass finished in {:.2}s: {} synced, {} skipped, {} failed",
            report.duration_secs,
            report.synced_count(),
            report.skipped_count(),
            report.failed_count()
        );
        report
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// Sync one rule end to end.
    async fn sync_rule(&self, title: &str, rule: &MatchRule) -> Result<RuleDisposition, SyncError> {
        if !rule.is_actionable() {
            return self.clear_stale(rule).await;
        }

        let collection = match self.store.find_managed(title).await? {
            Some(existing) => existing,
            None => {
                info!("Creating collection '{}'", title);
                self.store.create(NewCollection::managed(title)).await?
            }
        };

        let evaluation = RuleEvaluator::new(self.catalog.as_ref())
            .evaluate(rule)
            .await?;
        info!("Rule '{}' wants {} items", title, evaluation.items.len());

        let (added, removed) = Reconciler::new(self.store.as_ref())
            .reconcile(&collection, &evaluation.ids())
            .await?;

        let artwork = ArtworkSelector::new(self.catalog.as_ref(), self.store.as_ref())
            .apply(&collection, evaluation.anchor(), &evaluation.items)
            .await;

        Ok(RuleDisposition::Synced {
            added,
            removed,
            artwork,
        })
    }

    /// A rule with no usable terms never creates a collection and never
    /// touches artwork, but a titled one still clears members left over
    /// from when the rule had terms.
    async fn clear_stale(&self, rule: &MatchRule) -> Result<RuleDisposition, SyncError> {
        let Some(title) = rule.display_title() else {
            warn!("Skipping rule with no usable terms and no title");
            return Ok(RuleDisposition::Skipped {
                reason: "no usable terms".to_string(),
            });
        };

        match self.store.find_managed(&title).await? {
            Some(collection) if !collection.members.is_empty() => {
                let (_, removed) = Reconciler::new(self.store.as_ref())
                    .reconcile(&collection, &[])
                    .await?;
                warn!(
                    "Rule '{}' has no usable terms; cleared {} stale members",
                    title, removed
                );
                Ok(RuleDisposition::Skipped {
                    reason: format!("no usable terms ({} stale members removed)", removed),
                })
            }
            _ => {
                warn!("Rule '{}' has no usable terms, skipping", title);
                Ok(RuleDisposition::Skipped {
                    reason: "no usable terms".to_string(),
                })
            }
        }
    }
}
