//! Pass reports
//!
//! What a reconciliation pass did, per rule and in aggregate. A pass
//! itself always completes; these types are how callers see which rules
//! fared badly inside it.

use serde::{Deserialize, Serialize};

/// Outcome of the artwork step for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ArtworkOutcome {
    /// A new primary image was written.
    Applied { path: String },
    /// The selected image is already set; nothing was written.
    Unchanged,
    /// No candidate anywhere in the chain; not an error.
    NoCandidate,
    /// The store refused the image write; the rule itself still synced.
    Failed { error: String },
}

/// How a single rule fared in a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RuleDisposition {
    /// Membership converged to the wanted set.
    Synced {
        added: usize,
        removed: usize,
        artwork: ArtworkOutcome,
    },
    /// Rule was not actionable; nothing was created.
    Skipped { reason: String },
    /// Rule aborted part-way; later rules still ran.
    Failed { error: String },
}

/// Per-rule slice of a pass report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    /// Collection title, or a positional label when none derives.
    pub title: String,
    pub disposition: RuleDisposition,
}

/// Aggregate of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// RFC 3339 start timestamp
    pub started_at: String,
    pub duration_secs: f64,
    pub rules: Vec<RuleReport>,
    /// True when shutdown cut the pass short between rules
    pub interrupted: bool,
}

impl PassReport {
    pub fn synced_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.disposition, RuleDisposition::Synced { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.disposition, RuleDisposition::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.disposition, RuleDisposition::Failed { .. }))
            .count()
    }

    /// Total items added across synced rules.
    pub fn items_added(&self) -> usize {
        self.rules
            .iter()
            .map(|r| match r.disposition {
                RuleDisposition::Synced { added, .. } => added,
                _ => 0,
            })
            .sum()
    }

    /// Total items removed across synced rules.
    pub fn items_removed(&self) -> usize {
        self.rules
            .iter()
            .map(|r| match r.disposition {
                RuleDisposition::Synced { removed, .. } => removed,
                _ => 0,
            })
            .sum()
    }

    /// Compact form kept on the daemon for status answers.
    pub fn summary(&self) -> PassSummary {
        PassSummary {
            started_at: self.started_at.clone(),
            duration_secs: self.duration_secs,
            synced: self.synced_count(),
            skipped: self.skipped_count(),
            failed: self.failed_count(),
            items_added: self.items_added(),
            items_removed: self.items_removed(),
            interrupted: self.interrupted,
        }
    }
}

/// Compact pass summary for status answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub started_at: String,
    pub duration_secs: f64,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items_added: usize,
    pub items_removed: usize,
    pub interrupted: bool,
}
