//! Match rules
//!
//! A rule names the terms a collection gathers and how they combine.
//! Membership is never stored against the rule; every pass recomputes it
//! from the catalog.

use serde::{Deserialize, Serialize};

/// How a rule's terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Union: an item matching any term is wanted.
    #[default]
    Any,
    /// Intersection: an item must match every term.
    All,
}

/// One smart-collection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    /// Ordered match terms; order decides anchor precedence.
    pub terms: Vec<String>,
    pub mode: MatchMode,
    /// Explicit collection title; overrides the derived one.
    pub title: Option<String>,
}

impl MatchRule {
    /// Build a rule from raw terms: trims each, drops empties, and
    /// deduplicates case-insensitively preserving first occurrence.
    pub fn new(terms: Vec<String>, mode: MatchMode, title: Option<String>) -> Self {
        let mut seen: Vec<String> = Vec::new();
        let mut normalized = Vec::new();
        for term in terms {
            let trimmed = term.trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = trimmed.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            normalized.push(trimmed.to_string());
        }
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            terms: normalized,
            mode,
            title,
        }
    }

    /// Single-term OR rule, the common case.
    pub fn any(term: &str) -> Self {
        Self::new(vec![term.to_string()], MatchMode::Any, None)
    }

    /// Whether the rule can produce members at all.
    pub fn is_actionable(&self) -> bool {
        !self.terms.is_empty()
    }

    /// Title the rule's collection carries.
    ///
    /// An explicit title always wins. Otherwise the title derives from the
    /// first term; `All` rules with several terms get a distinct format so
    /// a reader can tell intersection semantics apart. Returns `None` only
    /// when there is nothing to derive from.
    pub fn display_title(&self) -> Option<String> {
        if let Some(title) = &self.title {
            return Some(title.clone());
        }
        let first = self.terms.first()?;
        let name = title_case_words(first);
        match self.mode {
            MatchMode::All if self.terms.len() > 1 => Some(format!("{} (strict) Collection", name)),
            _ => Some(format!("{} Collection", name)),
        }
    }
}

/// Title-case each whitespace-separated word of a term.
fn title_case_words(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
