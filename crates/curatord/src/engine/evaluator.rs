//! Rule evaluation
//!
//! Resolves one match rule into the set of catalog items currently
//! satisfying it. Pure reads; membership convergence happens later in
//! the reconciler.

use crate::catalog::{CatalogError, MediaCatalog};
use curator_common::catalog::{
    CatalogItem, CatalogQuery, CreditKind, ItemId, ItemKind, Person,
};
use curator_common::rules::{MatchMode, MatchRule};
use std::collections::HashSet;
use tracing::{debug, info};

/// What a rule's terms are matched against.
///
/// Resolved once per rule, before any term is evaluated. When a term
/// names a library person who has a primary image, the whole rule
/// matches by that person's credits; otherwise each term matches by tag
/// or genre. Switching to per-term anchoring would mean resolving this
/// inside the term loop instead of here.
#[derive(Debug)]
pub enum PredicateBasis {
    /// Every term resolves to items crediting this person
    Credits(Person),
    /// Every term resolves to items tagged or genred with it
    TagOrGenre,
}

impl PredicateBasis {
    /// Resolve the basis for a rule: first term naming a person with a
    /// primary image wins; later terms are not considered.
    pub async fn resolve(
        catalog: &dyn MediaCatalog,
        rule: &MatchRule,
    ) -> Result<Self, CatalogError> {
        for term in &rule.terms {
            if let Some(person) = catalog.find_person(term).await? {
                if person.primary_image().is_some() {
                    info!(
                        "Term '{}' names person '{}'; matching rule by credits",
                        term, person.name
                    );
                    return Ok(PredicateBasis::Credits(person));
                }
                debug!("Person '{}' has no primary image, not anchoring", person.name);
            }
        }
        Ok(PredicateBasis::TagOrGenre)
    }
}

/// Result of evaluating one rule.
#[derive(Debug)]
pub struct Evaluation {
    pub basis: PredicateBasis,
    /// Wanted items in catalog order, deduplicated by identity
    pub items: Vec<CatalogItem>,
}

impl Evaluation {
    /// The anchor person, when the rule matched by credits.
    pub fn anchor(&self) -> Option<&Person> {
        match &self.basis {
            PredicateBasis::Credits(person) => Some(person),
            PredicateBasis::TagOrGenre => None,
        }
    }

    /// Wanted identities, for reconciliation.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.id()).collect()
    }
}

/// Evaluates match rules against a catalog.
pub struct RuleEvaluator<'a> {
    catalog: &'a dyn MediaCatalog,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(catalog: &'a dyn MediaCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve the full wanted set for a rule.
    ///
    /// `Any` unions per-term results; `All` intersects them and stops
    /// querying once the running set is empty. A term matching nothing is
    /// not an error.
    pub async fn evaluate(&self, rule: &MatchRule) -> Result<Evaluation, CatalogError> {
        let basis = PredicateBasis::resolve(self.catalog, rule).await?;

        let mut combined: Option<Vec<CatalogItem>> = None;
        for term in &rule.terms {
            let matched = self.term_matches(term, &basis).await?;
            debug!("Term '{}' matched {} items", term, matched.len());
            combined = Some(match combined {
                None => matched,
                Some(acc) => match rule.mode {
                    MatchMode::Any => union(acc, matched),
                    MatchMode::All => intersect(acc, matched),
                },
            });
            if rule.mode == MatchMode::All && combined.as_ref().map_or(false, |c| c.is_empty()) {
                break;
            }
        }

        Ok(Evaluation {
            basis,
            items: combined.unwrap_or_default(),
        })
    }

    /// Items matching one term under the resolved basis, across both
    /// item kinds, deduplicated by identity.
    async fn term_matches(
        &self,
        term: &str,
        basis: &PredicateBasis,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut items: Vec<CatalogItem> = Vec::new();
        let mut seen: HashSet<ItemId> = HashSet::new();
        for kind in [ItemKind::Movie, ItemKind::Series] {
            let queries = match basis {
                PredicateBasis::Credits(person) => vec![CatalogQuery::credited(
                    kind,
                    &person.name,
                    vec![CreditKind::Actor, CreditKind::Director],
                )],
                PredicateBasis::TagOrGenre => vec![
                    CatalogQuery::tagged(kind, term),
                    CatalogQuery::genre(kind, term),
                ],
            };
            for query in queries {
                for item in self.catalog.query_items(&query).await? {
                    if seen.insert(item.id()) {
                        items.push(item);
                    }
                }
            }
        }
        Ok(items)
    }
}

/// Union preserving first-seen order.
fn union(mut acc: Vec<CatalogItem>, extra: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut seen: HashSet<ItemId> = acc.iter().map(|i| i.id()).collect();
    for item in extra {
        if seen.insert(item.id()) {
            acc.push(item);
        }
    }
    acc
}

/// Intersection preserving the accumulator's order.
fn intersect(acc: Vec<CatalogItem>, other: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let keep: HashSet<ItemId> = other.iter().map(|i| i.id()).collect();
    acc.into_iter().filter(|i| keep.contains(&i.id())).collect()
}
