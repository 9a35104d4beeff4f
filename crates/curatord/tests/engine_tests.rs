//! Deterministic Sync Engine Tests
//!
//! These tests drive whole reconciliation passes through FakeCatalog and
//! FakeCollectionStore to verify engine behavior without any filesystem
//! or daemon in the loop.

use curator_common::catalog::{
    CreditKind, ItemId, ItemImage, ItemKind, Movie, Person, PersonCredit,
};
use curator_common::collection::{Collection, CollectionId, DisplayOrder, MANAGED_TAG};
use curator_common::report::{ArtworkOutcome, RuleDisposition};
use curator_common::rules::{MatchMode, MatchRule};
use curatord::catalog::FakeCatalog;
use curatord::engine::SyncEngine;
use curatord::store::{FakeCollectionStore, StoreOp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn movie(name: &str, tags: &[&str], genres: &[&str]) -> Movie {
    Movie {
        id: ItemId::new(),
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        credits: vec![],
        images: vec![],
        premiere_year: None,
    }
}

fn credited_movie(name: &str, person: &str, kind: CreditKind) -> Movie {
    let mut m = movie(name, &[], &[]);
    m.credits.push(PersonCredit::new(person, kind));
    m
}

fn person_with_image(name: &str, path: &str) -> Person {
    Person {
        name: name.to_string(),
        images: vec![ItemImage::primary(path)],
    }
}

fn managed_collection(name: &str, members: Vec<ItemId>) -> Collection {
    Collection {
        id: CollectionId::new(),
        name: name.to_string(),
        locked: true,
        display_order: DisplayOrder::PremiereDate,
        tags: vec![MANAGED_TAG.to_string()],
        members,
        primary_image: None,
    }
}

fn engine_with(
    rules: Vec<MatchRule>,
    catalog: FakeCatalog,
    store: FakeCollectionStore,
) -> (SyncEngine, Arc<FakeCatalog>, Arc<FakeCollectionStore>) {
    let catalog = Arc::new(catalog);
    let store = Arc::new(store);
    let engine = SyncEngine::new(rules, catalog.clone(), store.clone());
    (engine, catalog, store)
}

// ============================================================================
// Convergence and Idempotence
// ============================================================================

/// A first pass creates the collection and adds every matching item
#[tokio::test]
async fn test_first_pass_creates_collection_with_matches() {
    let elf = movie("Elf", &["christmas"], &[]);
    let grinch = movie("The Grinch", &[], &["Christmas"]);
    let alien = movie("Alien", &["space"], &[]);
    let wanted = vec![elf.id, grinch.id];

    let catalog = FakeCatalog::new()
        .with_movie(elf)
        .with_movie(grinch)
        .with_movie(alien);
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        catalog,
        FakeCollectionStore::new(),
    );

    let report = engine.run_pass().await;

    assert_eq!(report.synced_count(), 1);
    assert_eq!(report.rules[0].title, "Christmas Collection");
    assert!(matches!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            added: 2,
            removed: 0,
            ..
        }
    ));

    let collection = store.collection_named("Christmas Collection").unwrap();
    assert_eq!(collection.members, wanted);
}

/// A second pass over an unchanged library issues no mutations at all
#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let mut elf = movie("Elf", &["christmas"], &[]);
    elf.images.push(ItemImage::primary("/img/elf.jpg"));

    let catalog = FakeCatalog::new().with_movie(elf);
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        catalog,
        FakeCollectionStore::new(),
    );

    engine.run_pass().await;
    let mutations_after_first = store.mutation_count();
    assert!(mutations_after_first > 0);

    let report = engine.run_pass().await;

    assert_eq!(store.mutation_count(), mutations_after_first);
    assert_eq!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            added: 0,
            removed: 0,
            artwork: ArtworkOutcome::Unchanged,
        }
    );
}

/// Items that stopped matching are removed from the collection
#[tokio::test]
async fn test_pass_removes_items_that_no_longer_match() {
    let keep = movie("Elf", &["christmas"], &[]);
    let keep_id = keep.id;
    let stale_id = ItemId::new();

    let catalog = FakeCatalog::new().with_movie(keep);
    let store = FakeCollectionStore::with_collections(vec![managed_collection(
        "Christmas Collection",
        vec![stale_id, keep_id],
    )]);
    let (engine, _, store) = engine_with(vec![MatchRule::any("christmas")], catalog, store);

    let report = engine.run_pass().await;

    assert!(matches!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            added: 0,
            removed: 1,
            ..
        }
    ));
    let collection = store.collection_named("Christmas Collection").unwrap();
    assert_eq!(collection.members, vec![keep_id]);
}

/// A pass with changes in both directions removes before adding, one
/// request per direction
#[tokio::test]
async fn test_membership_changes_remove_then_add() {
    let incoming = movie("Elf", &["christmas"], &[]);
    let incoming_id = incoming.id;
    let outgoing_id = ItemId::new();

    let catalog = FakeCatalog::new().with_movie(incoming);
    let store = FakeCollectionStore::with_collections(vec![managed_collection(
        "Christmas Collection",
        vec![outgoing_id],
    )]);
    let (engine, _, store) = engine_with(vec![MatchRule::any("christmas")], catalog, store);

    engine.run_pass().await;

    let ops = store.ops();
    assert_eq!(
        ops[0],
        StoreOp::MembersRemoved {
            name: "Christmas Collection".to_string(),
            items: vec![outgoing_id],
        }
    );
    assert_eq!(
        ops[1],
        StoreOp::MembersAdded {
            name: "Christmas Collection".to_string(),
            items: vec![incoming_id],
        }
    );
}

// ============================================================================
// Match Modes
// ============================================================================

/// An Any rule unions its terms, keeping first-seen order and no duplicates
#[tokio::test]
async fn test_any_rule_unions_terms() {
    let a = movie("A", &["christmas"], &[]);
    let b = movie("B", &[], &["family"]);
    let c = movie("C", &["christmas"], &["family"]);
    let d = movie("D", &["space"], &[]);
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);

    let catalog = FakeCatalog::new()
        .with_movie(a)
        .with_movie(b)
        .with_movie(c)
        .with_movie(d);
    let rule = MatchRule::new(
        vec!["christmas".to_string(), "family".to_string()],
        MatchMode::Any,
        None,
    );
    let (engine, _, store) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    engine.run_pass().await;

    // C matched both terms but appears once, where it was first seen
    let collection = store.collection_named("Christmas Collection").unwrap();
    assert_eq!(collection.members, vec![a_id, c_id, b_id]);
}

/// An All rule keeps only items matching every term
#[tokio::test]
async fn test_all_rule_intersects_terms() {
    let only_tag = movie("A", &["christmas"], &[]);
    let both = movie("C", &["christmas"], &["family"]);
    let both_id = both.id;

    let catalog = FakeCatalog::new().with_movie(only_tag).with_movie(both);
    let rule = MatchRule::new(
        vec!["christmas".to_string(), "family".to_string()],
        MatchMode::All,
        None,
    );
    let (engine, _, store) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    engine.run_pass().await;

    let collection = store.collection_named("Christmas (strict) Collection").unwrap();
    assert_eq!(collection.members, vec![both_id]);
}

/// An All rule stops querying once the running intersection is empty
#[tokio::test]
async fn test_all_rule_short_circuits_on_empty_intersection() {
    let catalog = FakeCatalog::new().with_movie(movie("A", &["christmas"], &[]));
    let rule = MatchRule::new(
        vec![
            "christmas".to_string(),
            "nomatch".to_string(),
            "family".to_string(),
        ],
        MatchMode::All,
        None,
    );
    let (engine, catalog, store) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    let report = engine.run_pass().await;

    // The third term was never queried
    assert!(catalog.query_count(ItemKind::Movie, "nomatch") > 0);
    assert_eq!(catalog.query_count(ItemKind::Movie, "family"), 0);
    assert_eq!(catalog.query_count(ItemKind::Series, "family"), 0);

    // The collection still exists, converged to empty
    assert_eq!(report.synced_count(), 1);
    let collection = store
        .collection_named("Christmas (strict) Collection")
        .unwrap();
    assert!(collection.members.is_empty());
}

// ============================================================================
// Person Anchoring
// ============================================================================

/// A term naming a person with artwork re-bases the whole rule to credits
#[tokio::test]
async fn test_person_term_rebases_whole_rule_to_credits() {
    let starring = credited_movie("Cast Away", "Tom Hanks", CreditKind::Actor);
    let starring_id = starring.id;
    // Matches "drama" by genre, but the anchored rule must not pick it up
    let drama = movie("Unrelated Drama", &[], &["drama"]);

    let catalog = FakeCatalog::new()
        .with_movie(starring)
        .with_movie(drama)
        .with_person(person_with_image("Tom Hanks", "/img/hanks.jpg"));
    let rule = MatchRule::new(
        vec!["tom hanks".to_string(), "drama".to_string()],
        MatchMode::Any,
        None,
    );
    let (engine, catalog, store) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    engine.run_pass().await;

    let collection = store.collection_named("Tom Hanks Collection").unwrap();
    assert_eq!(collection.members, vec![starring_id]);

    // Both terms queried by credits; tag and genre queries never happened
    assert_eq!(catalog.query_count(ItemKind::Movie, "tom hanks"), 2);
    assert_eq!(catalog.query_count(ItemKind::Movie, "drama"), 0);
}

/// Director credits anchor the same way actor credits do
#[tokio::test]
async fn test_anchor_matches_director_credits() {
    let directed = credited_movie("That Thing You Do!", "Tom Hanks", CreditKind::Director);
    let directed_id = directed.id;
    let written = credited_movie("Larry Crowne", "Tom Hanks", CreditKind::Writer);

    let catalog = FakeCatalog::new()
        .with_movie(directed)
        .with_movie(written)
        .with_person(person_with_image("Tom Hanks", "/img/hanks.jpg"));
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("tom hanks")],
        catalog,
        FakeCollectionStore::new(),
    );

    engine.run_pass().await;

    // Writer-only credits do not count
    let collection = store.collection_named("Tom Hanks Collection").unwrap();
    assert_eq!(collection.members, vec![directed_id]);
}

/// A person without a primary image does not anchor the rule
#[tokio::test]
async fn test_person_without_image_does_not_anchor() {
    let tagged = movie("Hanks Retrospective", &["tom hanks"], &[]);
    let tagged_id = tagged.id;
    let starring = credited_movie("Cast Away", "Tom Hanks", CreditKind::Actor);

    let catalog = FakeCatalog::new()
        .with_movie(tagged)
        .with_movie(starring)
        .with_person(Person {
            name: "Tom Hanks".to_string(),
            images: vec![],
        });
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("tom hanks")],
        catalog,
        FakeCollectionStore::new(),
    );

    engine.run_pass().await;

    // Tag-or-genre semantics: the tagged item matches, the credited one does not
    let collection = store.collection_named("Tom Hanks Collection").unwrap();
    assert_eq!(collection.members, vec![tagged_id]);
}

/// The first term naming a person wins; later terms are not looked up
#[tokio::test]
async fn test_anchor_resolution_stops_at_first_person() {
    let starring = credited_movie("Cast Away", "Tom Hanks", CreditKind::Actor);

    let catalog = FakeCatalog::new()
        .with_movie(starring)
        .with_person(person_with_image("Tom Hanks", "/img/hanks.jpg"))
        .with_person(person_with_image("Rita Wilson", "/img/wilson.jpg"));
    let rule = MatchRule::new(
        vec![
            "holiday".to_string(),
            "tom hanks".to_string(),
            "rita wilson".to_string(),
        ],
        MatchMode::Any,
        None,
    );
    let (engine, catalog, _) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    engine.run_pass().await;

    assert_eq!(catalog.person_lookup_count("holiday"), 1);
    assert_eq!(catalog.person_lookup_count("tom hanks"), 1);
    assert_eq!(catalog.person_lookup_count("rita wilson"), 0);
}

// ============================================================================
// Artwork Selection
// ============================================================================

/// The anchor person's image beats member images
#[tokio::test]
async fn test_artwork_prefers_anchor_person_image() {
    let mut starring = credited_movie("Cast Away", "Tom Hanks", CreditKind::Actor);
    starring.images.push(ItemImage::primary("/img/castaway.jpg"));

    let catalog = FakeCatalog::new()
        .with_movie(starring)
        .with_person(person_with_image("Tom Hanks", "/img/hanks.jpg"));
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("tom hanks")],
        catalog,
        FakeCollectionStore::new(),
    );

    engine.run_pass().await;

    let collection = store.collection_named("Tom Hanks Collection").unwrap();
    assert_eq!(collection.primary_image.as_deref(), Some("/img/hanks.jpg"));
}

/// Without a person, the first member that has artwork supplies it
#[tokio::test]
async fn test_artwork_falls_back_to_first_member_image() {
    let bare = movie("Elf", &["christmas"], &[]);
    let mut pictured = movie("The Grinch", &["christmas"], &[]);
    pictured.images.push(ItemImage::primary("/img/grinch.jpg"));

    let catalog = FakeCatalog::new().with_movie(bare).with_movie(pictured);
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        catalog,
        FakeCollectionStore::new(),
    );

    let report = engine.run_pass().await;

    let collection = store.collection_named("Christmas Collection").unwrap();
    assert_eq!(collection.primary_image.as_deref(), Some("/img/grinch.jpg"));
    assert!(matches!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            artwork: ArtworkOutcome::Applied { .. },
            ..
        }
    ));
}

/// A collection titled after a person uses that person's image even
/// when the rule itself matched by tags
#[tokio::test]
async fn test_artwork_uses_title_person_without_anchor() {
    let tagged = movie("Cast Away", &["favorites"], &[]);

    let catalog = FakeCatalog::new()
        .with_movie(tagged)
        .with_person(person_with_image("Tom Hanks", "/img/hanks.jpg"));
    let rule = MatchRule::new(
        vec!["favorites".to_string()],
        MatchMode::Any,
        Some("Tom Hanks".to_string()),
    );
    let (engine, _, store) = engine_with(vec![rule], catalog, FakeCollectionStore::new());

    engine.run_pass().await;

    let collection = store.collection_named("Tom Hanks").unwrap();
    assert_eq!(collection.primary_image.as_deref(), Some("/img/hanks.jpg"));
}

/// A failed artwork write leaves the rule synced
#[tokio::test]
async fn test_artwork_failure_does_not_fail_rule() {
    let mut pictured = movie("Elf", &["christmas"], &[]);
    pictured.images.push(ItemImage::primary("/img/elf.jpg"));
    let pictured_id = pictured.id;

    let catalog = FakeCatalog::new().with_movie(pictured);
    // Membership is already converged, so the only write left is artwork
    let store = FakeCollectionStore::with_collections(vec![managed_collection(
        "Christmas Collection",
        vec![pictured_id],
    )]);
    store.set_reject_mutations(true);
    let (engine, _, store) = engine_with(vec![MatchRule::any("christmas")], catalog, store);

    let report = engine.run_pass().await;

    assert_eq!(report.failed_count(), 0);
    assert_eq!(report.synced_count(), 1);
    assert!(matches!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            added: 0,
            removed: 0,
            artwork: ArtworkOutcome::Failed { .. },
        }
    ));
    assert_eq!(store.mutation_count(), 0);
}

/// No candidate anywhere in the chain is a quiet non-event
#[tokio::test]
async fn test_artwork_no_candidate_writes_nothing() {
    let catalog = FakeCatalog::new().with_movie(movie("Elf", &["christmas"], &[]));
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        catalog,
        FakeCollectionStore::new(),
    );

    let report = engine.run_pass().await;

    assert!(matches!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            artwork: ArtworkOutcome::NoCandidate,
            ..
        }
    ));
    assert!(!store
        .ops()
        .iter()
        .any(|op| matches!(op, StoreOp::ImageSet { .. })));
}

// ============================================================================
// Rule Isolation and Pass Completion
// ============================================================================

/// One failing rule does not stop the rules after it
#[tokio::test]
async fn test_failing_rule_does_not_stop_the_pass() {
    let first = movie("A", &["alpha"], &[]);
    let third = movie("C", &["gamma"], &[]);
    let (first_id, third_id) = (first.id, third.id);

    let catalog = FakeCatalog::new()
        .with_movie(first)
        .with_movie(third)
        .fail_on_term("broken");
    let rules = vec![
        MatchRule::any("alpha"),
        MatchRule::any("broken"),
        MatchRule::any("gamma"),
    ];
    let (engine, _, store) = engine_with(rules, catalog, FakeCollectionStore::new());

    let report = engine.run_pass().await;

    assert_eq!(report.rules.len(), 3);
    assert_eq!(report.synced_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert!(matches!(
        report.rules[1].disposition,
        RuleDisposition::Failed { .. }
    ));
    assert!(!report.interrupted);

    assert_eq!(
        store.collection_named("Alpha Collection").unwrap().members,
        vec![first_id]
    );
    assert_eq!(
        store.collection_named("Gamma Collection").unwrap().members,
        vec![third_id]
    );
    // The failing rule had already resolved its collection before its
    // catalog queries failed; it exists and stays empty
    let broken = store.collection_named("Broken Collection").unwrap();
    assert!(broken.members.is_empty());
}

/// A rule matching nothing still creates its collection
#[tokio::test]
async fn test_empty_wanted_set_still_creates_collection() {
    let catalog = FakeCatalog::new();
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("nomatch")],
        catalog,
        FakeCollectionStore::new(),
    );

    let report = engine.run_pass().await;

    assert_eq!(
        report.rules[0].disposition,
        RuleDisposition::Synced {
            added: 0,
            removed: 0,
            artwork: ArtworkOutcome::NoCandidate,
        }
    );
    let collection = store.collection_named("Nomatch Collection").unwrap();
    assert!(collection.members.is_empty());
}

/// A rule with no usable terms and no title creates nothing
#[tokio::test]
async fn test_rule_without_terms_is_skipped() {
    let rule = MatchRule::new(vec!["   ".to_string()], MatchMode::Any, None);
    let (engine, _, store) = engine_with(vec![rule], FakeCatalog::new(), FakeCollectionStore::new());

    let report = engine.run_pass().await;

    assert_eq!(report.skipped_count(), 1);
    assert_eq!(store.collection_count(), 0);
    assert_eq!(store.mutation_count(), 0);
}

/// A titled rule whose terms went away clears its stale members and
/// nothing else
#[tokio::test]
async fn test_titled_empty_rule_clears_stale_members() {
    let stale = vec![ItemId::new(), ItemId::new()];
    let store = FakeCollectionStore::with_collections(vec![managed_collection(
        "Legacy Collection",
        stale.clone(),
    )]);
    let rule = MatchRule::new(vec![], MatchMode::Any, Some("Legacy Collection".to_string()));
    let (engine, _, store) = engine_with(vec![rule], FakeCatalog::new(), store);

    let report = engine.run_pass().await;

    assert!(matches!(
        &report.rules[0].disposition,
        RuleDisposition::Skipped { reason } if reason.contains("2 stale members removed")
    ));
    let ops = store.ops();
    assert_eq!(ops.len(), 1);
    assert_eq!(
        ops[0],
        StoreOp::MembersRemoved {
            name: "Legacy Collection".to_string(),
            items: stale,
        }
    );
    assert!(store
        .collection_named("Legacy Collection")
        .unwrap()
        .members
        .is_empty());
}

// ============================================================================
// Pass Control
// ============================================================================

/// A raised shutdown flag stops the pass before the next rule
#[tokio::test]
async fn test_shutdown_flag_interrupts_pass_between_rules() {
    let flag = Arc::new(AtomicBool::new(true));
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        FakeCatalog::new(),
        FakeCollectionStore::new(),
    );
    let engine = engine.with_shutdown(flag.clone());

    let report = engine.run_pass().await;

    assert!(report.interrupted);
    assert!(report.rules.is_empty());
    assert_eq!(store.mutation_count(), 0);

    // Lowering the flag lets the next pass run in full
    flag.store(false, Ordering::Relaxed);
    let report = engine.run_pass().await;
    assert!(!report.interrupted);
    assert_eq!(report.rules.len(), 1);
}

/// Report counters account for every rule in the pass
#[tokio::test]
async fn test_pass_report_counts_every_rule() {
    let catalog = FakeCatalog::new()
        .with_movie(movie("A", &["alpha"], &[]))
        .fail_on_term("broken");
    let rules = vec![
        MatchRule::any("alpha"),
        MatchRule::new(vec![], MatchMode::Any, None),
        MatchRule::any("broken"),
    ];
    let (engine, _, _) = engine_with(rules, catalog, FakeCollectionStore::new());

    let report = engine.run_pass().await;

    assert_eq!(report.rules.len(), 3);
    assert_eq!(report.synced_count(), 1);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.failed_count(), 1);

    let summary = report.summary();
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.interrupted);
}

// ============================================================================
// Created Collection Shape
// ============================================================================

/// Collections the engine creates are locked, marked, and sorted by
/// premiere date
#[tokio::test]
async fn test_created_collections_are_locked_and_marked() {
    let catalog = FakeCatalog::new().with_movie(movie("Elf", &["christmas"], &[]));
    let (engine, _, store) = engine_with(
        vec![MatchRule::any("christmas")],
        catalog,
        FakeCollectionStore::new(),
    );

    engine.run_pass().await;

    let collection = store.collection_named("Christmas Collection").unwrap();
    assert!(collection.locked);
    assert!(collection.tags.contains(&MANAGED_TAG.to_string()));
    assert_eq!(collection.display_order, DisplayOrder::PremiereDate);
}

/// A user collection with the same name but no marker tag is left alone
#[tokio::test]
async fn test_unmanaged_collection_with_same_name_is_untouched() {
    let user_item = ItemId::new();
    let user_collection = Collection {
        id: CollectionId::new(),
        name: "Christmas Collection".to_string(),
        locked: false,
        display_order: DisplayOrder::Default,
        tags: vec![],
        members: vec![user_item],
        primary_image: None,
    };
    let catalog = FakeCatalog::new().with_movie(movie("Elf", &["christmas"], &[]));
    let store = FakeCollectionStore::with_collections(vec![user_collection]);
    let (engine, _, store) = engine_with(vec![MatchRule::any("christmas")], catalog, store);

    engine.run_pass().await;

    // The engine created its own managed collection alongside
    assert_eq!(store.collection_count(), 2);
    assert!(store
        .ops()
        .iter()
        .any(|op| matches!(op, StoreOp::Created { .. })));
    // The user's collection kept its members
    let untouched = store.collection_named("Christmas Collection").unwrap();
    assert!(!untouched.is_managed());
    assert_eq!(untouched.members, vec![user_item]);
}
