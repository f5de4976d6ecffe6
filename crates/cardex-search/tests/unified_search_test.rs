//! End-to-end searches through the full service stack: façade, resolver,
//! indexes, executor, and the unified envelope, over an in-memory catalog.

mod helpers;

use std::sync::atomic::Ordering;

use cardex_core::{EntityKind, EntityRecord, SearchFilter, SearchOptions};
use helpers::{service_over, CatalogStore};

fn names(records: &[EntityRecord]) -> Vec<String> {
    records.iter().map(|r| r.primary_text().to_string()).collect()
}

fn card_numbers(records: &[EntityRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match r {
            EntityRecord::Card(c) => Some(c.number.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_prefix_matches_rank_ahead_of_longer_names() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    store.add_card(base, "Pikachu", "25");
    store.add_card(base, "Pikachu VMAX", "44");
    store.add_card(base, "Surfing Pikachu", "111");
    store.add_card(base, "Charizard", "4");
    let (_store, service) = service_over(store);

    let response = service
        .search(&[EntityKind::Cards], "Pika", &SearchOptions::new())
        .await
        .expect("search should succeed");

    assert!(response.success);
    let cards = response.data.cards.expect("cards were requested");
    // The plain prefix match outranks the longer variant, which outranks
    // the name where "pika" is not a leading token.
    assert_eq!(
        names(&cards),
        vec!["Pikachu", "Pikachu VMAX", "Surfing Pikachu"]
    );
    assert_eq!(response.meta.total_results, 3);
}

#[tokio::test]
async fn test_wildcard_line_filter_browses_by_availability_then_price() {
    let mut store = CatalogStore::new();
    let base = store.add_line("Base Set");
    let jungle = store.add_line("Jungle");
    store.add_product(Some(base), "Base Set Booster Box", "booster-boxes", 3, 599.99);
    store.add_product(Some(base), "Base Set Theme Deck", "theme-decks", 10, 29.99);
    store.add_product(Some(base), "Base Set Booster Pack", "boosters", 10, 5.99);
    store.add_product(Some(jungle), "Jungle Booster Box", "booster-boxes", 5, 450.0);
    let (_store, service) = service_over(store);

    let options = SearchOptions::new()
        .with_filters(SearchFilter::new().with_set_product_name("Base Set"));
    let response = service
        .search(&[EntityKind::Products], "*", &options)
        .await
        .expect("browse should succeed");

    let products = response.data.products.expect("products were requested");
    // Availability descending, then price ascending; the other line's
    // products never appear.
    assert_eq!(
        names(&products),
        vec![
            "Base Set Booster Pack",
            "Base Set Theme Deck",
            "Base Set Booster Box"
        ]
    );
    assert!(response.data.cards.is_none());
    assert!(response.data.sets.is_none());
    let pagination = response.meta.pagination.expect("products paginate");
    assert_eq!(pagination.total, 3);
}

#[tokio::test]
async fn test_word_order_tolerant_match_on_product_name() {
    let mut store = CatalogStore::new();
    let base = store.add_line("Base Set");
    store.add_product(Some(base), "Base Set Booster Box", "booster-boxes", 3, 599.99);
    store.add_product(
        Some(base),
        "Elite Trainer Box",
        "elite-trainer-boxes",
        7,
        49.99,
    );
    let (_store, service) = service_over(store);

    let response = service
        .search(&[EntityKind::Products], "booster box", &SearchOptions::new())
        .await
        .expect("search should succeed");

    let products = response.data.products.expect("products were requested");
    let listed = names(&products);
    // Both tokens match out of order and mid-name; the product covering
    // every query token ranks above the partial match.
    assert_eq!(listed[0], "Base Set Booster Box");
    assert!(listed.contains(&"Elite Trainer Box".to_string()));
}

#[tokio::test]
async fn test_unknown_category_is_an_empty_success() {
    let mut store = CatalogStore::new();
    let base = store.add_line("Base Set");
    store.add_product(Some(base), "Base Set Booster Pack", "boosters", 10, 5.99);
    let (_store, service) = service_over(store);

    let options =
        SearchOptions::new().with_filters(SearchFilter::new().with_category("NoSuchCategory"));
    let response = service
        .search(&[EntityKind::Products], "", &options)
        .await
        .expect("an unresolvable filter is not an error");

    assert!(response.success);
    assert_eq!(response.meta.total_results, 0);
    let products = response.data.products.expect("products were requested");
    assert!(products.is_empty());
    assert!(response.meta.message.is_some());
}

#[tokio::test]
async fn test_card_number_ties_order_numerically_before_alphanumerics() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    for number in ["100", "2", "SP1", "25", "1"] {
        store.add_card(base, "Energy", number);
    }
    let (_store, service) = service_over(store);

    let response = service
        .search(&[EntityKind::Cards], "energy", &SearchOptions::new())
        .await
        .expect("search should succeed");
    let cards = response.data.cards.expect("cards were requested");
    assert_eq!(card_numbers(&cards), vec!["1", "2", "25", "100", "SP1"]);

    // A collector-number query hits the one card carrying that number.
    let response = service
        .search(&[EntityKind::Cards], "25", &SearchOptions::new())
        .await
        .expect("search should succeed");
    let cards = response.data.cards.expect("cards were requested");
    assert_eq!(card_numbers(&cards), vec!["25"]);
}

#[tokio::test]
async fn test_pages_partition_the_product_catalog() {
    let mut store = CatalogStore::new();
    let base = store.add_line("Base Set");
    for (name, available, price) in [
        ("Booster Box", 3, 599.99),
        ("Booster Pack", 50, 5.99),
        ("Theme Deck", 12, 29.99),
        ("Elite Trainer Box", 7, 49.99),
        ("Collector Tin", 20, 19.99),
    ] {
        store.add_product(Some(base), name, "boosters", available, price);
    }
    let (_store, service) = service_over(store);

    let mut seen = Vec::new();
    let mut sizes = Vec::new();
    for page in 1..=3 {
        let options = SearchOptions::new().with_limit(2).with_page(page);
        let response = service
            .search(&[EntityKind::Products], "*", &options)
            .await
            .expect("browse should succeed");
        let products = response.data.products.expect("products were requested");
        sizes.push(products.len());
        seen.extend(products.iter().map(EntityRecord::id));
        let pagination = response.meta.pagination.expect("products paginate");
        assert_eq!(pagination.total, 5);
        assert_eq!(pagination.pages, 3);
        assert_eq!(pagination.page, page);
    }

    // Three pages of limit 2 partition five products with no overlap.
    assert_eq!(sizes, vec![2, 2, 1]);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn test_index_failure_degrades_to_database_search() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    store.add_card(base, "Pikachu", "25");
    let (store, service) = service_over(store);
    store.fail_scans.store(true, Ordering::SeqCst);

    let response = service
        .search(&[EntityKind::Cards], "pikachu", &SearchOptions::new())
        .await
        .expect("fallback should absorb the index failure");

    let cards = response.data.cards.expect("cards were requested");
    assert_eq!(names(&cards), vec!["Pikachu"]);
    assert!(store.text_search_count() >= 1, "fallback path was not taken");
}

#[tokio::test]
async fn test_unresolved_set_context_never_widens_the_search() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    store.add_card(base, "Pikachu", "25");
    let (_store, service) = service_over(store);

    let options =
        SearchOptions::new().with_filters(SearchFilter::new().with_set_name("Bass Set"));
    let response = service
        .search(&[EntityKind::Cards], "pikachu", &options)
        .await
        .expect("an unresolvable filter is not an error");

    // A misspelled set narrows to nothing rather than falling back to an
    // unfiltered match.
    assert_eq!(response.meta.total_results, 0);
    let message = response.meta.message.expect("empty sets are explained");
    assert!(message.contains("Bass Set"));
}

#[tokio::test]
async fn test_warm_builds_every_index_once() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    store.add_card(base, "Pikachu", "25");
    let line = store.add_line("Base Set");
    store.add_product(Some(line), "Base Set Booster Pack", "boosters", 10, 5.99);
    let (store, service) = service_over(store);

    service.warm().await.expect("warm should succeed");
    assert_eq!(store.scan_count(), 4, "one scan per entity kind");

    let stats = service.index_stats().await;
    assert_eq!(stats.len(), 4);
    assert!(stats.iter().all(|s| s.built));
    let cards = stats
        .iter()
        .find(|s| s.kind == EntityKind::Cards)
        .expect("cards slot");
    assert_eq!(cards.documents, 1);

    // Warmed indexes serve reads without another scan.
    service
        .search(&[EntityKind::Cards], "pikachu", &SearchOptions::new())
        .await
        .expect("search should succeed");
    assert_eq!(store.scan_count(), 4);
}

#[tokio::test]
async fn test_every_indexed_name_is_findable() {
    let mut store = CatalogStore::new();
    let base = store.add_set("Base Set", 1999);
    let fossil = store.add_set("Fossil", 1999);
    let expected = [
        store.add_card(base, "Pikachu", "25"),
        store.add_card(base, "Blastoise", "2"),
        store.add_card(fossil, "Dark Slowbro", "15"),
        store.add_card(fossil, "Aerodactyl", "1"),
    ];
    let (store, service) = service_over(store);

    for (id, name) in expected
        .iter()
        .zip(store.cards.iter().map(|c| c.name.clone()))
    {
        let response = service
            .search(&[EntityKind::Cards], &name, &SearchOptions::new())
            .await
            .expect("search should succeed");
        let cards = response.data.cards.expect("cards were requested");
        let ids: Vec<_> = cards.iter().map(EntityRecord::id).collect();
        assert!(ids.contains(id), "query {name:?} lost its own card");
    }
}
