#![forbid(unsafe_code)]

use rollcall_core::{CollectionQuery, PageResult, Record, Stats};
use rollcall_store::QueryCache;

fn page_result(ids: &[&str], page: u32) -> PageResult {
    PageResult {
        items: ids.iter().map(|id| Record::new(*id)).collect(),
        page,
        total_pages: 3,
        total_count: ids.len() as u64,
    }
}

#[test]
fn put_then_get_roundtrip() {
    let cache = QueryCache::new();
    let query = CollectionQuery::new(1, 10);
    let key = query.cache_key("applications");
    assert!(cache.get(&key).is_none());
    cache.put(key.clone(), page_result(&["a"], 1));
    let hit = cache.get(&key).expect("cached page");
    assert_eq!(hit.items[0].id, "a");
}

#[test]
fn invalidate_prefix_only_hits_matching_scope() {
    let cache = QueryCache::new();
    let q1 = CollectionQuery::new(1, 10);
    let q2 = CollectionQuery::new(2, 10);
    cache.put(q1.cache_key("applications"), page_result(&["a"], 1));
    cache.put(q2.cache_key("applications"), page_result(&["b"], 2));
    cache.put(q1.cache_key("contacts"), page_result(&["c"], 1));

    let removed = cache.invalidate_prefix("applications");
    assert_eq!(removed, 2);
    assert!(cache.get(&q1.cache_key("applications")).is_none());
    assert!(cache.get(&q2.cache_key("applications")).is_none());
    assert!(cache.get(&q1.cache_key("contacts")).is_some());
}

#[test]
fn stats_are_invalidated_with_their_scope() {
    let cache = QueryCache::new();
    cache.put_stats("applications", Stats { total: 5, by_status: vec![] });
    assert!(cache.get_stats("applications").is_some());
    cache.invalidate_prefix("applications");
    assert!(cache.get_stats("applications").is_none());
}

#[tokio::test]
async fn invalidation_is_broadcast_to_all_subscribers() {
    let cache = QueryCache::new();
    let mut rx1 = cache.subscribe();
    let mut rx2 = cache.subscribe();
    cache.invalidate_prefix("members");
    let seen1 = rx1.recv().await.expect("sender alive");
    let seen2 = rx2.recv().await.expect("sender alive");
    assert_eq!(seen1.prefix, "members");
    assert_eq!(seen1, seen2);
    assert_eq!(seen1.epoch, 1);
}

#[tokio::test]
async fn back_to_back_invalidations_are_both_delivered() {
    // Two different prefixes between two reads must not collapse into the
    // latest one; a subscriber has to see every prefix it missed.
    let cache = QueryCache::new();
    let mut rx = cache.subscribe();
    cache.invalidate_prefix("applications");
    cache.invalidate_prefix("contacts");
    let first = rx.recv().await.expect("first event");
    let second = rx.recv().await.expect("second event");
    assert_eq!(first.prefix, "applications");
    assert_eq!(first.epoch, 1);
    assert_eq!(second.prefix, "contacts");
    assert_eq!(second.epoch, 2);
}
