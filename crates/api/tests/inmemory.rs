#![forbid(unsafe_code)]

use rollcall_api::{ApiError, DataService, InMemoryService};
use rollcall_core::{ActionKind, CollectionQuery, Record, SortOrder, EXPORT_PAGE_LIMIT};

fn seeded() -> InMemoryService {
    let svc = InMemoryService::new();
    let records = (1..=25)
        .map(|n| {
            let status = if n % 2 == 0 { "approved" } else { "pending" };
            let mut r = Record::with_status(format!("app-{:02}", n), status);
            r.fields = serde_json::json!({ "name": format!("member {}", n) });
            r
        })
        .collect();
    svc.seed("applications", records);
    svc
}

#[tokio::test]
async fn paginates_and_reports_totals() {
    let svc = seeded();
    let page = svc
        .fetch_page("applications", &CollectionQuery::new(2, 10))
        .await
        .unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.items.len(), 10);
}

#[tokio::test]
async fn clamps_out_of_range_page() {
    let svc = seeded();
    let page = svc
        .fetch_page("applications", &CollectionQuery::new(9, 10))
        .await
        .unwrap();
    assert_eq!(page.page, 3);
    assert_eq!(page.items.len(), 5);
}

#[tokio::test]
async fn empty_scope_reports_page_one_of_one() {
    let svc = InMemoryService::new();
    let page = svc
        .fetch_page("events", &CollectionQuery::new(4, 10))
        .await
        .unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.total_count, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn status_filter_narrows_results() {
    let svc = seeded();
    let mut q = CollectionQuery::new(1, 50);
    q.status = Some("pending".into());
    let page = svc.fetch_page("applications", &q).await.unwrap();
    assert_eq!(page.total_count, 13);
    assert!(page.items.iter().all(|r| r.status.as_deref() == Some("pending")));
}

#[tokio::test]
async fn export_query_returns_filtered_subset() {
    // "Export all" must respect the active filters, not dump everything.
    let svc = seeded();
    let mut q = CollectionQuery::new(1, EXPORT_PAGE_LIMIT);
    q.search = Some("member 2".into());
    let page = svc.fetch_page("applications", &q).await.unwrap();
    // member 2 and member 20..25 match the substring.
    assert_eq!(page.total_count, 7);
    assert!(page.total_count < 25);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn sorts_by_requested_field() {
    let svc = seeded();
    let mut q = CollectionQuery::new(1, 5);
    q.sort_by = Some("id".into());
    q.sort_order = Some(SortOrder::Desc);
    let page = svc.fetch_page("applications", &q).await.unwrap();
    assert_eq!(page.items[0].id, "app-25");
}

#[tokio::test]
async fn mutate_single_sets_status() {
    let svc = seeded();
    svc.mutate_single("applications", "app-01", ActionKind::Approve)
        .await
        .unwrap();
    let mut q = CollectionQuery::new(1, 50);
    q.status = Some("approved".into());
    let page = svc.fetch_page("applications", &q).await.unwrap();
    assert!(page.items.iter().any(|r| r.id == "app-01"));
}

#[tokio::test]
async fn remove_single_deletes_and_missing_id_is_not_found() {
    let svc = seeded();
    svc.remove_single("applications", "app-01").await.unwrap();
    assert_eq!(svc.len("applications"), 24);
    let err = svc.remove_single("applications", "app-01").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn bulk_status_applies_to_every_id() {
    let svc = seeded();
    let ids: Vec<String> = vec!["app-01".into(), "app-03".into()];
    svc.mutate_bulk_status("applications", &ids, "rejected")
        .await
        .unwrap();
    let stats = svc.fetch_stats("applications").await.unwrap();
    assert_eq!(stats.total, 25);
    assert!(stats.by_status.contains(&("rejected".to_string(), 2)));
}

#[tokio::test]
async fn stats_count_by_status() {
    let svc = seeded();
    let stats = svc.fetch_stats("applications").await.unwrap();
    assert_eq!(stats.total, 25);
    assert!(stats.by_status.contains(&("approved".to_string(), 12)));
    assert!(stats.by_status.contains(&("pending".to_string(), 13)));
}
