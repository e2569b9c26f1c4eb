#![forbid(unsafe_code)]

use rollcall_core::{SortOrder, EXPORT_PAGE_LIMIT};
use rollcall_query::QueryState;

#[test]
fn identical_inputs_build_equal_queries() {
    let mut a = QueryState::new(10);
    let mut b = QueryState::new(10);
    a.set_search("  smith "); // trimmed on the way in
    b.set_search("smith");
    a.set_status("pending");
    b.set_status("pending");
    assert_eq!(a.build(), b.build());
    assert_eq!(
        a.build().cache_key("applications"),
        b.build().cache_key("applications")
    );
}

#[test]
fn empty_and_default_fields_are_omitted() {
    let mut q = QueryState::new(10);
    q.set_search("");
    q.set_status("all");
    let built = q.build();
    assert_eq!(built.search, None);
    assert_eq!(built.status, None);
    assert_eq!(built.page, 1);
    assert_eq!(built.limit, 10);
}

#[test]
fn search_change_resets_page() {
    let mut q = QueryState::new(10);
    q.set_page(4);
    assert!(q.set_search("lee"));
    assert_eq!(q.build().page, 1);
    // Same settled value again: no change, no reset.
    q.set_page(3);
    assert!(!q.set_search("lee"));
    assert_eq!(q.build().page, 3);
}

#[test]
fn status_change_resets_page() {
    let mut q = QueryState::new(10);
    q.set_page(7);
    assert!(q.set_status("approved"));
    assert_eq!(q.build().page, 1);
}

#[test]
fn page_and_sort_changes_keep_page() {
    let mut q = QueryState::new(10);
    q.set_search("lee");
    q.set_page(5);
    assert!(q.set_sort("id", SortOrder::Desc));
    let built = q.build();
    assert_eq!(built.page, 5);
    assert_eq!(built.sort_by.as_deref(), Some("id"));
    assert_eq!(built.sort_order, Some(SortOrder::Desc));
    assert!(q.clear_sort());
    assert_eq!(q.build().page, 5);
}

#[test]
fn export_query_keeps_filters_at_export_limit() {
    let mut q = QueryState::new(10);
    q.set_search("smith");
    q.set_status("pending");
    q.set_page(4);
    let export = q.export_query();
    assert_eq!(export.page, 1);
    assert_eq!(export.limit, EXPORT_PAGE_LIMIT);
    assert_eq!(export.search.as_deref(), Some("smith"));
    assert_eq!(export.status.as_deref(), Some("pending"));
}
