#![forbid(unsafe_code)]

use rollcall_core::Record;
use rollcall_select::SelectionSet;

fn page(ids: &[&str]) -> Vec<Record> {
    ids.iter().map(|id| Record::new(*id)).collect()
}

#[test]
fn toggle_parity() {
    let mut sel = SelectionSet::new();
    sel.toggle("a", true);
    sel.toggle("a", true); // idempotent
    assert!(sel.contains("a"));
    assert_eq!(sel.len(), 1);
    sel.toggle("a", false);
    assert!(!sel.contains("a"));
    sel.toggle("a", false); // removing again is a no-op
    assert!(sel.is_empty());
}

#[test]
fn toggle_all_on_page_selects_every_item() {
    let mut sel = SelectionSet::new();
    let items = page(&["a", "b", "c"]);
    sel.toggle_all_on_page(&items, true);
    assert_eq!(sel.len(), 3);
    assert!(sel.all_on_page());
    sel.toggle_all_on_page(&items, false);
    assert!(sel.is_empty());
    assert!(!sel.all_on_page());
}

#[test]
fn toggle_all_on_empty_page_is_never_all_selected() {
    let mut sel = SelectionSet::new();
    sel.toggle_all_on_page(&[], true);
    assert!(!sel.all_on_page());
    assert!(sel.is_empty());
}

#[test]
fn all_on_page_derived_from_membership() {
    let mut sel = SelectionSet::new();
    let items = page(&["a", "b"]);
    sel.toggle("a", true);
    sel.reconcile(&items);
    assert!(!sel.all_on_page());
    sel.toggle("b", true);
    sel.reconcile(&items);
    assert!(sel.all_on_page());
}

#[test]
fn reconcile_empty_page_clears_selection() {
    let mut sel = SelectionSet::new();
    sel.toggle("a", true);
    sel.toggle("b", true);
    sel.reconcile(&[]);
    assert!(sel.is_empty());
    assert!(!sel.all_on_page());
}

#[test]
fn reconcile_keeps_fully_selected_page_selected_after_refresh() {
    let mut sel = SelectionSet::new();
    let before = page(&["a", "b"]);
    sel.toggle_all_on_page(&before, true);
    assert!(sel.all_on_page());
    // Background refresh swaps an item on the page.
    let after = page(&["a", "c"]);
    sel.reconcile(&after);
    assert!(sel.all_on_page());
    assert!(sel.contains("c"));
    // The id that left the page stays in the cross-page set.
    assert!(sel.contains("b"));
}

#[test]
fn selection_persists_across_pages() {
    // Scenario: select {a, b, c} on page 1, navigate to page 2, select {d}.
    let mut sel = SelectionSet::new();
    let page1 = page(&["a", "b", "c"]);
    sel.toggle_all_on_page(&page1, true);
    let page2 = page(&["d", "e"]);
    sel.page_changed(&page2);
    // Navigating away from a fully selected page selects nothing new.
    assert!(!sel.all_on_page());
    assert_eq!(sel.len(), 3);
    sel.toggle("d", true);
    sel.reconcile(&page2);
    assert!(!sel.all_on_page()); // e still unselected
    assert_eq!(sel.ids(), vec!["a", "b", "c", "d"]);

    // On a page holding exactly the selected item, it is all-selected.
    let page2_only_d = page(&["d"]);
    sel.page_changed(&page2_only_d);
    assert!(sel.all_on_page());
}

#[test]
fn ids_are_sorted_for_stable_bulk_order() {
    let mut sel = SelectionSet::new();
    for id in ["c", "a", "b"] {
        sel.toggle(id, true);
    }
    assert_eq!(sel.ids(), vec!["a", "b", "c"]);
}
