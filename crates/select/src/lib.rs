//! Cross-page multi-select state for list screens.
//!
//! The set persists across page navigation and is only cleared explicitly:
//! on an empty result page, on a confirmed delete of a member id, or after
//! a bulk action completes. `all_on_page` is derived from the current
//! page's items only, never from the full cross-page selection.

#![forbid(unsafe_code)]

use rollcall_core::Record;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Pure, synchronous, idempotent selection state. No operation here can
/// fail and none has side effects outside this struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionSet {
    ids: FxHashSet<String>,
    all_on_page: bool,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove one id. Repeating the same call is a no-op after the
    /// first. Does not recompute `all_on_page`; callers that care pass the
    /// page through [`SelectionSet::reconcile`] afterwards.
    pub fn toggle(&mut self, id: &str, selected: bool) {
        if selected {
            self.ids.insert(id.to_string());
        } else {
            self.ids.remove(id);
        }
    }

    /// Select or deselect every item on the current page.
    pub fn toggle_all_on_page(&mut self, items: &[Record], selected: bool) {
        for item in items {
            self.toggle(&item.id, selected);
        }
        self.all_on_page = selected && !items.is_empty();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.all_on_page = false;
    }

    /// Re-derive state against the current page's items after they change
    /// (page navigation or a background refresh).
    ///
    /// Empty items clear the whole selection. If the page was fully
    /// selected before the change, the (possibly new) page ids are re-added
    /// so it stays fully selected. `all_on_page` is then recomputed from
    /// the final membership.
    pub fn reconcile(&mut self, items: &[Record]) {
        if items.is_empty() {
            self.clear();
            return;
        }
        if self.all_on_page {
            for item in items {
                self.ids.insert(item.id.clone());
            }
        }
        self.all_on_page = items.iter().all(|item| self.ids.contains(&item.id));
    }

    /// Recompute against a brand-new page after navigation or a filter
    /// change. Unlike [`SelectionSet::reconcile`], a fully selected
    /// previous page does not carry over to the new one; membership alone
    /// decides `all_on_page`.
    pub fn page_changed(&mut self, items: &[Record]) {
        if items.is_empty() {
            self.clear();
            return;
        }
        self.recompute_all_on_page(items);
    }

    /// Re-derive `all_on_page` from membership alone, e.g. after a manual
    /// toggle on the current page.
    pub fn recompute_all_on_page(&mut self, items: &[Record]) {
        self.all_on_page = !items.is_empty() && items.iter().all(|item| self.ids.contains(&item.id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn all_on_page(&self) -> bool {
        self.all_on_page
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in sorted order, so bulk operations see a stable order.
    pub fn ids(&self) -> Vec<String> {
        let mut out: Vec<String> = self.ids.iter().cloned().collect();
        out.sort();
        out
    }
}
