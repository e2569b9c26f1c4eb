//! Query construction for list screens: canonical parameter building plus
//! the debounce stage that sits between the search box and the builder.

#![forbid(unsafe_code)]

use rollcall_core::{CollectionQuery, SortOrder, DEFAULT_PAGE_LIMIT, EXPORT_PAGE_LIMIT};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Raw per-screen filter inputs. Setters enforce the page-reset rule:
/// a changed search or status filter jumps back to page 1; page and sort
/// changes never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    page: u32,
    limit: u32,
    search: String,
    status: String,
    sort_by: Option<String>,
    sort_order: Option<SortOrder>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl QueryState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: String::new(),
            status: String::new(),
            sort_by: None,
            sort_order: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Apply a settled search value. Returns true when the value changed.
    pub fn set_search(&mut self, settled: &str) -> bool {
        let settled = settled.trim();
        if self.search == settled {
            return false;
        }
        self.search = settled.to_string();
        self.page = 1;
        true
    }

    /// Apply a status filter; `"all"` and the empty string mean unfiltered.
    /// Returns true when the filter changed.
    pub fn set_status(&mut self, status: &str) -> bool {
        let status = if status == "all" { "" } else { status };
        if self.status == status {
            return false;
        }
        self.status = status.to_string();
        self.page = 1;
        true
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if self.page == page {
            return false;
        }
        self.page = page;
        true
    }

    /// Adopt a server-clamped page without touching filters. Same as
    /// `set_page` but named for the synchronizer call site.
    pub fn adopt_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_sort(&mut self, field: &str, order: SortOrder) -> bool {
        let next = (Some(field.to_string()), Some(order));
        if (self.sort_by.clone(), self.sort_order) == next {
            return false;
        }
        self.sort_by = next.0;
        self.sort_order = next.1;
        true
    }

    pub fn clear_sort(&mut self) -> bool {
        if self.sort_by.is_none() && self.sort_order.is_none() {
            return false;
        }
        self.sort_by = None;
        self.sort_order = None;
        true
    }

    /// Canonical query: empty search and unfiltered status are omitted, so
    /// logically identical inputs always produce structurally equal values.
    pub fn build(&self) -> CollectionQuery {
        let mut q = CollectionQuery::new(self.page, self.limit);
        if !self.search.is_empty() {
            q.search = Some(self.search.clone());
        }
        if !self.status.is_empty() {
            q.status = Some(self.status.clone());
        }
        q.sort_by = self.sort_by.clone();
        q.sort_order = self.sort_order;
        q
    }

    /// Query for "export all": first page at the export limit, with the
    /// active search/status filters kept so the export matches the screen.
    pub fn export_query(&self) -> CollectionQuery {
        let mut q = self.build();
        q.page = 1;
        q.limit = EXPORT_PAGE_LIMIT;
        q
    }
}

/// Default quiet period before a search value is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounce stage for free-text search input.
///
/// Feed every keystroke through [`SearchDebouncer::input`]; exactly one
/// settled value per burst comes out the receiver once the quiet period
/// elapses with no further input. A new keystroke inside the window
/// replaces the pending emission, and a settled value equal to the last
/// one emitted is suppressed. Dropping the handle cancels the timer task.
pub struct SearchDebouncer {
    input_tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl SearchDebouncer {
    pub fn spawn(window: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            let mut last_emitted: Option<String> = None;
            'outer: while let Some(first) = input_rx.recv().await {
                let mut pending = first;
                loop {
                    let timer = tokio::time::sleep(window);
                    tokio::pin!(timer);
                    tokio::select! {
                        next = input_rx.recv() => match next {
                            // The quiet period restarts from the new value.
                            Some(v) => pending = v,
                            None => break 'outer,
                        },
                        _ = &mut timer => {
                            if last_emitted.as_deref() != Some(pending.as_str()) {
                                debug!(value = %pending, "search settled");
                                if settled_tx.send(pending.clone()).is_err() {
                                    break 'outer;
                                }
                                last_emitted = Some(pending);
                            }
                            break;
                        }
                    }
                }
            }
        });
        (Self { input_tx, task }, settled_rx)
    }

    /// Record a keystroke; never blocks.
    pub fn input(&self, text: impl Into<String>) {
        let _ = self.input_tx.send(text.into());
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
