//! Collection view controller.
//!
//! One `CollectionController` drives one list screen: it owns the query
//! state and the selection set, fetches pages through the injected
//! [`DataService`], reconciles local vs. server-reported pagination, keeps
//! the shared [`QueryCache`] warm, and executes single and bulk mutations
//! with partial-failure accounting.
//!
//! Fetches run on spawned tasks and report back over a channel tagged with
//! a generation marker; [`CollectionController::pump`] drains the channel
//! on the owner's thread and discards anything stale, so a slow response
//! can never overwrite a newer one.

#![forbid(unsafe_code)]

use std::sync::Arc;

use metrics::counter;
use rollcall_api::{ApiResult, ConfirmGate, DataService, Notifier};
use rollcall_core::{CollectionQuery, PageResult, Record, SortOrder, Stats};
use rollcall_query::QueryState;
use rollcall_select::SelectionSet;
use rollcall_store::{Invalidation, QueryCache};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

mod actions;
mod model;
mod page;
mod prefetch;

pub use model::{BulkOutcome, ViewPhase, ViewUpdate};

pub struct CollectionController {
    scope: String,
    service: Arc<dyn DataService>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<dyn ConfirmGate>,

    query: QueryState,
    selection: SelectionSet,

    phase: ViewPhase,
    rows: Vec<Record>,
    total_pages: u32,
    total_count: u64,
    last_error: Option<String>,

    /// Bumped on every issued fetch; responses carrying an older value are
    /// discarded by the pump.
    generation: u64,
    /// Canonical query of the page currently on screen. Used to tell a
    /// revalidation of the same page from navigation to a different one.
    applied_query: Option<CollectionQuery>,

    updates_tx: mpsc::UnboundedSender<ViewUpdate>,
    updates_rx: mpsc::UnboundedReceiver<ViewUpdate>,
    fetch_task: Option<JoinHandle<()>>,
    prefetch_task: Option<JoinHandle<()>>,
    invalidations: broadcast::Receiver<Invalidation>,
}

impl CollectionController {
    pub fn new(
        scope: impl Into<String>,
        service: Arc<dyn DataService>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        gate: Arc<dyn ConfirmGate>,
        limit: u32,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let invalidations = cache.subscribe();
        Self {
            scope: scope.into(),
            service,
            cache,
            notifier,
            gate,
            query: QueryState::new(limit),
            selection: SelectionSet::new(),
            phase: ViewPhase::Idle,
            rows: Vec::new(),
            total_pages: 1,
            total_count: 0,
            last_error: None,
            generation: 0,
            applied_query: None,
            updates_tx,
            updates_rx,
            fetch_task: None,
            prefetch_task: None,
            invalidations,
        }
    }

    // ----------------- triggers -----------------

    /// First fetch on view mount.
    pub fn mount(&mut self) {
        info!(scope = %self.scope, "view: mount");
        self.start_fetch(false);
    }

    /// Apply a settled search value (already debounced upstream). A changed
    /// value resets to page 1 and refetches.
    pub fn on_search_settled(&mut self, settled: &str) {
        if self.query.set_search(settled) {
            self.start_fetch(false);
        }
    }

    pub fn on_status_filter(&mut self, status: &str) {
        if self.query.set_status(status) {
            self.start_fetch(false);
        }
    }

    pub fn on_page(&mut self, page: u32) {
        if self.query.set_page(page) {
            self.start_fetch(false);
        }
    }

    pub fn on_sort(&mut self, field: &str, order: SortOrder) {
        if self.query.set_sort(field, order) {
            self.start_fetch(false);
        }
    }

    pub fn clear_sort(&mut self) {
        if self.query.clear_sort() {
            self.start_fetch(false);
        }
    }

    /// Manual refresh. Also the only way out of the `Error` phase.
    pub fn refresh(&mut self) {
        // Skip the cache: the user asked for fresh data.
        self.cache.invalidate_prefix(&self.scope);
        self.swallow_invalidations();
        self.start_fetch(false);
    }

    // ----------------- fetch plumbing -----------------

    /// Issue a fetch for the current query under a new generation.
    ///
    /// `background` keeps previously `Ready` rows on screen while the
    /// request is in flight (stale-while-revalidate); a foreground fetch
    /// enters `Loading`. A cache hit is applied synchronously with no
    /// service call either way.
    fn start_fetch(&mut self, background: bool) {
        self.generation += 1;
        let generation = self.generation;
        // A superseded in-flight request must never touch state; its
        // generation no longer matches, and aborting it saves the work.
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        let query = self.query.build();
        let key = query.cache_key(&self.scope);
        if let Some(hit) = self.cache.get(&key) {
            debug!(scope = %self.scope, key = %key, "view: cache hit");
            self.apply_page(generation, query, hit);
            return;
        }
        if !background {
            self.phase = ViewPhase::Loading;
        }
        info!(scope = %self.scope, key = %key, generation, background, "view: fetch start");
        let service = Arc::clone(&self.service);
        let cache = Arc::clone(&self.cache);
        let scope = self.scope.clone();
        let tx = self.updates_tx.clone();
        self.fetch_task = Some(tokio::spawn(async move {
            match service.fetch_page(&scope, &query).await {
                Ok(result) => {
                    let result = cache.put(query.cache_key(&scope), result);
                    let _ = tx.send(ViewUpdate::Page { generation, query, result });
                }
                Err(error) => {
                    let _ = tx.send(ViewUpdate::PageError { generation, error });
                }
            }
        }));
    }

    /// Drain pending updates and invalidation announcements, applying
    /// whatever still matches the current generation. Call from the owner's
    /// event loop tick.
    ///
    /// Every queued invalidation is inspected, so an event for this scope
    /// is never masked by a later one for a different scope. Falling off
    /// the end of the queue loses the prefixes, in which case the scope is
    /// revalidated unconditionally.
    pub fn pump(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            self.apply_update(update);
        }
        let mut revalidate = false;
        loop {
            match self.invalidations.try_recv() {
                Ok(inv) => {
                    if inv.prefix == self.scope {
                        debug!(scope = %self.scope, epoch = inv.epoch, "view: revalidate after invalidation");
                        revalidate = true;
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(scope = %self.scope, skipped, "view: invalidation queue lagged");
                    revalidate = true;
                }
                Err(_) => break,
            }
        }
        if revalidate && self.phase != ViewPhase::Idle {
            self.start_fetch(true);
        }
    }

    /// Discard queued invalidation events. Used right after this controller
    /// invalidated its own scope: the fetch that follows covers them, and
    /// events for other scopes are never acted on anyway.
    fn swallow_invalidations(&mut self) {
        loop {
            match self.invalidations.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn apply_update(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Page { generation, query, result } => {
                if generation != self.generation {
                    counter!("rollcall_stale_responses_total", 1);
                    debug!(scope = %self.scope, generation, current = self.generation, "view: stale page discarded");
                    return;
                }
                self.apply_page(generation, query, result);
            }
            ViewUpdate::PageError { generation, error } => {
                if generation != self.generation {
                    debug!(scope = %self.scope, generation, "view: stale error discarded");
                    return;
                }
                warn!(scope = %self.scope, error = %error, "view: fetch failed");
                self.notifier.error(&format!("{}: load failed: {}", self.scope, error));
                self.last_error = Some(error.to_string());
                self.phase = ViewPhase::Error;
            }
        }
    }

    fn apply_page(&mut self, generation: u64, query: CollectionQuery, result: Arc<PageResult>) {
        debug_assert_eq!(generation, self.generation);
        // Server may have clamped the requested page; adopt it without a
        // follow-up fetch, and key the applied query by the page actually
        // served so a later revalidation of it compares equal.
        let mut query = query;
        if page::adopt_served_page(&mut self.query, &result) {
            query.page = result.page;
        }

        let same_page = self.applied_query.as_ref() == Some(&query);
        if same_page {
            self.selection.reconcile(&result.items);
        } else {
            self.selection.page_changed(&result.items);
        }
        self.applied_query = Some(query);

        self.rows = result.items.clone();
        self.total_pages = result.total_pages.max(1);
        self.total_count = result.total_count;
        self.last_error = None;
        self.phase = ViewPhase::Ready;
        info!(
            scope = %self.scope,
            page = result.page,
            total_pages = result.total_pages,
            rows = self.rows.len(),
            "view: page applied"
        );

        if result.page < result.total_pages {
            let mut next = self.query.clone();
            next.set_page(result.page + 1);
            if let Some(task) = self.prefetch_task.take() {
                task.abort();
            }
            self.prefetch_task = Some(prefetch::spawn_prefetch(
                Arc::clone(&self.service),
                Arc::clone(&self.cache),
                self.scope.clone(),
                next.build(),
            ));
        }
    }

    // ----------------- selection passthrough -----------------

    pub fn toggle(&mut self, id: &str, selected: bool) {
        self.selection.toggle(id, selected);
        self.selection.recompute_all_on_page(&self.rows);
    }

    pub fn toggle_all_on_page(&mut self, selected: bool) {
        let rows = std::mem::take(&mut self.rows);
        self.selection.toggle_all_on_page(&rows, selected);
        self.rows = rows;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ----------------- reads -----------------

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn page(&self) -> u32 {
        self.query.page()
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current_query(&self) -> CollectionQuery {
        self.query.build()
    }

    // ----------------- auxiliary fetches -----------------

    /// Cached stats for the scope's dashboard header.
    pub async fn stats(&self) -> ApiResult<Arc<Stats>> {
        if let Some(hit) = self.cache.get_stats(&self.scope) {
            return Ok(hit);
        }
        let stats = self.service.fetch_stats(&self.scope).await?;
        self.cache.put_stats(&self.scope, stats.clone());
        Ok(Arc::new(stats))
    }

    /// "Export all": one large page under the active filters, bypassing the
    /// page cache. The result is the filtered subset the screen shows, not
    /// the whole collection.
    pub async fn export(&self) -> ApiResult<PageResult> {
        let query = self.query.export_query();
        info!(scope = %self.scope, key = %query.cache_key(&self.scope), "view: export");
        self.service.fetch_page(&self.scope, &query).await
    }

    // ----------------- lifecycle -----------------

    /// Abort in-flight work; results of cancelled requests are never
    /// applied.
    pub fn teardown(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(task) = self.prefetch_task.take() {
            task.abort();
        }
    }

    /// Await in-flight fetch/prefetch tasks, then pump. Test and CLI
    /// convenience; a GUI would pump on its frame tick instead.
    pub async fn settle(&mut self) {
        loop {
            if let Some(task) = self.fetch_task.take() {
                let _ = task.await;
                self.pump();
                continue;
            }
            if let Some(task) = self.prefetch_task.take() {
                let _ = task.await;
                continue;
            }
            self.pump();
            if self.fetch_task.is_none() && self.prefetch_task.is_none() {
                break;
            }
        }
    }
}

impl Drop for CollectionController {
    fn drop(&mut self) {
        self.teardown();
    }
}
