//! Rollcall service ports (in-process).
//!
//! This crate defines the traits and error types the collection controllers
//! depend on. Implementations can be in-process (the in-memory backend the
//! CLI uses) or remote (the REST client in the full console).

#![forbid(unsafe_code)]

use rollcall_core::{ActionKind, CollectionQuery, PageResult, Record, Stats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

/// Service errors suitable for transport over RPC later.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiError {
    #[error("network: {0}")]
    Network(String),
    #[error("action: {0}")]
    Action(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Empty acknowledgement for mutations; the refreshed list is authoritative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Ack;

/// Remote data source behind every list screen. `scope` names the
/// collection ("applications", "contacts", "members").
#[async_trait::async_trait]
pub trait DataService: Send + Sync {
    /// Fetch one page. The server clamps out-of-range pages and reports
    /// the page it actually served in the result.
    async fn fetch_page(&self, scope: &str, query: &CollectionQuery) -> ApiResult<PageResult>;

    /// Aggregate counts for the scope's dashboard header.
    async fn fetch_stats(&self, scope: &str) -> ApiResult<Stats>;

    /// Apply one action to one record.
    async fn mutate_single(&self, scope: &str, id: &str, action: ActionKind) -> ApiResult<Ack>;

    /// Set the same status on many records in one call. Atomicity of the
    /// remote endpoint is unspecified; callers treat it as best-effort.
    async fn mutate_bulk_status(&self, scope: &str, ids: &[String], status: &str)
        -> ApiResult<Ack>;

    /// Remove one record.
    async fn remove_single(&self, scope: &str, id: &str) -> ApiResult<Ack>;
}

/// User-facing messaging port. Fire-and-forget; the core never awaits or
/// depends on delivery.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Gate invoked synchronously before any destructive action.
pub trait ConfirmGate: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Notifier that only logs; useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!(message = %message, "notify: success");
    }
    fn error(&self, message: &str) {
        info!(message = %message, "notify: error");
    }
}

/// Gate with a fixed answer; the CLI uses `AutoConfirm(true)` for `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmGate for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

// ----------------- Mock implementation -----------------

/// One recorded service invocation, for assertions on call counts/order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    FetchPage { scope: String, key: String },
    FetchStats { scope: String },
    MutateSingle { scope: String, id: String, action: ActionKind },
    MutateBulkStatus { scope: String, ids: Vec<String>, status: String },
    RemoveSingle { scope: String, id: String },
}

/// Scripted in-memory mock for controller tests. Responses are keyed by the
/// query's cache key; failures and latency are injectable.
#[derive(Default)]
pub struct MockService {
    /// Pages served for a given cache key.
    pub pages: Mutex<HashMap<String, PageResult>>,
    /// Stats served per scope.
    pub stats: Mutex<HashMap<String, Stats>>,
    /// Fail this many upcoming `fetch_page` calls with a network error.
    pub fail_next_fetches: AtomicUsize,
    /// Ids whose `remove_single` fails.
    pub fail_remove: Mutex<Vec<String>>,
    /// When set, `mutate_bulk_status` fails with this error.
    pub fail_bulk: Mutex<Option<ApiError>>,
    /// Extra latency per cache key, in milliseconds (for race tests).
    pub fetch_delay_ms: Mutex<HashMap<String, u64>>,
    /// Every call made, in order.
    pub calls: Mutex<Vec<ServiceCall>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_page(&self, scope: &str, query: &CollectionQuery, result: PageResult) {
        self.pages
            .lock()
            .unwrap()
            .insert(query.cache_key(scope), result);
    }

    pub fn delay(&self, scope: &str, query: &CollectionQuery, ms: u64) {
        self.fetch_delay_ms
            .lock()
            .unwrap()
            .insert(query.cache_key(scope), ms);
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, ServiceCall::FetchPage { .. }))
            .count()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DataService for MockService {
    async fn fetch_page(&self, scope: &str, query: &CollectionQuery) -> ApiResult<PageResult> {
        let key = query.cache_key(scope);
        self.record(ServiceCall::FetchPage { scope: scope.into(), key: key.clone() });
        let delay = self.fetch_delay_ms.lock().unwrap().get(&key).copied();
        if let Some(ms) = delay {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
        if self
            .fail_next_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::Network("connection reset".into()));
        }
        self.pages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no page scripted for {}", key)))
    }

    async fn fetch_stats(&self, scope: &str) -> ApiResult<Stats> {
        self.record(ServiceCall::FetchStats { scope: scope.into() });
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn mutate_single(&self, scope: &str, id: &str, action: ActionKind) -> ApiResult<Ack> {
        self.record(ServiceCall::MutateSingle {
            scope: scope.into(),
            id: id.into(),
            action,
        });
        Ok(Ack)
    }

    async fn mutate_bulk_status(
        &self,
        scope: &str,
        ids: &[String],
        status: &str,
    ) -> ApiResult<Ack> {
        self.record(ServiceCall::MutateBulkStatus {
            scope: scope.into(),
            ids: ids.to_vec(),
            status: status.into(),
        });
        if let Some(err) = self.fail_bulk.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Ack)
    }

    async fn remove_single(&self, scope: &str, id: &str) -> ApiResult<Ack> {
        self.record(ServiceCall::RemoveSingle { scope: scope.into(), id: id.into() });
        if self.fail_remove.lock().unwrap().iter().any(|x| x == id) {
            return Err(ApiError::Action(format!("remove {} refused", id)));
        }
        Ok(Ack)
    }
}

// ----------------- In-memory implementation -----------------

/// In-process backend with real server-side semantics: filtering, sorting,
/// pagination with page clamping. Backs the CLI and integration tests.
#[derive(Default)]
pub struct InMemoryService {
    records: Mutex<HashMap<String, Vec<Record>>>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, scope: &str, records: Vec<Record>) {
        self.records.lock().unwrap().insert(scope.to_string(), records);
    }

    pub fn len(&self, scope: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(scope)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, scope: &str) -> bool {
        self.len(scope) == 0
    }

    fn matches(record: &Record, query: &CollectionQuery) -> bool {
        if let Some(status) = &query.status {
            if record.status.as_deref() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &query.search {
            let needle = needle.to_lowercase();
            let hay = format!(
                "{} {} {}",
                record.id,
                record.status.as_deref().unwrap_or(""),
                record.fields
            )
            .to_lowercase();
            if !hay.contains(&needle) {
                return false;
            }
        }
        true
    }

    fn sort_key(record: &Record, field: &str) -> String {
        match field {
            "id" => record.id.clone(),
            "status" => record.status.clone().unwrap_or_default(),
            other => record
                .fields
                .get(other)
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    v => v.to_string(),
                })
                .unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl DataService for InMemoryService {
    async fn fetch_page(&self, scope: &str, query: &CollectionQuery) -> ApiResult<PageResult> {
        let t0 = Instant::now();
        let records = self.records.lock().unwrap();
        let all = records.get(scope).cloned().unwrap_or_default();
        drop(records);
        let mut filtered: Vec<Record> = all.into_iter().filter(|r| Self::matches(r, query)).collect();
        if let Some(field) = &query.sort_by {
            filtered.sort_by(|a, b| {
                let ord = Self::sort_key(a, field).cmp(&Self::sort_key(b, field));
                match query.sort_order {
                    Some(rollcall_core::SortOrder::Desc) => ord.reverse(),
                    _ => ord,
                }
            });
        }
        let total_count = filtered.len() as u64;
        let limit = query.limit.max(1);
        let total_pages = ((total_count + limit as u64 - 1) / limit as u64).max(1) as u32;
        // Clamp the requested page the way the remote API does.
        let page = query.page.clamp(1, total_pages);
        let start = ((page - 1) * limit) as usize;
        let items: Vec<Record> = filtered
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();
        info!(
            scope = %scope,
            page,
            total_pages,
            total_count,
            took_us = %t0.elapsed().as_micros(),
            "memory: fetch_page"
        );
        Ok(PageResult { items, page, total_pages, total_count })
    }

    async fn fetch_stats(&self, scope: &str) -> ApiResult<Stats> {
        let records = self.records.lock().unwrap();
        let all = records.get(scope).cloned().unwrap_or_default();
        drop(records);
        let mut by_status: HashMap<String, u64> = HashMap::new();
        for r in &all {
            if let Some(s) = &r.status {
                *by_status.entry(s.clone()).or_insert(0) += 1;
            }
        }
        let mut by_status: Vec<(String, u64)> = by_status.into_iter().collect();
        by_status.sort();
        Ok(Stats { total: all.len() as u64, by_status })
    }

    async fn mutate_single(&self, scope: &str, id: &str, action: ActionKind) -> ApiResult<Ack> {
        if action == ActionKind::Delete {
            return self.remove_single(scope, id).await;
        }
        let status = action
            .bulk_status()
            .ok_or_else(|| ApiError::Validation(format!("{} has no status", action.as_str())))?;
        let mut records = self.records.lock().unwrap();
        let list = records
            .get_mut(scope)
            .ok_or_else(|| ApiError::NotFound(format!("unknown scope {}", scope)))?;
        let rec = list
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("{}/{}", scope, id)))?;
        rec.status = Some(status.to_string());
        Ok(Ack)
    }

    async fn mutate_bulk_status(
        &self,
        scope: &str,
        ids: &[String],
        status: &str,
    ) -> ApiResult<Ack> {
        let mut records = self.records.lock().unwrap();
        let list = records
            .get_mut(scope)
            .ok_or_else(|| ApiError::NotFound(format!("unknown scope {}", scope)))?;
        // Applied as it goes: a missing id fails the call after earlier ids
        // were already updated. The endpoint is best-effort, not a transaction.
        for id in ids {
            let rec = list
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("{}/{}", scope, id)))?;
            rec.status = Some(status.to_string());
        }
        Ok(Ack)
    }

    async fn remove_single(&self, scope: &str, id: &str) -> ApiResult<Ack> {
        let mut records = self.records.lock().unwrap();
        let list = records
            .get_mut(scope)
            .ok_or_else(|| ApiError::NotFound(format!("unknown scope {}", scope)))?;
        let before = list.len();
        list.retain(|r| r.id != id);
        if list.len() == before {
            return Err(ApiError::NotFound(format!("{}/{}", scope, id)));
        }
        Ok(Ack)
    }
}
