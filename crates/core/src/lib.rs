//! Rollcall core types shared by every collection screen.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Opaque backend identifier for a record.
pub type RecordId = String;

/// A row as rendered by a list screen. Domain fields beyond `id` and
/// `status` travel as raw JSON; the controller never looks inside them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub status: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), status: None, fields: serde_json::Value::Null }
    }

    pub fn with_status(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self { id: id.into(), status: Some(status.into()), fields: serde_json::Value::Null }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Mutating actions a screen can request for one or many records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Approve,
    Reject,
    Delete,
    MarkSeen,
    Resolve,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::Delete => "delete",
            ActionKind::MarkSeen => "mark-seen",
            ActionKind::Resolve => "resolve",
        }
    }

    /// Destructive actions must pass the confirmation gate before any
    /// service call is made.
    pub fn is_destructive(&self) -> bool {
        matches!(self, ActionKind::Delete)
    }

    /// Status value a uniform bulk update maps to, if this action is one.
    /// `Delete` has no status; it is issued per record.
    pub fn bulk_status(&self) -> Option<&'static str> {
        match self {
            ActionKind::Approve => Some("approved"),
            ActionKind::Reject => Some("rejected"),
            ActionKind::MarkSeen => Some("seen"),
            ActionKind::Resolve => Some("resolved"),
            ActionKind::Delete => None,
        }
    }
}

/// Canonical pagination/filter parameters for one page request.
///
/// Immutable value; identical normalized fields compare equal so the query
/// doubles as a cache identity. Build through `rollcall-query` rather than
/// by hand so empty/default fields are omitted consistently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CollectionQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl CollectionQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            search: None,
            status: None,
            sort_by: None,
            sort_order: None,
        }
    }

    /// Stable string key for cache storage, scoped by collection name so
    /// `invalidate_prefix(scope)` hits every cached page of one screen.
    pub fn cache_key(&self, scope: &str) -> String {
        let mut key = format!("{}|page={}&limit={}", scope, self.page, self.limit);
        if let Some(s) = &self.search {
            let _ = write!(key, "&search={}", s);
        }
        if let Some(s) = &self.status {
            let _ = write!(key, "&status={}", s);
        }
        if let Some(s) = &self.sort_by {
            let _ = write!(key, "&sort={}", s);
        }
        if let Some(o) = &self.sort_order {
            let _ = write!(key, "&order={}", o.as_str());
        }
        key
    }
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Page limit used by "export all" requests; active filters still apply.
pub const EXPORT_PAGE_LIMIT: u32 = 1000;

/// One fetched page as the backend reports it. An empty collection comes
/// back as `page = 1, total_pages = 1, total_count = 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PageResult {
    pub items: Vec<Record>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// Aggregate counts a dashboard header renders; cached next to pages and
/// invalidated together with them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: u64,
    /// Sorted by status name for deterministic rendering.
    pub by_status: Vec<(String, u64)>,
}

pub mod prelude {
    pub use super::{
        ActionKind, CollectionQuery, PageResult, Record, RecordId, SortOrder, Stats,
    };
}
