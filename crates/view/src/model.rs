#![forbid(unsafe_code)]

use rollcall_api::ApiError;
use rollcall_core::{ActionKind, CollectionQuery, PageResult};
use std::sync::Arc;

/// Lifecycle of one list screen. No terminal state; the machine lives for
/// the view's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Message sent back from a fetch task to the controller's pump. Every
/// update carries the generation it was issued under; the pump discards
/// anything that no longer matches.
#[derive(Debug)]
pub enum ViewUpdate {
    Page {
        generation: u64,
        query: CollectionQuery,
        result: Arc<PageResult>,
    },
    PageError {
        generation: u64,
        error: ApiError,
    },
}

/// Accounting for one bulk operation. Non-atomic by design: independent
/// successes and failures are both expected and both recorded.
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub action: ActionKind,
    pub attempted: Vec<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
}

impl BulkOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }
}
