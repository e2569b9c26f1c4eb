#![forbid(unsafe_code)]

use crate::{BulkOutcome, CollectionController};
use futures::future::join_all;
use metrics::counter;
use rollcall_api::{ApiError, ApiResult, ConfirmGate as _, DataService as _, Notifier as _};
use rollcall_core::ActionKind;
use tracing::{info, warn};

impl CollectionController {
    /// Apply one action to one record.
    ///
    /// Destructive actions pass the confirmation gate first; a declined
    /// confirmation returns `Ok(false)` with no side effects. On success
    /// the scope's caches are invalidated and a background revalidation is
    /// scheduled; a deleted id is dropped from the live selection. On
    /// failure the error goes to the notifier and no local state changes.
    pub async fn single_action(&mut self, id: &str, action: ActionKind) -> ApiResult<bool> {
        if id.is_empty() {
            return Err(ApiError::Validation("empty record id".into()));
        }
        if action.is_destructive() {
            let message = format!("Delete 1 item from {}?", self.scope());
            if !self.gate.confirm(&message) {
                info!(scope = %self.scope, id = %id, "action: declined at confirmation");
                return Ok(false);
            }
        }
        info!(scope = %self.scope, id = %id, action = %action.as_str(), "action: start");
        let result = match action {
            ActionKind::Delete => self.service.remove_single(&self.scope, id).await,
            _ => self.service.mutate_single(&self.scope, id, action).await,
        };
        match result {
            Ok(_) => {
                if action == ActionKind::Delete {
                    // The record is confirmed gone; it must not linger in
                    // any live selection.
                    self.selection.toggle(id, false);
                }
                self.finish_mutation();
                self.notifier
                    .success(&format!("{}: {} {}", self.scope, action.as_str(), id));
                Ok(true)
            }
            Err(e) => {
                warn!(scope = %self.scope, id = %id, error = %e, "action: failed");
                self.notifier
                    .error(&format!("{}: {} {} failed: {}", self.scope, action.as_str(), id, e));
                Err(e)
            }
        }
    }

    /// Run one action over the whole live selection.
    ///
    /// An empty selection short-circuits with a notice and zero service
    /// calls. A declined confirmation returns `Ok(None)`. Per-item actions
    /// (delete) run concurrently and non-atomically; a uniform status
    /// change goes out as one batched call treated as best-effort. Either
    /// way the caches are invalidated and the selection cleared afterwards,
    /// because the remote state may have changed even on reported failure.
    pub async fn bulk_action(&mut self, action: ActionKind) -> ApiResult<Option<BulkOutcome>> {
        let ids = self.selection.ids();
        if ids.is_empty() {
            self.notifier.error("nothing selected");
            return Err(ApiError::Validation("nothing selected".into()));
        }
        if action.is_destructive() {
            let message = format!("Delete {} items from {}?", ids.len(), self.scope());
            if !self.gate.confirm(&message) {
                info!(scope = %self.scope, count = ids.len(), "bulk: declined at confirmation");
                return Ok(None);
            }
        }
        info!(scope = %self.scope, count = ids.len(), action = %action.as_str(), "bulk: start");

        let outcome = match action {
            ActionKind::Delete => self.bulk_delete(ids).await,
            _ => self.bulk_status(ids, action).await?,
        };

        counter!("rollcall_bulk_item_failures_total", outcome.failed.len() as u64);
        self.finish_mutation();
        self.selection.clear();

        if outcome.all_succeeded() {
            self.notifier.success(&format!(
                "{}: {} {} items",
                self.scope,
                outcome.action.as_str(),
                outcome.succeeded.len()
            ));
        } else {
            warn!(
                scope = %self.scope,
                failed = outcome.failed.len(),
                attempted = outcome.attempted.len(),
                "bulk: partial or complete failure"
            );
            self.notifier.error(&format!(
                "{}: {} failed for {} of {} items",
                self.scope,
                outcome.action.as_str(),
                outcome.failed.len(),
                outcome.attempted.len()
            ));
        }
        Ok(Some(outcome))
    }

    /// One remove call per id, concurrently. Independent successes and
    /// failures are both recorded; failed items are not retried.
    async fn bulk_delete(&mut self, ids: Vec<String>) -> BulkOutcome {
        let calls = ids.iter().map(|id| {
            let service = std::sync::Arc::clone(&self.service);
            let scope = self.scope.clone();
            let id = id.clone();
            async move { (id.clone(), service.remove_single(&scope, &id).await) }
        });
        let results = join_all(calls).await;
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(_) => {
                    // Confirmed deletes leave the selection immediately,
                    // independent of the final clear.
                    self.selection.toggle(&id, false);
                    succeeded.push(id);
                }
                Err(e) => failed.push((id, e)),
            }
        }
        BulkOutcome { action: ActionKind::Delete, attempted: ids, succeeded, failed }
    }

    /// One batched status update for the whole list. Atomicity of the
    /// endpoint is opaque; a failure marks every attempted id failed and
    /// the follow-up revalidation reconciles whatever actually committed.
    async fn bulk_status(&mut self, ids: Vec<String>, action: ActionKind) -> ApiResult<BulkOutcome> {
        let status = action
            .bulk_status()
            .ok_or_else(|| ApiError::Validation(format!("{} is not a status action", action.as_str())))?;
        let outcome = match self
            .service
            .mutate_bulk_status(&self.scope, &ids, status)
            .await
        {
            Ok(_) => BulkOutcome {
                action,
                attempted: ids.clone(),
                succeeded: ids,
                failed: Vec::new(),
            },
            Err(e) => BulkOutcome {
                action,
                attempted: ids.clone(),
                succeeded: Vec::new(),
                failed: ids.into_iter().map(|id| (id, e.clone())).collect(),
            },
        };
        Ok(outcome)
    }

    /// Shared post-mutation bookkeeping: invalidate the scope's caches
    /// (pages and stats) and schedule a background revalidation of the
    /// current page, keeping stale rows visible meanwhile.
    fn finish_mutation(&mut self) {
        self.cache.invalidate_prefix(&self.scope);
        // Swallow our own broadcast; the refetch below covers it.
        self.swallow_invalidations();
        self.start_fetch(true);
    }
}
