#![forbid(unsafe_code)]

use rollcall_api::DataService;
use rollcall_core::CollectionQuery;
use rollcall_store::QueryCache;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Warm the cache for the page the user is most likely to ask for next.
/// Best-effort: a failure is logged at debug level and never surfaced.
/// Callers only invoke this when `page < total_pages`, so the last page is
/// never prefetched past.
pub(crate) fn spawn_prefetch(
    service: Arc<dyn DataService>,
    cache: Arc<QueryCache>,
    scope: String,
    query: CollectionQuery,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let key = query.cache_key(&scope);
        if cache.get(&key).is_some() {
            return;
        }
        match service.fetch_page(&scope, &query).await {
            Ok(result) => {
                debug!(key = %key, "prefetch: warmed");
                cache.put(key, result);
            }
            Err(e) => debug!(key = %key, error = %e, "prefetch: failed (ignored)"),
        }
    })
}
