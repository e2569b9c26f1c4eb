#![forbid(unsafe_code)]

use rollcall_core::PageResult;
use rollcall_query::QueryState;
use tracing::debug;

/// Reconcile the locally requested page with the page the server actually
/// served. When the server clamped an out-of-range request (the data shrank
/// under us), the served page is adopted as the new local page exactly
/// once; adoption only aligns state with what was already fetched and must
/// never trigger a follow-up request.
///
/// Returns true when the local page was adopted from the server.
pub fn adopt_served_page(query: &mut QueryState, result: &PageResult) -> bool {
    if query.page() == result.page {
        return false;
    }
    debug!(requested = query.page(), served = result.page, "page clamped by server");
    query.adopt_page(result.page);
    true
}
