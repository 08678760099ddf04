//! Request-scoped memoization.
//!
//! Uses `tokio::task_local!` to hold a per-request memo map. Identical query
//! calls issued while assembling one response resolve from the map instead
//! of hitting the cache or database again. The scope lives exactly as long
//! as one request's task; nothing leaks across requests.
//!
//! Outside a scope every operation is a silent no-op, so code paths that run
//! without the middleware (background tasks, tests) behave identically minus
//! the de-duplication.

use std::cell::RefCell;
use std::collections::HashMap;

use super::keys::QueryKey;
use super::store::CachedValue;

tokio::task_local! {
    static MEMO: RefCell<HashMap<QueryKey, CachedValue>>;
}

/// Fetch a memoized value for this request, if any.
pub fn get(key: &QueryKey) -> Option<CachedValue> {
    MEMO.try_with(|memo| memo.borrow().get(key).cloned())
        .ok()
        .flatten()
}

/// Memoize a value for the rest of this request. No-op outside a scope.
pub fn put(key: QueryKey, value: CachedValue) {
    let _ = MEMO.try_with(|memo| {
        memo.borrow_mut().insert(key, value);
    });
}

/// Run a future with a fresh memo scope.
pub async fn scope<F, R>(f: F) -> R
where
    F: std::future::Future<Output = R>,
{
    MEMO.scope(RefCell::new(HashMap::new()), f).await
}
