//! Post-mutation cache invalidation.

use crate::definition::{success_callback, SuccessCallback};
use crate::error::{Error, Result};
use crate::key::QueryKey;
use crate::observability::QueryMetrics;
use crate::registry::QueryClientGetter;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

/// Compose the success handler of a mutation.
///
/// On every call the handler dispatches one invalidation per key (all of
/// them before awaiting any), waits for the whole set, and only then runs
/// `callback` with the same arguments.
///
/// If any invalidation fails the handler still lets the others settle, then
/// returns the first error in key order unchanged and does not run
/// `callback`. Completed invalidations are not rolled back.
pub fn compose_on_success<T, V>(
    query_client: QueryClientGetter,
    keys: Vec<QueryKey>,
    callback: Option<SuccessCallback<T, V>>,
    metrics: Arc<dyn QueryMetrics>,
) -> SuccessCallback<T, V>
where
    T: Send + 'static,
    V: Send + 'static,
{
    let keys = Arc::new(keys);

    success_callback(move |data: T, variables: V, context| {
        let query_client = query_client.clone();
        let keys = keys.clone();
        let callback = callback.clone();
        let metrics = metrics.clone();

        async move {
            let client = query_client();
            debug!("Invalidating {} query keys after mutation", keys.len());

            let pending = keys.iter().map(|key| {
                let client = client.clone();
                let metrics = metrics.clone();
                async move {
                    let timer = Instant::now();
                    client.invalidate(key).await?;
                    metrics.record_invalidation(key, timer.elapsed());
                    Ok::<(), Error>(())
                }
            });

            let outcomes = join_all(pending).await;
            if let Some(e) = outcomes.into_iter().find_map(Result::err) {
                metrics.record_error("invalidation", &e.to_string());
                return Err(e);
            }

            match callback {
                Some(callback) => callback(data, variables, context).await,
                None => Ok(()),
            }
        }
    })
}

/// Invalidate every key under `namespace` at once.
pub async fn invalidate_namespace(query_client: &QueryClientGetter, namespace: &str) -> Result<()> {
    let key = QueryKey::namespace(namespace);
    info!("Invalidating namespace {}", key);
    query_client().invalidate(&key).await
}
