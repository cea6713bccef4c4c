//! Request and mutation binders.
//!
//! Binders turn a raw client call into a function that obtains its own client
//! instance and unwraps the `{data, error}` envelope through the error mapper.
//! They never report errors themselves, and a raw call that fails outright
//! (transport-level) propagates unchanged.

use crate::definition::{RawMutationFn, RawQueryFn};
use crate::error::Result;
use crate::key::QueryKey;
use crate::observability::QueryMetrics;
use crate::registry::{AbortSignal, ClientGetter};
use crate::response::ErrorMapper;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Instant;

/// Bound fetch function. Accepts an optional cancellation signal.
pub type QueryFn<T> = Arc<dyn Fn(Option<AbortSignal>) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Bound mutate function of the variables.
pub type MutationFn<V, T> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Bind a raw fetch call to a client getter and the error mapper.
///
/// The returned function requests a client (forwarding the signal it was
/// given), runs the raw call and maps the envelope with `should_report`.
pub fn bind_query_fn<C, T, E>(
    should_report: bool,
    client_getter: ClientGetter<C>,
    error_mapper: Arc<dyn ErrorMapper<E>>,
    query_fn: RawQueryFn<C, T, E>,
) -> QueryFn<T>
where
    C: 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Arc::new(move |signal| {
        let client = client_getter(signal);
        let pending = query_fn(client);
        let error_mapper = error_mapper.clone();

        async move {
            let response = pending.await?;
            response.into_result(error_mapper.as_ref(), should_report)
        }
        .boxed()
    })
}

/// Bind a raw mutate call to a client getter and the error mapper.
///
/// Mutations are not cancellable: the client is always requested without a
/// signal. Invalidation is composed separately, see
/// [`compose_on_success`](crate::invalidation::compose_on_success).
pub fn bind_mutation_fn<C, V, T, E>(
    should_report: bool,
    client_getter: ClientGetter<C>,
    error_mapper: Arc<dyn ErrorMapper<E>>,
    mutation_fn: RawMutationFn<C, V, T, E>,
) -> MutationFn<V, T>
where
    C: 'static,
    V: 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Arc::new(move |variables| {
        let client = client_getter(None);
        let pending = mutation_fn(client, variables);
        let error_mapper = error_mapper.clone();

        async move {
            let response = pending.await?;
            response.into_result(error_mapper.as_ref(), should_report)
        }
        .boxed()
    })
}

/// Wrap a bound fetch function with timing and error recording under `key`.
pub(crate) fn instrument_query_fn<T>(
    key: QueryKey,
    query_fn: QueryFn<T>,
    metrics: Arc<dyn QueryMetrics>,
) -> QueryFn<T>
where
    T: Send + 'static,
{
    Arc::new(move |signal| {
        let pending = query_fn(signal);
        let key = key.clone();
        let metrics = metrics.clone();

        async move {
            let timer = Instant::now();
            let result = pending.await;
            match &result {
                Ok(_) => metrics.record_fetch(&key, timer.elapsed()),
                Err(e) => metrics.record_fetch_error(&key, &e.to_string()),
            }
            result
        }
        .boxed()
    })
}

/// Wrap a bound mutate function with timing and error recording.
pub(crate) fn instrument_mutation_fn<V, T>(
    mutation_fn: MutationFn<V, T>,
    metrics: Arc<dyn QueryMetrics>,
) -> MutationFn<V, T>
where
    V: 'static,
    T: Send + 'static,
{
    Arc::new(move |variables| {
        let pending = mutation_fn(variables);
        let metrics = metrics.clone();

        async move {
            let timer = Instant::now();
            let result = pending.await;
            match &result {
                Ok(_) => metrics.record_mutation(timer.elapsed()),
                Err(e) => metrics.record_error("mutation", &e.to_string()),
            }
            result
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::response::QueryResponse;
    use parking_lot::Mutex;

    #[derive(Clone, Debug)]
    struct Client {
        cancellable: bool,
    }

    type Flags = Arc<Mutex<Vec<bool>>>;

    fn recording_mapper() -> (Arc<dyn ErrorMapper<String>>, Flags) {
        let flags: Flags = Arc::new(Mutex::new(Vec::new()));
        let flags_clone = flags.clone();
        let mapper = move |error: String, report: bool| {
            flags_clone.lock().push(report);
            Error::Response(error)
        };
        (Arc::new(mapper), flags)
    }

    fn recording_getter() -> (ClientGetter<Client>, Arc<Mutex<Vec<bool>>>) {
        let signals = Arc::new(Mutex::new(Vec::new()));
        let signals_clone = signals.clone();
        let getter: ClientGetter<Client> = Arc::new(move |signal: Option<AbortSignal>| {
            signals_clone.lock().push(signal.is_some());
            Client {
                cancellable: signal.is_some(),
            }
        });
        (getter, signals)
    }

    #[tokio::test]
    async fn test_query_fn_forwards_signal_and_returns_data() {
        let (getter, signals) = recording_getter();
        let (mapper, flags) = recording_mapper();
        let raw: RawQueryFn<Client, bool, String> =
            Arc::new(|client: Client| async move { Ok(QueryResponse::ok(client.cancellable)) }.boxed());

        let bound = bind_query_fn(false, getter, mapper, raw);

        let with_signal = bound(Some(AbortSignal::new())).await;
        let without_signal = bound(None).await;

        assert_eq!(with_signal, Ok(true));
        assert_eq!(without_signal, Ok(false));
        assert_eq!(*signals.lock(), vec![true, false]);
        // mapper only sees envelopes with errors
        assert!(flags.lock().is_empty());
    }

    #[tokio::test]
    async fn test_query_fn_maps_response_error_with_flag() {
        let (getter, _) = recording_getter();
        let (mapper, flags) = recording_mapper();
        let raw: RawQueryFn<Client, u32, String> =
            Arc::new(|_client: Client| async { Ok(QueryResponse::err("nope".to_string())) }.boxed());

        let quiet = bind_query_fn(false, getter.clone(), mapper.clone(), raw.clone());
        let loud = bind_query_fn(true, getter, mapper, raw);

        assert_eq!(quiet(None).await, Err(Error::Response("nope".to_string())));
        assert_eq!(loud(None).await, Err(Error::Response("nope".to_string())));
        assert_eq!(*flags.lock(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_transport_error_bypasses_mapper() {
        let (getter, _) = recording_getter();
        let (mapper, flags) = recording_mapper();
        let raw: RawQueryFn<Client, u32, String> = Arc::new(|_client: Client| {
            async { Err(Error::Transport("connection refused".to_string())) }.boxed()
        });

        let bound = bind_query_fn(true, getter, mapper, raw);

        assert_eq!(
            bound(None).await,
            Err(Error::Transport("connection refused".to_string()))
        );
        assert!(flags.lock().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_fn_never_passes_signal() {
        let (getter, signals) = recording_getter();
        let (mapper, _) = recording_mapper();
        let raw: RawMutationFn<Client, u32, u32, String> = Arc::new(|_client: Client, v: u32| {
            async move { Ok(QueryResponse::ok(v * 2)) }.boxed()
        });

        let bound = bind_mutation_fn(true, getter, mapper, raw);

        assert_eq!(bound(21).await, Ok(42));
        assert_eq!(*signals.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_instrumented_query_fn_records() {
        use crate::query_key;

        #[derive(Default)]
        struct Counting {
            fetches: Mutex<u32>,
            errors: Mutex<u32>,
        }

        impl QueryMetrics for Counting {
            fn record_fetch(&self, _key: &QueryKey, _duration: std::time::Duration) {
                *self.fetches.lock() += 1;
            }
            fn record_fetch_error(&self, _key: &QueryKey, _error: &str) {
                *self.errors.lock() += 1;
            }
        }

        let metrics = Arc::new(Counting::default());
        let ok: QueryFn<u32> = Arc::new(|_| async { Ok(1) }.boxed());
        let failing: QueryFn<u32> = Arc::new(|_| async { Err(Error::Cancelled) }.boxed());

        let ok = instrument_query_fn(query_key!["a"], ok, metrics.clone());
        let failing = instrument_query_fn(query_key!["b"], failing, metrics.clone());

        assert_eq!(ok(None).await, Ok(1));
        assert_eq!(failing(None).await, Err(Error::Cancelled));
        assert_eq!(*metrics.fetches.lock(), 1);
        assert_eq!(*metrics.errors.lock(), 1);
    }
}
