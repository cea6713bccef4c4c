//! Resolved configurations produced by the factory.
//!
//! These are the exact inputs a data-fetching runtime consumes: a key plus a
//! bound fetch function for reads, a bound mutate function plus a synthesized
//! success handler for writes. The factory keeps no reference to them after
//! construction.

use crate::binder::{MutationFn, QueryFn};
use crate::definition::{InitialData, MutationContext, SuccessCallback};
use crate::error::Result;
use crate::key::QueryKey;
use crate::options::{MutationOptions, QueryOptions};
use crate::registry::{AbortSignal, QueryClient, QueryClientGetter};
use crate::state::DataState;
use std::sync::Arc;

/// Fetch configuration: `{query_key, query_fn, ...options}`.
pub struct QueryConfig<T> {
    pub query_key: QueryKey,
    pub query_fn: QueryFn<T>,
    pub initial_data: Option<InitialData<T>>,
    pub options: QueryOptions,
}

impl<T> Clone for QueryConfig<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        QueryConfig {
            query_key: self.query_key.clone(),
            query_fn: self.query_fn.clone(),
            initial_data: self.initial_data.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T> QueryConfig<T> {
    pub fn data_state(&self) -> DataState {
        if self.initial_data.is_some() {
            DataState::Seeded
        } else {
            DataState::Cold
        }
    }

    /// Run the bound fetch function without a cancellation signal.
    pub async fn fetch(&self) -> Result<T> {
        (self.query_fn)(None).await
    }

    /// Run the bound fetch function, forwarding `signal` to the client getter.
    pub async fn fetch_with_signal(&self, signal: AbortSignal) -> Result<T> {
        (self.query_fn)(Some(signal)).await
    }
}

impl<T: Clone> QueryConfig<T> {
    /// Initial data, evaluating a thunk if one was supplied.
    pub fn initial_data(&self) -> Option<T> {
        self.initial_data.as_ref().map(InitialData::resolve)
    }
}

/// Mutate configuration: `{mutation_fn, on_success, ...options}`.
pub struct MutationConfig<V, T> {
    pub mutation_fn: MutationFn<V, T>,
    pub on_success: SuccessCallback<T, V>,
    pub options: MutationOptions,
}

impl<V, T> Clone for MutationConfig<V, T> {
    fn clone(&self) -> Self {
        MutationConfig {
            mutation_fn: self.mutation_fn.clone(),
            on_success: self.on_success.clone(),
            options: self.options.clone(),
        }
    }
}

impl<V: Clone, T: Clone> MutationConfig<V, T> {
    /// Run the mutation, then its success handler, returning the mutation data.
    ///
    /// A failing success handler (for instance a rejected invalidation) fails
    /// the whole call even though the mutation itself went through.
    pub async fn mutate(&self, variables: V) -> Result<T> {
        self.mutate_with_context(variables, None).await
    }

    pub async fn mutate_with_context(&self, variables: V, context: MutationContext) -> Result<T> {
        let data = (self.mutation_fn)(variables.clone()).await?;
        (self.on_success)(data.clone(), variables, context).await?;
        Ok(data)
    }
}

/// Paired read/write configuration over one resource.
pub struct ActionConfig<T, V, M = T> {
    pub query: QueryConfig<T>,
    pub mutation: MutationConfig<V, M>,
    pub query_client: QueryClientGetter,
}

impl<T: Clone, V, M> Clone for ActionConfig<T, V, M> {
    fn clone(&self) -> Self {
        ActionConfig {
            query: self.query.clone(),
            mutation: self.mutation.clone(),
            query_client: self.query_client.clone(),
        }
    }
}

impl<T, V, M> ActionConfig<T, V, M> {
    pub fn query_key(&self) -> &QueryKey {
        &self.query.query_key
    }

    pub fn query_client(&self) -> Arc<dyn QueryClient> {
        (self.query_client)()
    }

    pub async fn fetch(&self) -> Result<T> {
        self.query.fetch().await
    }
}

impl<T, V: Clone, M: Clone> ActionConfig<T, V, M> {
    pub async fn mutate(&self, variables: V) -> Result<M> {
        self.mutation.mutate(variables).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::success_callback;
    use crate::error::Error;
    use crate::query_key;
    use futures::FutureExt;
    use parking_lot::Mutex;

    fn config(initial: Option<u32>) -> QueryConfig<u32> {
        QueryConfig {
            query_key: query_key!["counter", "value"],
            query_fn: Arc::new(|signal: Option<AbortSignal>| {
                async move { Ok(if signal.is_some() { 1 } else { 0 }) }.boxed()
            }),
            initial_data: initial.map(InitialData::Value),
            options: QueryOptions::default(),
        }
    }

    #[test]
    fn test_data_state() {
        assert_eq!(config(None).data_state(), DataState::Cold);
        assert_eq!(config(Some(3)).data_state(), DataState::Seeded);
        assert_eq!(config(Some(3)).initial_data(), Some(3));
        assert_eq!(config(None).initial_data(), None);
    }

    #[tokio::test]
    async fn test_fetch_forwards_signal() {
        let cfg = config(None);
        assert_eq!(cfg.fetch().await, Ok(0));
        assert_eq!(cfg.fetch_with_signal(AbortSignal::new()).await, Ok(1));
    }

    #[tokio::test]
    async fn test_mutate_runs_success_handler_after_mutation() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let cfg: MutationConfig<u32, u32> = MutationConfig {
            mutation_fn: Arc::new(|v: u32| async move { Ok(v + 1) }.boxed()),
            on_success: success_callback(move |data: u32, vars: u32, _ctx| {
                calls_clone.lock().push((data, vars));
                async { Ok(()) }
            }),
            options: MutationOptions::default(),
        };

        assert_eq!(cfg.mutate(4).await, Ok(5));
        assert_eq!(*calls.lock(), vec![(5, 4)]);
    }

    #[tokio::test]
    async fn test_mutate_failure_skips_success_handler() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = called.clone();

        let cfg: MutationConfig<u32, u32> = MutationConfig {
            mutation_fn: Arc::new(|_v: u32| async { Err(Error::Transport("down".into())) }.boxed()),
            on_success: success_callback(move |_: u32, _: u32, _ctx| {
                *called_clone.lock() = true;
                async { Ok(()) }
            }),
            options: MutationOptions::default(),
        };

        assert_eq!(cfg.mutate(1).await, Err(Error::Transport("down".into())));
        assert!(!*called.lock());
    }
}
