//! Externally supplied collaborators: client instances and the cache registry.

use crate::error::Result;
use crate::key::QueryKey;
use async_trait::async_trait;
use std::sync::Arc;

pub mod inmemory;

pub use inmemory::{InMemoryQueryClient, RegistryStats};

/// Cancellation signal handed to fetch operations.
pub type AbortSignal = tokio_util::sync::CancellationToken;

/// Produces a client instance, optionally bound to a cancellation signal.
///
/// Mutations always call it with `None`.
pub type ClientGetter<C> = Arc<dyn Fn(Option<AbortSignal>) -> C + Send + Sync>;

/// Produces the process-wide cache registry handle.
pub type QueryClientGetter = Arc<dyn Fn() -> Arc<dyn QueryClient> + Send + Sync>;

/// Handle to the cache registry shared by all operations.
///
/// The factory only ever invalidates through it; reading and writing cached
/// data belongs to whatever layer drives the resolved configurations.
///
/// **IMPORTANT:** All methods use `&self`. Implementations share their store
/// through interior mutability.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Mark cached data under `key` (and every key it prefixes) as stale.
    ///
    /// # Errors
    /// Returns `Err` if the registry cannot process the request.
    async fn invalidate(&self, key: &QueryKey) -> Result<()>;

    /// Health check - verify the registry is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the registry is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Wrap a shared registry handle into a getter.
pub fn shared_query_client<Q>(client: Arc<Q>) -> QueryClientGetter
where
    Q: QueryClient + 'static,
{
    Arc::new(move || client.clone() as Arc<dyn QueryClient>)
}
