//! # query-kit
//!
//! Typed, declarative query and mutation definitions compiled into
//! ready-to-use data-fetching configurations.
//!
//! ## Features
//!
//! - **Declarative:** Describe each endpoint once as a definition record per namespace
//! - **Structural Keys:** Cache keys are `[namespace, operation, ...fragments]`, with an `all` key per namespace
//! - **Invalidation Built In:** Mutations invalidate their keys before your success callback runs
//! - **Error Reporting Policy:** One host-supplied error mapper, with per-definition opt-in/opt-out
//! - **Pagination:** Page-based infinite lists with 1-based, gap-free page parameters
//! - **Client Agnostic:** Bring your own client type and cache registry
//!
//! ## Quick Start
//!
//! ```ignore
//! use query_kit::{
//!     DefinitionRecord, QueryDef, MutationDef, QueryFactory, QueryResponse,
//!     registry::{shared_query_client, InMemoryQueryClient},
//!     response::ReportingErrorMapper,
//! };
//! use std::sync::Arc;
//!
//! // 1. Wire the collaborators
//! let registry = Arc::new(InMemoryQueryClient::new());
//! let factory = QueryFactory::new(
//!     |signal| ApiClient::new(signal),
//!     shared_query_client(registry.clone()),
//!     ReportingErrorMapper::new(|msg: &str| show_toast(msg)),
//! );
//!
//! // 2. Declare the namespace
//! let users = factory.create_queries(
//!     "users",
//!     DefinitionRecord::new()
//!         .with("list", QueryDef::new(|api: ApiClient| async move { api.list_users().await }))
//!         .with_param("by_id", |id: i64| {
//!             QueryDef::new(move |api: ApiClient| async move { api.user(id).await }).key([id])
//!         }),
//! );
//!
//! // 3. Use the resolved configurations
//! let list = registry.fetch_query(users.get_static("list").unwrap()).await?;
//! let user = users.call("by_id", 7).unwrap().fetch().await?;
//!
//! // 4. Invalidate the whole namespace
//! factory.invalidate_namespace("users").await?;
//! ```

#[macro_use]
extern crate log;

pub mod autosave;
pub mod binder;
pub mod definition;
pub mod error;
pub mod factory;
pub mod invalidation;
pub mod key;
pub mod observability;
pub mod options;
pub mod pagination;
pub mod registry;
pub mod resolved;
pub mod response;
pub mod snapshot;
pub mod state;

// Re-exports for convenience
pub use autosave::AutoSave;
pub use definition::{ActionDef, Definition, DefinitionRecord, InfiniteDef, MutationDef, QueryDef};
pub use error::{Error, Result};
pub use factory::{MutationRecord, QueryFactory, QueryRecord, Resolved};
pub use key::{KeyPart, QueryKey};
pub use options::{MutationOptions, QueryOptions};
pub use pagination::{InfiniteData, InfiniteLoader, InfiniteQueryConfig, PageResponse};
pub use registry::QueryClient;
pub use resolved::{ActionConfig, MutationConfig, QueryConfig};
pub use response::{ErrorMapper, QueryResponse};
pub use state::DataState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
