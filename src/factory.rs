//! Definition factory.
//!
//! Turns declarative definition records into resolved configurations.
//! Builders are pure transforms: they hold no state between calls and never
//! touch the cache registry themselves; only the success handlers they
//! synthesize do.
//!
//! # Example
//!
//! ```ignore
//! let factory = QueryFactory::new(|signal| Api::new(signal), shared_query_client(registry), mapper);
//!
//! let users = factory.create_queries(
//!     "users",
//!     DefinitionRecord::new()
//!         .with("list", QueryDef::new(|api: Api| async move { api.list_users().await }))
//!         .with_param("by_id", |id: i64| {
//!             QueryDef::new(move |api: Api| async move { api.get_user(id).await }).key([id])
//!         }),
//! );
//!
//! let list = users.get_static("list");           // key ["users", "list"]
//! let one = users.call("by_id", 7);              // key ["users", "by_id", 7]
//! let everything = users.all();                  // key ["users"]
//! ```

use crate::binder::{bind_mutation_fn, bind_query_fn, instrument_mutation_fn, instrument_query_fn};
use crate::definition::{ActionDef, Definition, DefinitionRecord, InfiniteDef, MutationDef, QueryDef};
use crate::error::Result;
use crate::invalidation::{compose_on_success, invalidate_namespace};
use crate::key::{identity_transform, KeyTransform, QueryKey, QueryKeyBuilder};
use crate::observability::{NoOpMetrics, QueryMetrics};
use crate::pagination::{build_infinite_options, InfiniteQueryConfig};
use crate::registry::{AbortSignal, ClientGetter, QueryClientGetter};
use crate::resolved::{ActionConfig, MutationConfig, QueryConfig};
use crate::response::ErrorMapper;
use indexmap::IndexMap;
use std::sync::Arc;

/// A record entry after resolution: a ready configuration, or a function of
/// call arguments producing one.
pub enum Resolved<A, R> {
    Static(R),
    Parameterized(Arc<dyn Fn(A) -> R + Send + Sync>),
}

impl<A, R> Resolved<A, R> {
    /// The configuration of a static entry.
    pub fn get(&self) -> Option<&R> {
        match self {
            Resolved::Static(config) => Some(config),
            Resolved::Parameterized(_) => None,
        }
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, Resolved::Parameterized(_))
    }
}

impl<A, R: Clone> Resolved<A, R> {
    /// Produce the configuration. Static entries ignore `args`.
    pub fn call(&self, args: A) -> R {
        match self {
            Resolved::Static(config) => config.clone(),
            Resolved::Parameterized(build) => build(args),
        }
    }
}

/// Resolved fetch-capable record: named entries plus the namespace-wide `all` key.
pub struct QueryRecord<A, R> {
    all: QueryKey,
    entries: IndexMap<String, Resolved<A, R>>,
}

impl<A, R> QueryRecord<A, R> {
    /// `[namespace]`, a strict prefix of every entry key.
    pub fn all(&self) -> &QueryKey {
        &self.all
    }

    pub fn get(&self, name: &str) -> Option<&Resolved<A, R>> {
        self.entries.get(name)
    }

    /// Configuration of a static entry.
    pub fn get_static(&self, name: &str) -> Option<&R> {
        self.get(name).and_then(Resolved::get)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A, R: Clone> QueryRecord<A, R> {
    pub fn call(&self, name: &str, args: A) -> Option<R> {
        self.get(name).map(|entry| entry.call(args))
    }
}

/// Resolved mutation record. Mutations are not cached, so there is no `all` key.
pub struct MutationRecord<A, R> {
    entries: IndexMap<String, Resolved<A, R>>,
}

impl<A, R> MutationRecord<A, R> {
    pub fn get(&self, name: &str) -> Option<&Resolved<A, R>> {
        self.entries.get(name)
    }

    pub fn get_static(&self, name: &str) -> Option<&R> {
        self.get(name).and_then(Resolved::get)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A, R: Clone> MutationRecord<A, R> {
    pub fn call(&self, name: &str, args: A) -> Option<R> {
        self.get(name).map(|entry| entry.call(args))
    }
}

type BuildFn<C, E, D, R> = fn(&QueryFactory<C, E>, &str, &str, D) -> R;

/// Builds resolved configurations for client type `C` with response errors `E`.
///
/// Cheap to clone; every field is shared.
pub struct QueryFactory<C, E> {
    client_getter: ClientGetter<C>,
    query_client: QueryClientGetter,
    error_mapper: Arc<dyn ErrorMapper<E>>,
    key_transform: KeyTransform,
    metrics: Arc<dyn QueryMetrics>,
}

impl<C, E> Clone for QueryFactory<C, E> {
    fn clone(&self) -> Self {
        QueryFactory {
            client_getter: self.client_getter.clone(),
            query_client: self.query_client.clone(),
            error_mapper: self.error_mapper.clone(),
            key_transform: self.key_transform.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C, E> QueryFactory<C, E>
where
    C: 'static,
    E: Send + 'static,
{
    /// Create a factory with the identity key transform and no-op metrics.
    pub fn new<G, M>(client_getter: G, query_client: QueryClientGetter, error_mapper: M) -> Self
    where
        G: Fn(Option<AbortSignal>) -> C + Send + Sync + 'static,
        M: ErrorMapper<E> + 'static,
    {
        QueryFactory {
            client_getter: Arc::new(client_getter),
            query_client,
            error_mapper: Arc::new(error_mapper),
            key_transform: identity_transform(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Transform applied to every composed operation key (not to `all`).
    pub fn with_key_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(QueryKey) -> QueryKey + Send + Sync + 'static,
    {
        self.key_transform = Arc::new(transform);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn query_client(&self) -> QueryClientGetter {
        self.query_client.clone()
    }

    /// Invalidate every cached key of `namespace`.
    pub async fn invalidate_namespace(&self, namespace: &str) -> Result<()> {
        invalidate_namespace(&self.query_client, namespace).await
    }

    // ------------------------------------------------------------------------
    // Single-entry builders
    // ------------------------------------------------------------------------

    pub fn build_query<T>(&self, namespace: &str, operation: &str, definition: QueryDef<C, T, E>) -> QueryConfig<T>
    where
        T: Send + 'static,
    {
        let query_key = QueryKeyBuilder::build(namespace, operation, &definition.key, &self.key_transform);
        let should_report = definition.toast_error.unwrap_or(false);

        let query_fn = bind_query_fn(
            should_report,
            self.client_getter.clone(),
            self.error_mapper.clone(),
            definition.query_fn,
        );

        QueryConfig {
            query_fn: instrument_query_fn(query_key.clone(), query_fn, self.metrics.clone()),
            query_key,
            initial_data: definition.initial_data,
            options: definition.options,
        }
    }

    pub fn build_mutation<V, T>(
        &self,
        namespace: &str,
        operation: &str,
        definition: MutationDef<C, V, T, E>,
    ) -> MutationConfig<V, T>
    where
        V: Send + 'static,
        T: Send + 'static,
    {
        let should_report = definition.toast_error.unwrap_or(true);
        debug!(
            "Building mutation {}.{} ({} invalidation keys)",
            namespace,
            operation,
            definition.invalidate_keys.len()
        );

        let mutation_fn = bind_mutation_fn(
            should_report,
            self.client_getter.clone(),
            self.error_mapper.clone(),
            definition.mutation_fn,
        );

        MutationConfig {
            mutation_fn: instrument_mutation_fn(mutation_fn, self.metrics.clone()),
            on_success: compose_on_success(
                self.query_client.clone(),
                definition.invalidate_keys,
                definition.on_success,
                self.metrics.clone(),
            ),
            options: definition.options,
        }
    }

    /// Both sides report response errors unless the definition opts out.
    /// The invalidation set is the action's own key followed by its extra keys.
    pub fn build_action<T, V, M>(
        &self,
        namespace: &str,
        operation: &str,
        definition: ActionDef<C, T, V, E, M>,
    ) -> ActionConfig<T, V, M>
    where
        T: Send + 'static,
        V: Send + 'static,
        M: Send + 'static,
    {
        let query_key = QueryKeyBuilder::build(namespace, operation, &definition.key, &self.key_transform);
        let should_report = definition.toast_error.unwrap_or(true);

        let query_fn = bind_query_fn(
            should_report,
            self.client_getter.clone(),
            self.error_mapper.clone(),
            definition.query_fn,
        );
        let mutation_fn = bind_mutation_fn(
            should_report,
            self.client_getter.clone(),
            self.error_mapper.clone(),
            definition.mutation_fn,
        );

        let mut invalidate_keys = Vec::with_capacity(definition.invalidate_keys.len() + 1);
        invalidate_keys.push(query_key.clone());
        invalidate_keys.extend(definition.invalidate_keys);

        ActionConfig {
            query: QueryConfig {
                query_fn: instrument_query_fn(query_key.clone(), query_fn, self.metrics.clone()),
                query_key,
                initial_data: definition.initial_data,
                options: definition.query_options,
            },
            mutation: MutationConfig {
                mutation_fn: instrument_mutation_fn(mutation_fn, self.metrics.clone()),
                on_success: compose_on_success(
                    self.query_client.clone(),
                    invalidate_keys,
                    definition.on_success,
                    self.metrics.clone(),
                ),
                options: definition.mutation_options,
            },
            query_client: self.query_client.clone(),
        }
    }

    pub fn build_infinite<T>(
        &self,
        namespace: &str,
        operation: &str,
        definition: InfiniteDef<C, T, E>,
    ) -> InfiniteQueryConfig<T>
    where
        T: Send + 'static,
    {
        build_infinite_options(
            namespace,
            operation,
            &self.key_transform,
            self.query_client.clone(),
            self.client_getter.clone(),
            self.error_mapper.clone(),
            definition,
        )
    }

    // ------------------------------------------------------------------------
    // Record builders
    // ------------------------------------------------------------------------

    pub fn create_queries<A, T>(
        &self,
        namespace: &str,
        definitions: DefinitionRecord<A, QueryDef<C, T, E>>,
    ) -> QueryRecord<A, QueryConfig<T>>
    where
        A: 'static,
        T: Send + 'static,
    {
        QueryRecord {
            all: QueryKeyBuilder::all(namespace),
            entries: self.resolve_record(namespace, definitions, Self::build_query::<T>),
        }
    }

    pub fn create_mutations<A, V, T>(
        &self,
        namespace: &str,
        definitions: DefinitionRecord<A, MutationDef<C, V, T, E>>,
    ) -> MutationRecord<A, MutationConfig<V, T>>
    where
        A: 'static,
        V: Send + 'static,
        T: Send + 'static,
    {
        MutationRecord {
            entries: self.resolve_record(namespace, definitions, Self::build_mutation::<V, T>),
        }
    }

    pub fn create_actions<A, T, V, M>(
        &self,
        namespace: &str,
        definitions: DefinitionRecord<A, ActionDef<C, T, V, E, M>>,
    ) -> QueryRecord<A, ActionConfig<T, V, M>>
    where
        A: 'static,
        T: Send + 'static,
        V: Send + 'static,
        M: Send + 'static,
    {
        QueryRecord {
            all: QueryKeyBuilder::all(namespace),
            entries: self.resolve_record(namespace, definitions, Self::build_action::<T, V, M>),
        }
    }

    pub fn create_infinite_queries<A, T>(
        &self,
        namespace: &str,
        definitions: DefinitionRecord<A, InfiniteDef<C, T, E>>,
    ) -> QueryRecord<A, InfiniteQueryConfig<T>>
    where
        A: 'static,
        T: Send + 'static,
    {
        QueryRecord {
            all: QueryKeyBuilder::all(namespace),
            entries: self.resolve_record(namespace, definitions, Self::build_infinite::<T>),
        }
    }

    /// Build static entries now; defer parameterized ones until called.
    fn resolve_record<A, D, R>(
        &self,
        namespace: &str,
        definitions: DefinitionRecord<A, D>,
        build: BuildFn<C, E, D, R>,
    ) -> IndexMap<String, Resolved<A, R>>
    where
        A: 'static,
        D: 'static,
        R: 'static,
    {
        debug!("Resolving {} definitions for namespace {}", definitions.len(), namespace);

        definitions
            .into_entries()
            .map(|(name, definition)| {
                let resolved = match definition {
                    Definition::Static(definition) => {
                        Resolved::Static(build(self, namespace, &name, definition))
                    }
                    Definition::Parameterized(produce) => {
                        let factory = self.clone();
                        let namespace = namespace.to_string();
                        let operation = name.clone();
                        Resolved::Parameterized(Arc::new(move |args: A| {
                            build(&factory, &namespace, &operation, produce(args))
                        }))
                    }
                };
                (name, resolved)
            })
            .collect()
    }
}
