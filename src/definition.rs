//! Declarative operation definitions.
//!
//! Definitions are written once by application code and consumed by the
//! [`QueryFactory`](crate::QueryFactory). They hold the raw client calls plus
//! everything the factory needs to build a configuration: explicit key
//! fragments, the reporting flag, initial data and pass-through options.
//!
//! A record entry is either a concrete definition or a function producing one
//! from call arguments, see [`Definition`].

use crate::error::Result;
use crate::key::{KeyPart, QueryKey};
use crate::options::{MutationOptions, QueryOptions};
use crate::pagination::PageResponse;
use crate::response::QueryResponse;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::Arc;

/// Raw fetch call: `(client) -> {data, error}`.
pub type RawQueryFn<C, T, E> =
    Arc<dyn Fn(C) -> BoxFuture<'static, Result<QueryResponse<T, E>>> + Send + Sync>;

/// Raw mutate call: `(client, variables) -> {data, error}`.
pub type RawMutationFn<C, V, T, E> =
    Arc<dyn Fn(C, V) -> BoxFuture<'static, Result<QueryResponse<T, E>>> + Send + Sync>;

/// Raw page call: `(client, page) -> {data: page, error}`.
pub type RawPageFn<C, T, E> =
    Arc<dyn Fn(C, u32) -> BoxFuture<'static, Result<QueryResponse<PageResponse<T>, E>>> + Send + Sync>;

/// Opaque value produced by an optimistic-update hook, handed to success handlers.
pub type MutationContext = Option<serde_json::Value>;

/// Success handler: `(data, variables, context)`.
pub type SuccessCallback<T, V> =
    Arc<dyn Fn(T, V, MutationContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Box a success handler closure.
pub fn success_callback<T, V, F, Fut>(callback: F) -> SuccessCallback<T, V>
where
    F: Fn(T, V, MutationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |data, variables, context| callback(data, variables, context).boxed())
}

fn raw_query_fn<C, T, E, F, Fut>(query_fn: F) -> RawQueryFn<C, T, E>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<QueryResponse<T, E>>> + Send + 'static,
{
    Arc::new(move |client| query_fn(client).boxed())
}

fn raw_mutation_fn<C, V, T, E, F, Fut>(mutation_fn: F) -> RawMutationFn<C, V, T, E>
where
    F: Fn(C, V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<QueryResponse<T, E>>> + Send + 'static,
{
    Arc::new(move |client, variables| mutation_fn(client, variables).boxed())
}

/// Initial value of a fetch definition, eager or lazily produced.
#[derive(Clone)]
pub enum InitialData<T> {
    Value(T),
    Thunk(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> InitialData<T> {
    pub fn resolve(&self) -> T {
        match self {
            InitialData::Value(value) => value.clone(),
            InitialData::Thunk(thunk) => thunk(),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// A fetch operation.
///
/// # Example
///
/// ```
/// use query_kit::{QueryDef, QueryResponse};
///
/// #[derive(Clone)]
/// struct Api;
///
/// let def: QueryDef<Api, Vec<String>, String> =
///     QueryDef::new(|_api: Api| async { Ok(QueryResponse::ok(vec!["a".to_string()])) })
///         .key(["active"])
///         .toast_error(true);
/// assert!(!def.has_initial_data());
/// ```
pub struct QueryDef<C, T, E> {
    pub(crate) query_fn: RawQueryFn<C, T, E>,
    pub(crate) key: Vec<KeyPart>,
    pub(crate) toast_error: Option<bool>,
    pub(crate) initial_data: Option<InitialData<T>>,
    pub(crate) options: QueryOptions,
}

impl<C, T, E> QueryDef<C, T, E> {
    pub fn new<F, Fut>(query_fn: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<QueryResponse<T, E>>> + Send + 'static,
    {
        QueryDef {
            query_fn: raw_query_fn(query_fn),
            key: Vec::new(),
            toast_error: None,
            initial_data: None,
            options: QueryOptions::default(),
        }
    }

    /// Key fragments appended after `[namespace, operation]`.
    pub fn key<I, P>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        self.key = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Report response-level errors to the user (default `false` for queries).
    pub fn toast_error(mut self, report: bool) -> Self {
        self.toast_error = Some(report);
        self
    }

    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(InitialData::Value(data));
        self
    }

    pub fn initial_data_with<F>(mut self, thunk: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.initial_data = Some(InitialData::Thunk(Arc::new(thunk)));
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key_fragments(&self) -> &[KeyPart] {
        &self.key
    }

    pub fn has_initial_data(&self) -> bool {
        self.initial_data.is_some()
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// A mutate operation.
///
/// Mutations are not cached individually; on success they invalidate the keys
/// listed with [`invalidate_keys`](Self::invalidate_keys) and then run the
/// optional success callback.
pub struct MutationDef<C, V, T, E> {
    pub(crate) mutation_fn: RawMutationFn<C, V, T, E>,
    pub(crate) toast_error: Option<bool>,
    pub(crate) invalidate_keys: Vec<QueryKey>,
    pub(crate) on_success: Option<SuccessCallback<T, V>>,
    pub(crate) options: MutationOptions,
}

impl<C, V, T, E> MutationDef<C, V, T, E> {
    pub fn new<F, Fut>(mutation_fn: F) -> Self
    where
        F: Fn(C, V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<QueryResponse<T, E>>> + Send + 'static,
    {
        MutationDef {
            mutation_fn: raw_mutation_fn(mutation_fn),
            toast_error: None,
            invalidate_keys: Vec::new(),
            on_success: None,
            options: MutationOptions::default(),
        }
    }

    /// Report response-level errors to the user (default `true` for mutations).
    pub fn toast_error(mut self, report: bool) -> Self {
        self.toast_error = Some(report);
        self
    }

    /// Keys invalidated after every successful mutation, in order.
    pub fn invalidate_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = QueryKey>,
    {
        self.invalidate_keys = keys.into_iter().collect();
        self
    }

    pub fn on_success<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(T, V, MutationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_success = Some(success_callback(callback));
        self
    }

    pub fn options(mut self, options: MutationOptions) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// Action
// ============================================================================

/// A fetch and a mutate operation over one logical resource.
///
/// `T` is the fetched data, `V` the mutation variables and `M` the data the
/// mutation returns (usually the same as `T`).
pub struct ActionDef<C, T, V, E, M = T> {
    pub(crate) query_fn: RawQueryFn<C, T, E>,
    pub(crate) mutation_fn: RawMutationFn<C, V, M, E>,
    pub(crate) key: Vec<KeyPart>,
    pub(crate) toast_error: Option<bool>,
    pub(crate) invalidate_keys: Vec<QueryKey>,
    pub(crate) on_success: Option<SuccessCallback<M, V>>,
    pub(crate) initial_data: Option<InitialData<T>>,
    pub(crate) query_options: QueryOptions,
    pub(crate) mutation_options: MutationOptions,
}

impl<C, T, V, E, M> ActionDef<C, T, V, E, M> {
    pub fn new<QF, QFut, MF, MFut>(query_fn: QF, mutation_fn: MF) -> Self
    where
        QF: Fn(C) -> QFut + Send + Sync + 'static,
        QFut: Future<Output = Result<QueryResponse<T, E>>> + Send + 'static,
        MF: Fn(C, V) -> MFut + Send + Sync + 'static,
        MFut: Future<Output = Result<QueryResponse<M, E>>> + Send + 'static,
    {
        ActionDef {
            query_fn: raw_query_fn(query_fn),
            mutation_fn: raw_mutation_fn(mutation_fn),
            key: Vec::new(),
            toast_error: None,
            invalidate_keys: Vec::new(),
            on_success: None,
            initial_data: None,
            query_options: QueryOptions::default(),
            mutation_options: MutationOptions::default(),
        }
    }

    pub fn key<I, P>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        self.key = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Applies to both sides of the action (default `true`).
    pub fn toast_error(mut self, report: bool) -> Self {
        self.toast_error = Some(report);
        self
    }

    /// Keys invalidated in addition to the action's own key.
    pub fn invalidate_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = QueryKey>,
    {
        self.invalidate_keys = keys.into_iter().collect();
        self
    }

    pub fn on_success<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(M, V, MutationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_success = Some(success_callback(callback));
        self
    }

    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(InitialData::Value(data));
        self
    }

    pub fn initial_data_with<F>(mut self, thunk: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.initial_data = Some(InitialData::Thunk(Arc::new(thunk)));
        self
    }

    pub fn query_options(mut self, options: QueryOptions) -> Self {
        self.query_options = options;
        self
    }

    pub fn mutation_options(mut self, options: MutationOptions) -> Self {
        self.mutation_options = options;
        self
    }
}

// ============================================================================
// Infinite
// ============================================================================

/// A page-fetch operation accumulated into an infinite list.
pub struct InfiniteDef<C, T, E> {
    pub(crate) page_fn: RawPageFn<C, T, E>,
    pub(crate) key: Vec<KeyPart>,
    pub(crate) toast_error: Option<bool>,
    pub(crate) initial_data: Option<PageResponse<T>>,
    pub(crate) enabled: bool,
}

impl<C, T, E> InfiniteDef<C, T, E> {
    pub fn new<F, Fut>(page_fn: F) -> Self
    where
        F: Fn(C, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<QueryResponse<PageResponse<T>, E>>> + Send + 'static,
    {
        InfiniteDef {
            page_fn: Arc::new(move |client, page| page_fn(client, page).boxed()),
            key: Vec::new(),
            toast_error: None,
            initial_data: None,
            enabled: true,
        }
    }

    pub fn key<I, P>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        self.key = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn toast_error(mut self, report: bool) -> Self {
        self.toast_error = Some(report);
        self
    }

    /// Seed page, stored as page 1 of the accumulated state.
    pub fn initial_data(mut self, page: PageResponse<T>) -> Self {
        self.initial_data = Some(page);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Static vs parameterized
// ============================================================================

/// A record entry: a concrete definition, or a function of call arguments
/// producing one.
///
/// Multiple arguments are passed as a tuple `A`.
pub enum Definition<A, D> {
    Static(D),
    Parameterized(Arc<dyn Fn(A) -> D + Send + Sync>),
}

impl<A, D> Definition<A, D> {
    pub fn parameterized<F>(f: F) -> Self
    where
        F: Fn(A) -> D + Send + Sync + 'static,
    {
        Definition::Parameterized(Arc::new(f))
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, Definition::Parameterized(_))
    }
}

impl<A, D> From<D> for Definition<A, D> {
    fn from(definition: D) -> Self {
        Definition::Static(definition)
    }
}

/// Insertion-ordered named definitions for one namespace.
pub struct DefinitionRecord<A, D> {
    entries: IndexMap<String, Definition<A, D>>,
}

impl<A, D> DefinitionRecord<A, D> {
    pub fn new() -> Self {
        DefinitionRecord {
            entries: IndexMap::new(),
        }
    }

    /// Add a static entry.
    pub fn with(mut self, name: impl Into<String>, definition: D) -> Self {
        self.insert(name, Definition::Static(definition));
        self
    }

    /// Add a parameterized entry.
    pub fn with_param<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> D + Send + Sync + 'static,
    {
        self.insert(name, Definition::parameterized(f));
        self
    }

    /// Insert an entry, replacing any previous entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, definition: Definition<A, D>) {
        self.entries.insert(name.into(), definition);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Definition<A, D>)> {
        self.entries.into_iter()
    }
}

impl<A, D> Default for DefinitionRecord<A, D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Api;

    fn list_def() -> QueryDef<Api, Vec<u32>, String> {
        QueryDef::new(|_api: Api| async { Ok(QueryResponse::ok(vec![1, 2, 3])) })
    }

    #[test]
    fn test_query_def_builder() {
        let def = list_def().key(["active", "recent"]).toast_error(true);
        assert_eq!(
            def.key_fragments(),
            &[KeyPart::from("active"), KeyPart::from("recent")]
        );
        assert_eq!(def.toast_error, Some(true));
        assert!(!def.has_initial_data());
    }

    #[test]
    fn test_initial_data_thunk_resolves_lazily() {
        let def = list_def().initial_data_with(|| vec![9]);
        assert!(def.has_initial_data());
        let initial = def.initial_data.expect("initial data missing");
        assert_eq!(initial.resolve(), vec![9]);
    }

    #[tokio::test]
    async fn test_raw_query_fn_is_callable() {
        let def = list_def();
        let response = (def.query_fn)(Api).await.expect("raw fetch failed");
        assert_eq!(response.data, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_mutation_def_defaults() {
        let def: MutationDef<Api, u32, u32, String> =
            MutationDef::new(|_api: Api, v: u32| async move { Ok(QueryResponse::ok(v)) });
        assert_eq!(def.toast_error, None);
        assert!(def.invalidate_keys.is_empty());
        assert!(def.on_success.is_none());
    }

    #[test]
    fn test_definition_record_preserves_order() {
        let record: DefinitionRecord<u32, QueryDef<Api, Vec<u32>, String>> =
            DefinitionRecord::new()
                .with("list", list_def())
                .with_param("by_owner", |owner: u32| list_def().key([owner]))
                .with("recent", list_def());

        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["list", "by_owner", "recent"]);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_definition_from_static() {
        let def: Definition<(), QueryDef<Api, Vec<u32>, String>> = list_def().into();
        assert!(!def.is_parameterized());
        let param: Definition<u32, QueryDef<Api, Vec<u32>, String>> =
            Definition::parameterized(|_| list_def());
        assert!(param.is_parameterized());
    }
}
