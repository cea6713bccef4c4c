//! Pagination adapter for infinite lists.
//!
//! Turns a single page-fetch definition into an infinite-fetch configuration:
//! composed key, page-fetch function, next-page derivation and optional seed
//! page. Page numbers are 1-based and advance by exactly one; pages are never
//! skipped or reordered.
//!
//! [`InfiniteLoader`] is a small driver that accumulates pages the way an
//! infinite-scroll list does, minus the visibility trigger.

use crate::definition::InfiniteDef;
use crate::error::Result;
use crate::key::{KeyTransform, QueryKey, QueryKeyBuilder};
use crate::registry::{ClientGetter, QueryClientGetter};
use crate::response::ErrorMapper;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// First page parameter of every infinite configuration.
pub const INITIAL_PAGE_PARAM: u32 = 1;

/// One page of results.
///
/// Invariant: `page <= total_pages`. Pagination is exhausted on the last page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub results: Vec<T>,
}

impl<T> PageResponse<T> {
    /// True on the last page.
    ///
    /// A page past `total_pages` (including any page of an empty result set,
    /// where `total_pages == 0`) also counts as last, so pagination always
    /// terminates.
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }
}

/// Next page parameter, or `None` when there are no further pages.
pub fn next_page_param<T>(page: &PageResponse<T>) -> Option<u32> {
    if page.is_last() {
        None
    } else {
        Some(page.page + 1)
    }
}

/// Accumulated pages and the parameters they were fetched with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfiniteData<T> {
    pub pages: Vec<PageResponse<T>>,
    pub page_params: Vec<u32>,
}

impl<T> InfiniteData<T> {
    pub fn new() -> Self {
        InfiniteData {
            pages: Vec::new(),
            page_params: Vec::new(),
        }
    }

    /// State holding only `page`, fetched with the initial page parameter.
    pub fn seeded(page: PageResponse<T>) -> Self {
        InfiniteData {
            pages: vec![page],
            page_params: vec![INITIAL_PAGE_PARAM],
        }
    }

    pub fn push(&mut self, page: PageResponse<T>, param: u32) {
        self.pages.push(page);
        self.page_params.push(param);
    }

    pub fn last_page(&self) -> Option<&PageResponse<T>> {
        self.pages.last()
    }

    pub fn has_next_page(&self) -> bool {
        self.last_page().and_then(next_page_param).is_some()
    }

    /// All results in page order.
    pub fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.results.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl<T: Clone> InfiniteData<T> {
    pub fn items(&self) -> Vec<T> {
        self.iter_items().cloned().collect()
    }
}

impl<T> Default for InfiniteData<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bound page-fetch function. `None` means the initial page.
pub type PageFn<T> =
    Arc<dyn Fn(Option<u32>) -> BoxFuture<'static, Result<PageResponse<T>>> + Send + Sync>;

/// Infinite-fetch configuration.
pub struct InfiniteQueryConfig<T> {
    pub query_key: QueryKey,
    pub query_fn: PageFn<T>,
    pub get_next_page_param: fn(&PageResponse<T>) -> Option<u32>,
    pub initial_page_param: u32,
    pub initial_data: Option<InfiniteData<T>>,
    pub enabled: bool,
    pub query_client: QueryClientGetter,
}

impl<T: Clone> Clone for InfiniteQueryConfig<T> {
    fn clone(&self) -> Self {
        InfiniteQueryConfig {
            query_key: self.query_key.clone(),
            query_fn: self.query_fn.clone(),
            get_next_page_param: self.get_next_page_param,
            initial_page_param: self.initial_page_param,
            initial_data: self.initial_data.clone(),
            enabled: self.enabled,
            query_client: self.query_client.clone(),
        }
    }
}

impl<T> InfiniteQueryConfig<T> {
    pub async fn fetch_page(&self, page: Option<u32>) -> Result<PageResponse<T>> {
        (self.query_fn)(page).await
    }
}

/// Build an infinite-fetch configuration from a page definition.
#[allow(clippy::too_many_arguments)]
pub fn build_infinite_options<C, T, E>(
    namespace: &str,
    operation: &str,
    key_transform: &KeyTransform,
    query_client: QueryClientGetter,
    client_getter: ClientGetter<C>,
    error_mapper: Arc<dyn ErrorMapper<E>>,
    definition: InfiniteDef<C, T, E>,
) -> InfiniteQueryConfig<T>
where
    C: 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let query_key = QueryKeyBuilder::build(namespace, operation, &definition.key, key_transform);
    let should_report = definition.toast_error.unwrap_or(false);
    let page_fn = definition.page_fn;
    let fetch_key = query_key.clone();

    let query_fn: PageFn<T> = Arc::new(move |param| {
        let page = param.filter(|p| *p > 0).unwrap_or(INITIAL_PAGE_PARAM);
        debug!("Fetching page {} of {}", page, fetch_key);

        let pending = page_fn(client_getter(None), page);
        let error_mapper = error_mapper.clone();

        async move {
            let response = pending.await?;
            response.into_result(error_mapper.as_ref(), should_report)
        }
        .boxed()
    });

    InfiniteQueryConfig {
        query_key,
        query_fn,
        get_next_page_param: next_page_param::<T>,
        initial_page_param: INITIAL_PAGE_PARAM,
        initial_data: definition.initial_data.map(InfiniteData::seeded),
        enabled: definition.enabled,
        query_client,
    }
}

/// Accumulates pages of an [`InfiniteQueryConfig`].
///
/// # Example
///
/// ```ignore
/// let mut loader = InfiniteLoader::new(movies.popular.clone());
/// while loader.fetch_next_page().await? {}
/// let all = loader.items();
/// ```
pub struct InfiniteLoader<T> {
    config: InfiniteQueryConfig<T>,
    data: Option<InfiniteData<T>>,
}

impl<T: Clone> InfiniteLoader<T> {
    /// Start from the configuration's seed state, if any.
    pub fn new(config: InfiniteQueryConfig<T>) -> Self {
        let data = config.initial_data.clone();
        InfiniteLoader { config, data }
    }

    pub fn config(&self) -> &InfiniteQueryConfig<T> {
        &self.config
    }

    pub fn data(&self) -> Option<&InfiniteData<T>> {
        self.data.as_ref()
    }

    /// Parameter of the page the next [`fetch_next_page`](Self::fetch_next_page)
    /// would load, or `None` when exhausted.
    pub fn next_param(&self) -> Option<u32> {
        match self.data.as_ref().and_then(InfiniteData::last_page) {
            None => Some(self.config.initial_page_param),
            Some(last) => (self.config.get_next_page_param)(last),
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_param().is_some()
    }

    /// Fetch and append the next page.
    ///
    /// Returns `Ok(false)` without fetching when pagination is exhausted.
    /// On error nothing is appended.
    pub async fn fetch_next_page(&mut self) -> Result<bool> {
        let Some(param) = self.next_param() else {
            debug!("No further pages for {}", self.config.query_key);
            return Ok(false);
        };

        let page = self.config.fetch_page(Some(param)).await?;
        self.data
            .get_or_insert_with(InfiniteData::new)
            .push(page, param);
        Ok(true)
    }

    /// Flattened results loaded so far (the seed page's results before any fetch).
    pub fn items(&self) -> Vec<T> {
        self.data.as_ref().map(InfiniteData::items).unwrap_or_default()
    }

    /// Drop everything fetched and return to the seed state.
    pub fn reset(&mut self) {
        self.data = self.config.initial_data.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::key::identity_transform;
    use crate::query_key;
    use crate::registry::{shared_query_client, InMemoryQueryClient};
    use crate::response::QueryResponse;
    use parking_lot::Mutex;

    fn page(page: u32, total_pages: u32, results: Vec<u32>) -> PageResponse<u32> {
        PageResponse {
            page,
            total_pages,
            total_results: u64::from(total_pages) * 2,
            results,
        }
    }

    #[derive(Clone)]
    struct Api {
        requested: Arc<Mutex<Vec<u32>>>,
    }

    fn definition(total_pages: u32) -> InfiniteDef<Api, u32, String> {
        InfiniteDef::new(move |api: Api, p: u32| {
            api.requested.lock().push(p);
            async move {
                Ok(QueryResponse::ok(PageResponse {
                    page: p,
                    total_pages,
                    total_results: u64::from(total_pages) * 2,
                    results: vec![p * 10, p * 10 + 1],
                }))
            }
        })
    }

    fn build(def: InfiniteDef<Api, u32, String>, api: Api) -> InfiniteQueryConfig<u32> {
        let mapper = |e: String, _report: bool| Error::Response(e);
        build_infinite_options(
            "movies",
            "popular",
            &identity_transform(),
            shared_query_client(Arc::new(InMemoryQueryClient::new())),
            Arc::new(move |_| api.clone()),
            Arc::new(mapper),
            def,
        )
    }

    fn api() -> Api {
        Api {
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[test]
    fn test_next_page_param() {
        assert_eq!(next_page_param(&page(2, 2, vec![])), None);
        assert_eq!(next_page_param(&page(2, 5, vec![])), Some(3));
        assert_eq!(next_page_param(&page(1, 0, vec![])), None);
    }

    #[test]
    fn test_seeded_state() {
        let seed = page(1, 3, vec![1, 2]);
        let data = InfiniteData::seeded(seed.clone());
        assert_eq!(data.pages, vec![seed]);
        assert_eq!(data.page_params, vec![1]);
    }

    #[test]
    fn test_build_key_and_defaults() {
        let config = build(definition(3).key(["weekly"]), api());
        assert_eq!(config.query_key, query_key!["movies", "popular", "weekly"]);
        assert_eq!(config.initial_page_param, 1);
        assert!(config.initial_data.is_none());
        assert!(config.enabled);
    }

    #[test]
    fn test_build_with_seed_page() {
        let seed = page(1, 3, vec![7]);
        let config = build(definition(3).initial_data(seed.clone()), api());
        assert_eq!(config.initial_data, Some(InfiniteData::seeded(seed)));
    }

    #[tokio::test]
    async fn test_page_fn_defaults_to_first_page() {
        let api = api();
        let config = build(definition(3), api.clone());

        let first = config.fetch_page(None).await.expect("fetch failed");
        let third = config.fetch_page(Some(3)).await.expect("fetch failed");

        assert_eq!(first.page, 1);
        assert_eq!(third.page, 3);
        assert_eq!(*api.requested.lock(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_page_zero_requests_first_page() {
        let api = api();
        let config = build(definition(3), api.clone());

        let page = config.fetch_page(Some(0)).await.expect("fetch failed");

        assert_eq!(page.page, 1);
        assert_eq!(*api.requested.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_loader_walks_all_pages_in_order() {
        let api = api();
        let mut loader = InfiniteLoader::new(build(definition(3), api.clone()));

        assert!(loader.items().is_empty());
        while loader.fetch_next_page().await.expect("fetch failed") {}

        assert_eq!(*api.requested.lock(), vec![1, 2, 3]);
        assert_eq!(loader.items(), vec![10, 11, 20, 21, 30, 31]);
        assert_eq!(
            loader.data().map(|d| d.page_params.clone()),
            Some(vec![1, 2, 3])
        );
        assert!(!loader.has_next_page());
        assert!(!loader.fetch_next_page().await.expect("fetch failed"));
    }

    #[tokio::test]
    async fn test_loader_continues_after_seed_page() {
        let api = api();
        let seed = page(1, 2, vec![1]);
        let mut loader = InfiniteLoader::new(build(definition(2).initial_data(seed), api.clone()));

        assert_eq!(loader.items(), vec![1]);
        assert_eq!(loader.next_param(), Some(2));

        assert!(loader.fetch_next_page().await.expect("fetch failed"));
        assert_eq!(*api.requested.lock(), vec![2]);
        assert_eq!(loader.items(), vec![1, 20, 21]);

        loader.reset();
        assert_eq!(loader.items(), vec![1]);
    }

    #[tokio::test]
    async fn test_loader_error_appends_nothing() {
        let failing: InfiniteDef<Api, u32, String> =
            InfiniteDef::new(|_api: Api, _p: u32| async { Ok(QueryResponse::err("rate limited".to_string())) });
        let mut loader = InfiniteLoader::new(build(failing, api()));

        let result = loader.fetch_next_page().await;
        assert_eq!(result, Err(Error::Response("rate limited".to_string())));
        assert!(loader.data().is_none());
        assert_eq!(loader.next_param(), Some(1));
    }
}
