//! Pass-through options carried unchanged from definitions to resolved configurations.

use std::time::Duration;

/// Options forwarded to the fetch side of a configuration.
///
/// The factory never interprets these; they exist so the layer driving the
/// configuration receives them alongside the bound function.
///
/// # Example
///
/// ```
/// use query_kit::QueryOptions;
/// use std::time::Duration;
///
/// let options = QueryOptions::default()
///     .with_stale_time(Duration::from_secs(30))
///     .with_retry(2);
/// assert!(options.enabled);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOptions {
    /// Whether the fetch should run automatically.
    pub enabled: bool,

    /// How long a result stays fresh. `None` = fresh until invalidated.
    pub stale_time: Option<Duration>,

    /// How long an unused result is kept before collection.
    pub gc_time: Option<Duration>,

    /// Poll interval, if any.
    pub refetch_interval: Option<Duration>,

    /// Retry count for failed fetches. `None` = runtime default.
    pub retry: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            enabled: true,
            stale_time: None,
            gc_time: None,
            refetch_interval: None,
            retry: None,
        }
    }
}

impl QueryOptions {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(gc_time);
        self
    }

    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry = Some(count);
        self
    }
}

/// Options forwarded to the mutate side of a configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationOptions {
    pub retry: Option<u32>,
    pub gc_time: Option<Duration>,
}

impl MutationOptions {
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry = Some(count);
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(gc_time);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_options_default() {
        let options = QueryOptions::default();
        assert!(options.enabled);
        assert_eq!(options.stale_time, None);
        assert_eq!(options.retry, None);
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::default()
            .with_enabled(false)
            .with_stale_time(Duration::from_secs(60))
            .with_refetch_interval(Duration::from_secs(5))
            .with_retry(3);

        assert!(!options.enabled);
        assert_eq!(options.stale_time, Some(Duration::from_secs(60)));
        assert_eq!(options.refetch_interval, Some(Duration::from_secs(5)));
        assert_eq!(options.retry, Some(3));
    }

    #[test]
    fn test_mutation_options_builder() {
        let options = MutationOptions::default().with_retry(1);
        assert_eq!(options.retry, Some(1));
        assert_eq!(options.gc_time, None);
    }
}
