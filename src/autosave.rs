//! Debounced auto-save over an action.
//!
//! [`AutoSave`] keeps a local copy of an action's data. Every local edit
//! replaces it immediately and (re)starts a debounce timer; when the timer
//! fires, the latest value is sent through the action's mutate side.
//!
//! ```ignore
//! let settings = AutoSave::new(factory.build_action("profile", "settings", def), Duration::from_millis(500))?;
//! settings.update(|s| Settings { theme: Theme::Dark, ..s.clone() });
//! // ...500ms later the mutation runs once with the final value
//! ```

use crate::error::{Error, Result};
use crate::key::QueryKey;
use crate::resolved::ActionConfig;
use crate::snapshot::{deep_equal, Snapshot};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Restartable one-shot timer.
///
/// Scheduling replaces any task still waiting on the timer. A task whose
/// timer already fired runs to completion even if the debouncer is
/// rescheduled or cancelled afterwards.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` once `delay` has elapsed without another call to `schedule`.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Stop the timer. Returns `true` if a task was still waiting.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

struct State<T> {
    data: T,
    seed: Snapshot,
    generation: u64,
    last_error: Option<Error>,
}

struct Inner<T> {
    action: ActionConfig<T, T, T>,
    state: Mutex<State<T>>,
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Apply a save result unless a newer edit happened since `generation`.
    fn settle(&self, generation: u64, result: &Result<T>) {
        let mut state = self.state.lock();
        match result {
            Ok(saved) if state.generation == generation => {
                state.data = saved.clone();
                state.last_error = None;
            }
            Ok(_) => {
                debug!(
                    "Discarding save result for {}: newer local edit pending",
                    self.action.query_key()
                );
            }
            Err(e) => {
                warn!("Auto-save of {} failed: {}", self.action.query_key(), e);
                state.last_error = Some(e.clone());
            }
        }
    }
}

/// Debounced local state persisted through an action's mutation.
pub struct AutoSave<T> {
    inner: Arc<Inner<T>>,
    debouncer: Debouncer,
}

impl<T> AutoSave<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Start from the action's initial data.
    ///
    /// # Errors
    /// `Error::ConfigError` when the action has no initial data.
    pub fn new(action: ActionConfig<T, T, T>, delay: Duration) -> Result<Self> {
        let Some(data) = action.query.initial_data() else {
            return Err(Error::ConfigError(format!(
                "auto-save for {} requires initial data",
                action.query_key()
            )));
        };
        let seed = Snapshot::capture(&data);

        Ok(AutoSave {
            inner: Arc::new(Inner {
                action,
                state: Mutex::new(State {
                    data,
                    seed,
                    generation: 0,
                    last_error: None,
                }),
            }),
            debouncer: Debouncer::new(delay),
        })
    }

    pub fn query_key(&self) -> &QueryKey {
        self.inner.action.query_key()
    }

    /// Current local value.
    pub fn data(&self) -> T {
        self.inner.state.lock().data.clone()
    }

    /// Replace the local value and schedule a save.
    pub fn set(&self, value: T) {
        let generation = {
            let mut state = self.inner.state.lock();
            state.data = value.clone();
            state.generation += 1;
            state.generation
        };
        self.schedule_save(value, generation);
    }

    /// Derive the new local value from the current one and schedule a save.
    ///
    /// `f` runs without the state lock held, so it may read this `AutoSave`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.data();
        self.set(f(&current));
    }

    /// Observe a new upstream seed value.
    ///
    /// Replaces the local value when `seed` differs structurally from the
    /// previously observed seed. Returns whether it did.
    pub fn sync_seed(&self, seed: T) -> bool {
        let snapshot = Snapshot::capture(&seed);
        let mut state = self.inner.state.lock();
        if deep_equal(&state.seed, &snapshot) {
            return false;
        }

        debug!("Seed for {} changed, replacing local value", self.query_key());
        state.seed = snapshot;
        state.data = seed;
        true
    }

    /// Cancel the pending timer and save the current value now.
    pub async fn flush(&self) -> Result<T> {
        self.debouncer.cancel();
        let (value, generation) = {
            let state = self.inner.state.lock();
            (state.data.clone(), state.generation)
        };

        let result = self.inner.action.mutate(value).await;
        self.inner.settle(generation, &result);
        result
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Error of the most recent failed save, cleared by the next successful one.
    pub fn last_error(&self) -> Option<Error> {
        self.inner.state.lock().last_error.clone()
    }

    fn schedule_save(&self, value: T, generation: u64) {
        let inner = self.inner.clone();
        self.debouncer.schedule(async move {
            let result = inner.action.mutate(value).await;
            inner.settle(generation, &result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::QueryFn;
    use crate::definition::{success_callback, InitialData};
    use crate::options::{MutationOptions, QueryOptions};
    use crate::query_key;
    use crate::registry::{shared_query_client, InMemoryQueryClient};
    use crate::resolved::{MutationConfig, QueryConfig};
    use futures::FutureExt;

    const DELAY: Duration = Duration::from_millis(50);

    type Saved = Arc<Mutex<Vec<u32>>>;

    fn action(initial: Option<u32>, latency: Duration, fail: bool) -> (ActionConfig<u32, u32, u32>, Saved) {
        let saved: Saved = Arc::new(Mutex::new(Vec::new()));
        let saved_clone = saved.clone();
        let query_fn: QueryFn<u32> = Arc::new(|_| async { Ok(0) }.boxed());

        let config = ActionConfig {
            query: QueryConfig {
                query_key: query_key!["settings", "volume"],
                query_fn,
                initial_data: initial.map(InitialData::Value),
                options: QueryOptions::default(),
            },
            mutation: MutationConfig {
                mutation_fn: Arc::new(move |v: u32| {
                    saved_clone.lock().push(v);
                    async move {
                        tokio::time::sleep(latency).await;
                        if fail {
                            Err(Error::Transport("offline".into()))
                        } else {
                            Ok(v * 10)
                        }
                    }
                    .boxed()
                }),
                on_success: success_callback(|_: u32, _: u32, _ctx| async { Ok(()) }),
                options: MutationOptions::default(),
            },
            query_client: shared_query_client(Arc::new(InMemoryQueryClient::new())),
        };
        (config, saved)
    }

    #[test]
    fn test_cold_action_rejected() {
        let (config, _) = action(None, Duration::ZERO, false);
        assert!(matches!(
            AutoSave::new(config, DELAY),
            Err(Error::ConfigError(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_save_once() {
        let (config, saved) = action(Some(1), Duration::ZERO, false);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.set(2);
        auto.set(3);
        auto.update(|v| v + 1);
        assert_eq!(auto.data(), 4);
        assert!(auto.is_pending());

        tokio::time::sleep(DELAY / 2).await;
        assert!(saved.lock().is_empty());

        tokio::time::sleep(DELAY).await;
        assert_eq!(*saved.lock(), vec![4]);
        // server result replaces the local value
        assert_eq!(auto.data(), 40);
        assert!(!auto.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_save_result_is_discarded() {
        let latency = Duration::from_millis(100);
        let (config, saved) = action(Some(0), latency, false);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.set(1);
        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        // first save in flight; a newer edit arrives
        auto.set(2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(auto.data(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*saved.lock(), vec![1, 2]);
        assert_eq!(auto.data(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_local_value() {
        let (config, _) = action(Some(1), Duration::ZERO, true);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.set(5);
        tokio::time::sleep(DELAY * 2).await;

        assert_eq!(auto.data(), 5);
        assert_eq!(auto.last_error(), Some(Error::Transport("offline".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_saves_immediately() {
        let (config, saved) = action(Some(1), Duration::ZERO, false);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.set(7);
        assert_eq!(auto.flush().await, Ok(70));
        assert!(!auto.is_pending());

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(*saved.lock(), vec![7]);
        assert_eq!(auto.data(), 70);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_closure_may_read_current_value() {
        let (config, saved) = action(Some(3), Duration::ZERO, false);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.update(|v| v + auto.data());
        assert_eq!(auto.data(), 6);

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(*saved.lock(), vec![6]);
    }

    #[tokio::test]
    async fn test_sync_seed_replaces_only_on_change() {
        let (config, _) = action(Some(1), Duration::ZERO, false);
        let auto = AutoSave::new(config, DELAY).expect("Failed to create");

        auto.set(5);
        assert!(!auto.sync_seed(1));
        assert_eq!(auto.data(), 5);

        assert!(auto.sync_seed(9));
        assert_eq!(auto.data(), 9);
        assert!(!auto.sync_seed(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel() {
        let ran = Arc::new(Mutex::new(0u32));
        let debouncer = Debouncer::new(DELAY);

        let ran_clone = ran.clone();
        debouncer.schedule(async move {
            *ran_clone.lock() += 1;
        });
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(*ran.lock(), 0);
    }
}
