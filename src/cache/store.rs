//! In-memory query store shared by every view.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::options::QueryOptions;
use crate::api::ApiError;

type Value = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// Observable state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Fresh,
  Stale,
  Fetching,
  Error,
}

impl EntryStatus {
  pub fn label(self) -> &'static str {
    match self {
      Self::Fresh => "fresh",
      Self::Stale => "stale",
      Self::Fetching => "fetching",
      Self::Error => "error",
    }
  }
}

/// Point-in-time view of one entry, for callers and the cache inspector
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
  pub key: QueryKey,
  pub status: EntryStatus,
  pub has_value: bool,
  pub fetched_at: Option<Instant>,
  pub updated_at: Option<DateTime<Local>>,
  pub error: Option<ApiError>,
  pub observers: usize,
}

struct InFlight {
  generation: u64,
  result: SharedFetch,
}

struct Entry {
  value: Option<Value>,
  fetched_at: Option<Instant>,
  updated_at: Option<DateTime<Local>>,
  error: Option<ApiError>,
  invalidated: bool,
  /// Set when a fetch fails, cleared by the next success or invalidation
  failed: bool,
  /// Bumped by every invalidation; responses from older generations are dropped
  generation: u64,
  in_flight: Option<InFlight>,
  observers: usize,
  waiters: usize,
  last_used: Instant,
}

impl Entry {
  fn new() -> Self {
    Self {
      value: None,
      fetched_at: None,
      updated_at: None,
      error: None,
      invalidated: false,
      failed: false,
      generation: 0,
      in_flight: None,
      observers: 0,
      waiters: 0,
      last_used: Instant::now(),
    }
  }

  fn is_time_stale(&self, options: &QueryOptions) -> bool {
    self
      .fetched_at
      .map(|at| at.elapsed() >= options.stale_after)
      .unwrap_or(true)
  }

  fn is_fresh(&self, options: &QueryOptions) -> bool {
    self.value.is_some() && !self.invalidated && !self.is_time_stale(options)
  }

  fn status(&self, options: &QueryOptions) -> EntryStatus {
    if self.in_flight.is_some() {
      EntryStatus::Fetching
    } else if self.error.is_some() {
      EntryStatus::Error
    } else if self.is_fresh(options) {
      EntryStatus::Fresh
    } else {
      EntryStatus::Stale
    }
  }

  fn value_as<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.value.clone()?.downcast::<T>().ok()
  }

  fn is_idle(&self) -> bool {
    self.observers == 0 && self.waiters == 0 && self.in_flight.is_none()
  }
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
  /// Bumped by `clear`, so guards from before a reload never touch new entries
  epoch: u64,
}

/// Process-wide cache of server state, keyed by [`QueryKey`].
///
/// Constructed once at startup and handed to every consumer by clone. The
/// lock is never held across an `.await`.
#[derive(Clone)]
pub struct QueryStore {
  inner: Arc<Mutex<Inner>>,
  options: Arc<QueryOptions>,
}

impl QueryStore {
  pub fn new(options: QueryOptions) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner::default())),
      options: Arc::new(options),
    }
  }

  pub fn options(&self) -> &QueryOptions {
    &self.options
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Current state of `key`, if anything is known about it
  pub fn read(&self, key: QueryKey) -> Option<EntrySnapshot> {
    let inner = self.lock();
    inner
      .entries
      .get(&key)
      .map(|entry| self.snapshot_of(key, entry))
  }

  /// All entries ordered by key
  pub fn snapshot(&self) -> Vec<EntrySnapshot> {
    let inner = self.lock();
    let mut entries: Vec<EntrySnapshot> = inner
      .entries
      .iter()
      .map(|(key, entry)| self.snapshot_of(*key, entry))
      .collect();
    entries.sort_by_key(|e| e.key);
    entries
  }

  fn snapshot_of(&self, key: QueryKey, entry: &Entry) -> EntrySnapshot {
    EntrySnapshot {
      key,
      status: entry.status(&self.options),
      has_value: entry.value.is_some(),
      fetched_at: entry.fetched_at,
      updated_at: entry.updated_at,
      error: entry.error.clone(),
      observers: entry.observers,
    }
  }

  /// Last value stored for `key`, fresh or not
  pub fn peek<T: Send + Sync + 'static>(&self, key: QueryKey) -> Option<Arc<T>> {
    self.lock().entries.get(&key)?.value_as::<T>()
  }

  /// Error from the most recent settled fetch, cleared by the next success
  pub fn last_error(&self, key: QueryKey) -> Option<ApiError> {
    self.lock().entries.get(&key)?.error.clone()
  }

  /// Whether an observer of `key` should start a fetch now.
  ///
  /// True after an invalidation, or when nothing has been fetched yet. Never
  /// true while a fetch is running or after one failed; an invalidated entry
  /// whose refetch failed stays stale until the next explicit fetch.
  pub fn needs_refetch(&self, key: QueryKey) -> bool {
    let inner = self.lock();
    match inner.entries.get(&key) {
      Some(entry) => {
        entry.in_flight.is_none()
          && !entry.failed
          && (entry.invalidated || entry.value.is_none())
      }
      None => true,
    }
  }

  /// Return the cached value if fresh, otherwise load it.
  ///
  /// Concurrent callers for the same key share one load. A failed load is
  /// retried with backoff according to the store options; `NotFound` is final.
  pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<Arc<T>, ApiError>
  where
    T: PartialEq + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let (shared, epoch) = {
      let mut inner = self.lock();
      let epoch = inner.epoch;
      let entry = inner.entries.entry(key).or_insert_with(Entry::new);
      entry.last_used = Instant::now();

      if entry.is_fresh(&self.options) {
        if let Some(value) = entry.value_as::<T>() {
          return Ok(value);
        }
      }

      let joined = entry.in_flight.as_ref().map(|f| f.result.clone());
      let shared = match joined {
        Some(result) => {
          debug!(%key, "joining in-flight fetch");
          result
        }
        None => {
          let generation = entry.generation;
          let result = self.spawn_load(key, generation, loader);
          entry.in_flight = Some(InFlight {
            generation,
            result: result.clone(),
          });
          result
        }
      };
      entry.waiters += 1;
      (shared, epoch)
    };

    let _waiter = WaiterGuard {
      store: self,
      key,
      epoch,
    };
    let value = shared.await?;
    value.downcast::<T>().map_err(|_| ApiError::Transport {
      status: None,
      message: format!("Cached value for {} has an unexpected type", key),
    })
  }

  fn spawn_load<T, F, Fut>(&self, key: QueryKey, generation: u64, loader: F) -> SharedFetch
  where
    T: PartialEq + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    debug!(%key, generation, "starting fetch");
    let store = self.clone();
    // The load runs on its own task so that dropping every waiter does not
    // cancel the request; `settle` decides whether the result is kept.
    let handle = tokio::spawn(async move {
      let result = load_with_retry(&store.options, key, &loader).await;
      store.settle(key, generation, result)
    });

    async move {
      handle.await.unwrap_or_else(|e| {
        Err(ApiError::Transport {
          status: None,
          message: format!("Fetch task failed: {}", e),
        })
      })
    }
    .boxed()
    .shared()
  }

  /// Apply a finished load to the entry it was started for.
  fn settle<T>(
    &self,
    key: QueryKey,
    generation: u64,
    result: Result<T, ApiError>,
  ) -> Result<Value, ApiError>
  where
    T: PartialEq + Send + Sync + 'static,
  {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(&key) else {
      debug!(%key, "entry evicted before fetch settled");
      return result.map(|v| Arc::new(v) as Value);
    };

    if entry
      .in_flight
      .as_ref()
      .is_some_and(|f| f.generation == generation)
    {
      entry.in_flight = None;
    }

    if entry.generation != generation {
      debug!(%key, generation, current = entry.generation, "discarding superseded response");
      return result.map(|v| Arc::new(v) as Value);
    }

    if entry.observers == 0 && entry.waiters == 0 {
      debug!(%key, "discarding response, nobody is observing");
      return result.map(|v| Arc::new(v) as Value);
    }

    match result {
      Ok(value) => {
        // Keep the old allocation when nothing changed, so list identity is stable
        let value: Value = match entry.value_as::<T>() {
          Some(previous) if *previous == value => previous,
          _ => Arc::new(value),
        };
        entry.value = Some(value.clone());
        entry.fetched_at = Some(Instant::now());
        entry.updated_at = Some(Local::now());
        entry.error = None;
        entry.invalidated = false;
        entry.failed = false;
        debug!(%key, "fetch settled");
        Ok(value)
      }
      Err(err) => {
        debug!(%key, error = %err, "fetch failed");
        entry.error = Some(err.clone());
        entry.failed = true;
        Err(err)
      }
    }
  }

  /// Mark `key` stale so the next read by an active observer refetches.
  ///
  /// Any fetch still running for the key is superseded and its response will
  /// be dropped. Invalidating an already invalidated, idle entry is a no-op.
  pub fn invalidate(&self, key: QueryKey) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(&key) else {
      return;
    };
    if entry.invalidated && entry.in_flight.is_none() && !entry.failed {
      return;
    }
    entry.invalidated = true;
    entry.failed = false;
    entry.generation += 1;
    entry.in_flight = None;
    debug!(%key, generation = entry.generation, "invalidated");
  }

  /// Register an observer for `key`; dropping the guard unregisters it.
  pub fn subscribe(&self, key: QueryKey) -> Subscription {
    let mut inner = self.lock();
    let epoch = inner.epoch;
    let entry = inner.entries.entry(key).or_insert_with(Entry::new);
    entry.observers += 1;
    entry.last_used = Instant::now();
    Subscription {
      store: self.clone(),
      key,
      epoch,
    }
  }

  /// Drop entries nobody has used for longer than the retention window.
  pub fn collect_garbage(&self) -> usize {
    let retain_after = self.options.retain_after;
    let mut inner = self.lock();
    let before = inner.entries.len();
    inner
      .entries
      .retain(|_, entry| !entry.is_idle() || entry.last_used.elapsed() < retain_after);
    let evicted = before - inner.entries.len();
    if evicted > 0 {
      debug!(evicted, "evicted unused cache entries");
    }
    evicted
  }

  /// Invalidate observed entries that have gone stale, if focus refetching is on.
  pub fn focus_gained(&self) -> usize {
    if !self.options.refetch_on_focus {
      return 0;
    }
    let stale: Vec<QueryKey> = {
      let inner = self.lock();
      inner
        .entries
        .iter()
        .filter(|(_, e)| {
          e.observers > 0
            && e.value.is_some()
            && e.in_flight.is_none()
            && e.is_time_stale(&self.options)
        })
        .map(|(key, _)| *key)
        .collect()
    };
    for key in &stale {
      self.invalidate(*key);
    }
    stale.len()
  }

  /// Forget everything. Outstanding guards become inert.
  pub fn clear(&self) {
    let mut inner = self.lock();
    inner.entries.clear();
    inner.epoch += 1;
    warn!("query store cleared");
  }

  fn release(&self, key: QueryKey, epoch: u64, update: impl FnOnce(&mut Entry)) {
    let mut inner = self.lock();
    if inner.epoch != epoch {
      return;
    }
    if let Some(entry) = inner.entries.get_mut(&key) {
      update(entry);
      entry.last_used = Instant::now();
    }
  }
}

async fn load_with_retry<T, F, Fut>(
  options: &QueryOptions,
  key: QueryKey,
  loader: &F,
) -> Result<T, ApiError>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, ApiError>>,
{
  let mut attempt = 0;
  loop {
    match loader().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_retryable() && attempt < options.retry_on_failure => {
        let delay = options.backoff(attempt);
        attempt += 1;
        warn!(%key, attempt, ?delay, error = %err, "fetch failed, retrying");
        tokio::time::sleep(delay).await;
      }
      Err(err) => return Err(err),
    }
  }
}

/// Observer registration for one key
pub struct Subscription {
  store: QueryStore,
  key: QueryKey,
  epoch: u64,
}

impl Subscription {
  pub fn key(&self) -> QueryKey {
    self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.store.release(self.key, self.epoch, |entry| {
      entry.observers = entry.observers.saturating_sub(1);
    });
  }
}

struct WaiterGuard<'a> {
  store: &'a QueryStore,
  key: QueryKey,
  epoch: u64,
}

impl Drop for WaiterGuard<'_> {
  fn drop(&mut self) {
    self.store.release(self.key, self.epoch, |entry| {
      entry.waiters = entry.waiters.saturating_sub(1);
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  fn options() -> QueryOptions {
    QueryOptions {
      stale_after: Duration::from_secs(60),
      retain_after: Duration::from_secs(600),
      retry_on_failure: 3,
      retry_delay: Duration::from_millis(100),
      refetch_on_focus: true,
    }
  }

  /// Loader returning `value`, counting calls, taking 10ms
  fn counting_loader(
    calls: Arc<AtomicUsize>,
    value: Vec<u32>,
  ) -> impl Fn() -> BoxFuture<'static, Result<Vec<u32>, ApiError>> + Send + Sync + 'static {
    move || {
      let calls = calls.clone();
      let value = value.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(value)
      }
      .boxed()
    }
  }

  /// Loader failing with 500 for the first `failures` calls
  fn flaky_loader(
    calls: Arc<AtomicUsize>,
    failures: usize,
  ) -> impl Fn() -> BoxFuture<'static, Result<u32, ApiError>> + Send + Sync + 'static {
    move || {
      let calls = calls.clone();
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
          Err(ApiError::status(500))
        } else {
          Ok(n as u32)
        }
      }
      .boxed()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_value_is_served_from_cache() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1, 2]))
      .await
      .unwrap();
    let second = store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![9]))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Fresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_fetches_share_one_load() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b) = tokio::join!(
      store.fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1])),
      store.fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1])),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
  }

  #[tokio::test(start_paused = true)]
  async fn test_status_is_fetching_while_loading() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    let _sub = store.subscribe(QueryKey::Todos);

    let task = tokio::spawn({
      let store = store.clone();
      let loader = counting_loader(calls.clone(), vec![1]);
      async move { store.fetch(QueryKey::Todos, loader).await }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Fetching);

    task.await.unwrap().unwrap();
    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Fresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_is_idempotent() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();

    store.invalidate(QueryKey::Todos);
    let once = store.read(QueryKey::Todos).unwrap();
    store.invalidate(QueryKey::Todos);
    let twice = store.read(QueryKey::Todos).unwrap();

    assert_eq!(once.status, EntryStatus::Stale);
    assert_eq!(twice.status, EntryStatus::Stale);
    assert!(store.needs_refetch(QueryKey::Todos));

    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!store.needs_refetch(QueryKey::Todos));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidation_does_not_cross_keys() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    store
      .fetch(QueryKey::Todo(1), counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();

    store.invalidate(QueryKey::Todos);

    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Stale);
    assert_eq!(store.read(QueryKey::Todo(1)).unwrap().status, EntryStatus::Fresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_value_goes_stale_after_window() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Stale);

    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_load_is_retried_with_backoff() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let value = store
      .fetch(QueryKey::Todo(1), flaky_loader(calls.clone(), 2))
      .await
      .unwrap();

    assert_eq!(*value, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 100ms + 200ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(300));
  }

  #[tokio::test(start_paused = true)]
  async fn test_exhausted_retries_surface_error_until_success() {
    let store = QueryStore::new(QueryOptions {
      retry_on_failure: 1,
      ..options()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let _sub = store.subscribe(QueryKey::Todo(1));

    let err = store
      .fetch(QueryKey::Todo(1), flaky_loader(calls.clone(), 3))
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::status(500));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.read(QueryKey::Todo(1)).unwrap().status, EntryStatus::Error);
    assert!(!store.needs_refetch(QueryKey::Todo(1)));

    // Third call fails, fourth succeeds
    store
      .fetch(QueryKey::Todo(1), flaky_loader(calls.clone(), 3))
      .await
      .unwrap();
    let entry = store.read(QueryKey::Todo(1)).unwrap();
    assert_eq!(entry.status, EntryStatus::Fresh);
    assert!(entry.error.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_refetch_keeps_invalidated_value_stale() {
    let store = QueryStore::new(QueryOptions {
      retry_on_failure: 0,
      ..options()
    });
    let _sub = store.subscribe(QueryKey::Todos);

    store
      .fetch(QueryKey::Todos, || async { Ok::<_, ApiError>(vec!["before"]) })
      .await
      .unwrap();
    store.invalidate(QueryKey::Todos);

    let err = store
      .fetch(QueryKey::Todos, || async {
        Err::<Vec<&str>, _>(ApiError::status(500))
      })
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::status(500));
    let entry = store.read(QueryKey::Todos).unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert!(entry.has_value);
    // No refetch loop on tick, but the old value is not fresh either
    assert!(!store.needs_refetch(QueryKey::Todos));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let value = store
      .fetch(QueryKey::Todos, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, ApiError>(vec!["after"]) }
      })
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*value, vec!["after"]);
    assert_eq!(store.read(QueryKey::Todos).unwrap().status, EntryStatus::Fresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_after_failed_refetch_requests_fetch() {
    let store = QueryStore::new(QueryOptions {
      retry_on_failure: 0,
      ..options()
    });
    let _sub = store.subscribe(QueryKey::Todos);

    store
      .fetch(QueryKey::Todos, || async { Ok::<_, ApiError>(vec![1]) })
      .await
      .unwrap();
    store.invalidate(QueryKey::Todos);
    store
      .fetch(QueryKey::Todos, || async {
        Err::<Vec<u32>, _>(ApiError::status(503))
      })
      .await
      .unwrap_err();
    assert!(!store.needs_refetch(QueryKey::Todos));

    // A later mutation invalidates again and must prompt a fetch
    store.invalidate(QueryKey::Todos);
    assert!(store.needs_refetch(QueryKey::Todos));
  }

  #[tokio::test(start_paused = true)]
  async fn test_not_found_is_not_retried() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let err = store
      .fetch(QueryKey::Todo(999_999), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<u32, _>(ApiError::NotFound) }
      })
      .await
      .unwrap_err();

    assert_eq!(err, ApiError::NotFound);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_superseded_response_is_discarded() {
    let store = QueryStore::new(options());
    let _sub = store.subscribe(QueryKey::Todos);

    // Slow fetch issued first
    let slow = tokio::spawn({
      let store = store.clone();
      async move {
        store
          .fetch(QueryKey::Todos, || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, ApiError>(vec!["old"])
          })
          .await
      }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    // A mutation invalidates, and a fast fetch completes first
    store.invalidate(QueryKey::Todos);
    let fresh = store
      .fetch(QueryKey::Todos, || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, ApiError>(vec!["new"])
      })
      .await
      .unwrap();
    assert_eq!(*fresh, vec!["new"]);

    // The slow one still resolves for its own waiter, but does not win
    let stale = slow.await.unwrap().unwrap();
    assert_eq!(*stale, vec!["old"]);
    let cached = store.peek::<Vec<&str>>(QueryKey::Todos).unwrap();
    assert_eq!(*cached, vec!["new"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_result_without_observers_is_discarded() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));

    let waiter = tokio::spawn({
      let store = store.clone();
      let loader = counting_loader(calls.clone(), vec![1]);
      async move { store.fetch(QueryKey::Todos, loader).await }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;
    waiter.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The request was not cancelled, but nobody kept its result
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.peek::<Vec<u32>>(QueryKey::Todos).is_none());
    assert!(store.needs_refetch(QueryKey::Todos));
  }

  #[tokio::test(start_paused = true)]
  async fn test_equal_refetch_keeps_identity() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1, 2]))
      .await
      .unwrap();
    store.invalidate(QueryKey::Todos);
    let same = store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1, 2]))
      .await
      .unwrap();
    assert!(Arc::ptr_eq(&first, &same));

    store.invalidate(QueryKey::Todos);
    let changed = store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1, 2, 3]))
      .await
      .unwrap();
    assert!(!Arc::ptr_eq(&first, &changed));
  }

  #[tokio::test(start_paused = true)]
  async fn test_unobserved_entries_are_evicted_after_retention() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = store.subscribe(QueryKey::Todo(1));
    store
      .fetch(QueryKey::Todo(1), counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    store
      .fetch(QueryKey::Todo(2), counting_loader(calls.clone(), vec![2]))
      .await
      .unwrap();

    tokio::time::advance(Duration::from_secs(601)).await;
    assert_eq!(store.collect_garbage(), 1);
    assert!(store.read(QueryKey::Todo(1)).is_some());
    assert!(store.read(QueryKey::Todo(2)).is_none());

    drop(observed);
    assert_eq!(store.collect_garbage(), 0);
    tokio::time::advance(Duration::from_secs(601)).await;
    assert_eq!(store.collect_garbage(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_focus_invalidates_only_observed_stale_entries() {
    let store = QueryStore::new(options());
    let calls = Arc::new(AtomicUsize::new(0));
    let _sub = store.subscribe(QueryKey::Todos);
    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    store
      .fetch(QueryKey::Todo(1), counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();

    assert_eq!(store.focus_gained(), 0);
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(store.focus_gained(), 1);
    assert!(store.needs_refetch(QueryKey::Todos));
    assert!(!store.needs_refetch(QueryKey::Todo(1)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_focus_refetch_can_be_disabled() {
    let store = QueryStore::new(QueryOptions {
      refetch_on_focus: false,
      ..options()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let _sub = store.subscribe(QueryKey::Todos);
    store
      .fetch(QueryKey::Todos, counting_loader(calls.clone(), vec![1]))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(store.focus_gained(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_guards_from_before_clear_are_inert() {
    let store = QueryStore::new(options());
    let old = store.subscribe(QueryKey::Todos);
    store.clear();
    assert!(store.read(QueryKey::Todos).is_none());

    let _new = store.subscribe(QueryKey::Todos);
    drop(old);
    assert_eq!(store.read(QueryKey::Todos).unwrap().observers, 1);
  }
}
