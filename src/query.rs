//! Per-view query handle on top of the shared [`QueryStore`].
//!
//! A `Query<T>` observes one key. Views create it, call `fetch()` once, and
//! `poll()` it on every tick. Polling picks up finished fetches, refetches
//! after an invalidation, and adopts values that another observer of the
//! same key fetched.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut query = Query::new(store.clone(), QueryKey::Todos, move || {
//!     let client = client.clone();
//!     async move { client.list().await }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(todos) => render_list(todos),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;

use crate::api::ApiError;
use crate::cache::{QueryKey, QueryStore, Subscription};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch in progress, nothing to show yet
  Loading,
  /// Data available (possibly being refreshed in the background)
  Success(Arc<T>),
  /// The last fetch failed
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&Arc<T>> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Observer of one query key with loading/success/error state.
pub struct Query<T> {
  store: QueryStore,
  subscription: Subscription,
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<oneshot::Receiver<Result<Arc<T>, ApiError>>>,
}

impl<T: PartialEq + Send + Sync + 'static> Query<T> {
  /// Create a query observing `key`.
  ///
  /// The fetcher is only invoked through the store, so it runs at most once
  /// per key at a time no matter how many views observe the key.
  pub fn new<F, Fut>(store: QueryStore, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let subscription = store.subscribe(key);
    Self {
      store,
      subscription,
      state: QueryState::Idle,
      fetcher: Arc::new(move || fetcher().boxed()),
      receiver: None,
    }
  }

  pub fn key(&self) -> QueryKey {
    self.subscription.key()
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data().map(|d| d.as_ref())
  }

  /// Shared handle to the data; its pointer identity changes only when the
  /// server's content changed.
  pub fn shared_data(&self) -> Option<&Arc<T>> {
    self.state.data()
  }

  /// Check if the query is waiting for its first result.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if any fetch is running, including background refreshes.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// Start fetching data if not already fetching.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch: invalidate the key and fetch again.
  pub fn refetch(&mut self) {
    self.store.invalidate(self.key());
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results and store-driven changes.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.poll_receiver();

    if self.receiver.is_none() && self.store.needs_refetch(self.key()) {
      self.start_fetch();
      changed = true;
    }

    // Another observer may have settled a newer value for this key
    if let QueryState::Success(current) = &self.state {
      if let Some(latest) = self.store.peek::<T>(self.key()) {
        if !Arc::ptr_eq(current, &latest) {
          self.state = QueryState::Success(latest);
          changed = true;
        }
      }
    }

    changed
  }

  fn poll_receiver(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.state = QueryState::Error(ApiError::Transport {
          status: None,
          message: "Query was cancelled".to_string(),
        });
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let store = self.store.clone();
    let key = self.key();
    let fetcher = self.fetcher.clone();
    tokio::spawn(async move {
      let result = store.fetch(key, move || fetcher()).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.subscription.key())
      .field("state", &self.state)
      .field("fetching", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}
