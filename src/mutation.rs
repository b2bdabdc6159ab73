//! Create, update and delete, followed by cache invalidation.

use std::future::Future;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::api::{ApiError, Todo, TodoClient};
use crate::cache::{QueryKey, QueryStore};
use crate::forms::{merge_edits, validate_title};

/// Runs writes against the API and invalidates the keys they affect.
///
/// Nothing in the cache changes when a write fails, and writes are never
/// retried: the API has no idempotency key, so a repeated create would
/// produce a second item.
#[derive(Clone)]
pub struct Mutations {
  client: TodoClient,
  store: QueryStore,
}

impl Mutations {
  pub fn new(client: TodoClient, store: QueryStore) -> Self {
    Self { client, store }
  }

  /// Create a todo. Blank titles are rejected without a request.
  pub async fn submit_create(&self, title: &str) -> Result<Todo, ApiError> {
    let title = validate_title(title)?;
    let created = self
      .client
      .create(title)
      .await
      .inspect_err(|e| warn!(error = %e, "create failed"))?;
    info!(id = created.id, "todo created");
    self.store.invalidate(QueryKey::Todos);
    Ok(created)
  }

  /// Merge the edits onto `base`, the item as last fetched, and replace it.
  /// Both the list and the item's detail are invalidated.
  pub async fn submit_update(
    &self,
    base: &Todo,
    title: &str,
    completed: bool,
  ) -> Result<Todo, ApiError> {
    let todo = merge_edits(base, title, completed)?;
    let id = todo.id;
    let updated = self
      .client
      .replace(&todo)
      .await
      .inspect_err(|e| warn!(id, error = %e, "update failed"))?;
    info!(id, completed = updated.completed, "todo updated");
    self.store.invalidate(QueryKey::Todos);
    self.store.invalidate(QueryKey::Todo(id));
    Ok(updated)
  }

  /// Delete a todo by id.
  pub async fn submit_delete(&self, id: u64) -> Result<bool, ApiError> {
    let removed = self
      .client
      .remove(id)
      .await
      .inspect_err(|e| warn!(id, error = %e, "delete failed"))?;
    info!(id, "todo deleted");
    self.store.invalidate(QueryKey::Todos);
    Ok(removed)
  }
}

/// Where a single mutation handle is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
  Idle,
  Pending,
}

/// UI-side handle for one kind of mutation.
///
/// Refuses to start while a previous call is pending, which is what keeps
/// the submit control disabled. `poll` hands out the outcome once and
/// returns the handle to idle.
#[derive(Debug)]
pub struct Mutation<T> {
  receiver: Option<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> MutationState {
    if self.receiver.is_some() {
      MutationState::Pending
    } else {
      MutationState::Idle
    }
  }

  pub fn is_pending(&self) -> bool {
    self.state() == MutationState::Pending
  }

  /// Spawn `operation`; returns `false` without spawning if one is pending.
  pub fn start<Fut>(&mut self, operation: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let _ = tx.send(operation.await);
    });
    true
  }

  /// The outcome, once, when the pending call has finished
  pub fn poll(&mut self) -> Option<Result<T, ApiError>> {
    let receiver = self.receiver.as_mut()?;
    let outcome = match receiver.try_recv() {
      Ok(outcome) => outcome,
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => Err(ApiError::Transport {
        status: None,
        message: "Request was cancelled".to_string(),
      }),
    };
    self.receiver = None;
    Some(outcome)
  }
}
