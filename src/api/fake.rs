//! In-process fake of the todo API for tests.
//!
//! Serves the same five routes as the real endpoint from an in-memory list,
//! counts requests per route, and can be told to fail the next N requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use super::types::Todo;

#[derive(Default)]
pub struct FakeState {
  todos: Mutex<Vec<Todo>>,
  next_id: AtomicUsize,
  pub list_calls: AtomicUsize,
  pub get_calls: AtomicUsize,
  pub create_calls: AtomicUsize,
  pub replace_calls: AtomicUsize,
  pub delete_calls: AtomicUsize,
  fail_next: AtomicUsize,
  delay_ms: AtomicUsize,
  last_content_type: Mutex<Option<String>>,
  last_body: Mutex<Option<Value>>,
}

impl FakeState {
  /// Fail the next `n` requests with 500
  pub fn fail_next(&self, n: usize) {
    self.fail_next.store(n, Ordering::SeqCst);
  }

  /// Delay every response, so tests can overlap requests
  pub fn set_delay(&self, delay: Duration) {
    self.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
  }

  pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }

  pub fn last_content_type(&self) -> Option<String> {
    self.last_content_type.lock().unwrap().clone()
  }

  pub fn last_body(&self) -> Option<Value> {
    self.last_body.lock().unwrap().clone()
  }

  pub fn todos(&self) -> Vec<Todo> {
    self.todos.lock().unwrap().clone()
  }

  async fn gate(&self) -> Result<(), StatusCode> {
    let delay = self.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
    let failing = self
      .fail_next
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if failing {
      Err(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
      Ok(())
    }
  }

  fn record_write(&self, headers: &HeaderMap, body: &Value) {
    *self.last_content_type.lock().unwrap() = headers
      .get("content-type")
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    *self.last_body.lock().unwrap() = Some(body.clone());
  }
}

pub struct FakeServer {
  pub base_url: String,
  pub state: Arc<FakeState>,
}

/// Seed `count` todos titled "todo 1".."todo N" and serve them on a random port.
pub async fn spawn(count: usize) -> FakeServer {
  let todos = (1..=count)
    .map(|i| Todo {
      id: i as u64,
      user_id: 1,
      title: format!("todo {}", i),
      completed: i % 3 == 0,
    })
    .collect();
  let state = Arc::new(FakeState {
    todos: Mutex::new(todos),
    next_id: AtomicUsize::new(count + 1),
    ..FakeState::default()
  });

  let app = Router::new()
    .route("/todos", get(list_todos).post(create_todo))
    .route(
      "/todos/{id}",
      get(get_todo).put(replace_todo).delete(delete_todo),
    )
    .with_state(state.clone());

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  FakeServer {
    base_url: format!("http://{}", addr),
    state,
  }
}

type Shared = State<Arc<FakeState>>;

async fn list_todos(State(state): Shared) -> Result<Json<Vec<Todo>>, StatusCode> {
  state.list_calls.fetch_add(1, Ordering::SeqCst);
  state.gate().await?;
  Ok(Json(state.todos()))
}

async fn get_todo(State(state): Shared, Path(id): Path<u64>) -> Result<Json<Todo>, StatusCode> {
  state.get_calls.fetch_add(1, Ordering::SeqCst);
  state.gate().await?;
  let todos = state.todos.lock().unwrap();
  todos
    .iter()
    .find(|t| t.id == id)
    .cloned()
    .map(Json)
    .ok_or(StatusCode::NOT_FOUND)
}

async fn create_todo(
  State(state): Shared,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
  state.create_calls.fetch_add(1, Ordering::SeqCst);
  state.record_write(&headers, &body);
  state.gate().await?;
  let todo = Todo {
    id: state.next_id.fetch_add(1, Ordering::SeqCst) as u64,
    user_id: body["userId"].as_u64().ok_or(StatusCode::BAD_REQUEST)?,
    title: body["title"]
      .as_str()
      .ok_or(StatusCode::BAD_REQUEST)?
      .to_string(),
    completed: body["completed"].as_bool().ok_or(StatusCode::BAD_REQUEST)?,
  };
  state.todos.lock().unwrap().push(todo.clone());
  Ok((StatusCode::CREATED, Json(todo)))
}

async fn replace_todo(
  State(state): Shared,
  Path(id): Path<u64>,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Result<Json<Todo>, StatusCode> {
  state.replace_calls.fetch_add(1, Ordering::SeqCst);
  state.record_write(&headers, &body);
  state.gate().await?;
  let replacement: Todo = serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
  let mut todos = state.todos.lock().unwrap();
  let slot = todos
    .iter_mut()
    .find(|t| t.id == id)
    .ok_or(StatusCode::NOT_FOUND)?;
  *slot = Todo { id, ..replacement };
  Ok(Json(slot.clone()))
}

async fn delete_todo(State(state): Shared, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
  state.delete_calls.fetch_add(1, Ordering::SeqCst);
  state.gate().await?;
  let mut todos = state.todos.lock().unwrap();
  let before = todos.len();
  todos.retain(|t| t.id != id);
  if todos.len() == before {
    return Err(StatusCode::NOT_FOUND);
  }
  Ok(Json(serde_json::json!({})))
}
