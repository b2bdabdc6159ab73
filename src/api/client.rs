use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{NewTodo, Todo};
use crate::config::ApiConfig;

/// HTTP client for the remote todo collection.
///
/// Performs exactly one request per call. Retries belong to the query store,
/// not here.
#[derive(Debug, Clone)]
pub struct TodoClient {
  http: reqwest::Client,
  base_url: String,
}

impl TodoClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("todos/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Fetch the whole collection
  pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
    self.send_json(self.request(Method::GET, "/todos")).await
  }

  /// Fetch one item; 404 becomes `ApiError::NotFound`
  pub async fn get(&self, id: u64) -> Result<Todo, ApiError> {
    let path = format!("/todos/{}", id);
    self.send_json(self.request(Method::GET, &path)).await
  }

  /// Create an open todo owned by the default user
  pub async fn create(&self, title: &str) -> Result<Todo, ApiError> {
    let request = self
      .request(Method::POST, "/todos")
      .json(&NewTodo::new(title));
    self.send_json(request).await
  }

  /// Replace an item wholesale. Callers merge their edits onto the fetched item first.
  pub async fn replace(&self, todo: &Todo) -> Result<Todo, ApiError> {
    let path = format!("/todos/{}", todo.id);
    let request = self.request(Method::PUT, &path).json(todo);
    self.send_json(request).await
  }

  /// Delete an item. The response body is not relied upon.
  pub async fn remove(&self, id: u64) -> Result<bool, ApiError> {
    let path = format!("/todos/{}", id);
    self.send(self.request(Method::DELETE, &path)).await?;
    Ok(true)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self
      .http
      .request(method, format!("{}{}", self.base_url, path))
  }

  async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let (client, request) = request.build_split();
    let request = request.map_err(ApiError::from)?;
    let method = request.method().clone();
    let path = request.url().path().to_string();

    let response = client.execute(request).await.map_err(|e| {
      debug!(%method, %path, error = %e, "request failed");
      ApiError::from(e)
    })?;

    let status = response.status();
    debug!(%method, %path, status = status.as_u16(), "request completed");

    match status {
      StatusCode::NOT_FOUND => Err(ApiError::NotFound),
      s if !s.is_success() => Err(ApiError::status(s.as_u16())),
      _ => Ok(response),
    }
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
    let response = self.send(request).await?;
    response.json::<T>().await.map_err(ApiError::from)
  }
}
