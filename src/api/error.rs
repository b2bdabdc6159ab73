use thiserror::Error;

/// Failures surfaced by the data layer.
///
/// `Clone` because one in-flight fetch hands the same outcome to every
/// waiter on its key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// The server reported 404 for the requested item
  #[error("Todo not found")]
  NotFound,

  /// Non-success status, network failure, or an undecodable body
  #[error("{message}")]
  Transport {
    status: Option<u16>,
    message: String,
  },

  /// Rejected locally, before any request was made
  #[error("{0}")]
  Validation(&'static str),
}

impl ApiError {
  pub fn status(status: u16) -> Self {
    Self::Transport {
      status: Some(status),
      message: format!("HTTP error! status: {}", status),
    }
  }

  pub fn network(err: impl std::fmt::Display) -> Self {
    Self::Transport {
      status: None,
      message: format!("Network error: {}", err),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound)
  }

  /// Whether a read-path retry could change the outcome
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transport { .. })
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    match err.status() {
      Some(status) if status == reqwest::StatusCode::NOT_FOUND => Self::NotFound,
      Some(status) => Self::status(status.as_u16()),
      None if err.is_decode() => Self::Transport {
        status: None,
        message: format!("Malformed response: {}", err),
      },
      None => Self::network(err),
    }
  }
}
