//! Route set of the application.

use std::fmt;

/// A screen the app can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// `/`
  List,
  /// `/todos/{id}`
  Detail(u64),
  /// `/test-error`: a view that fails while rendering
  CrashTest,
  /// Anything else
  NotFound,
}

impl Route {
  /// Resolve a path. Unknown paths and malformed ids are `NotFound`.
  pub fn parse(path: &str) -> Route {
    let path = path.trim();
    let trimmed = path.trim_end_matches('/');
    match trimmed {
      "" => Route::List,
      "/test-error" => Route::CrashTest,
      _ => match trimmed.strip_prefix("/todos/") {
        Some(id) => id.parse().map(Route::Detail).unwrap_or(Route::NotFound),
        None => Route::NotFound,
      },
    }
  }

  /// Resolve a palette argument: a bare id or a path
  pub fn from_arg(arg: &str) -> Route {
    let arg = arg.trim();
    if arg.starts_with('/') {
      Route::parse(arg)
    } else {
      arg.parse().map(Route::Detail).unwrap_or(Route::NotFound)
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Route::List => write!(f, "/"),
      Route::Detail(id) => write!(f, "/todos/{}", id),
      Route::CrashTest => write!(f, "/test-error"),
      Route::NotFound => write!(f, "404"),
    }
  }
}
