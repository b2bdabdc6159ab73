use std::fmt;

/// Identity of one piece of cached server state.
///
/// Keys are disjoint: invalidating `Todos` leaves every `Todo(id)` alone and
/// the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
  /// The full collection
  Todos,
  /// A single item by id
  Todo(u64),
}

impl QueryKey {
  /// Human readable label for the cache inspector
  pub fn description(&self) -> String {
    match self {
      Self::Todos => "all todos".to_string(),
      Self::Todo(id) => format!("todo {}", id),
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Todos => write!(f, "todos"),
      Self::Todo(id) => write!(f, "todo:{}", id),
    }
  }
}
