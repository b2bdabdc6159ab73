use serde::{Deserialize, Serialize};

/// Owner assigned to every todo created from this client
pub const DEFAULT_USER_ID: u64 = 1;

/// A todo item as the server returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
  pub id: u64,
  pub user_id: u64,
  pub title: String,
  pub completed: bool,
}

/// Body of `POST /todos`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo<'a> {
  pub title: &'a str,
  pub completed: bool,
  pub user_id: u64,
}

impl<'a> NewTodo<'a> {
  /// New items always start open and belong to the default owner.
  pub fn new(title: &'a str) -> Self {
    Self {
      title,
      completed: false,
      user_id: DEFAULT_USER_ID,
    }
  }
}

impl Todo {
  /// Short label used in list rows and toasts
  pub fn status_label(&self) -> &'static str {
    if self.completed {
      "Completed"
    } else {
      "Pending"
    }
  }
}
