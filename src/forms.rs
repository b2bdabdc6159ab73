//! Form state behind the add, edit and delete dialogs.

use crate::api::{ApiError, Todo};

/// Reject titles that are empty after trimming.
pub fn validate_title(title: &str) -> Result<&str, ApiError> {
  let trimmed = title.trim();
  if trimmed.is_empty() {
    Err(ApiError::Validation("Title must not be empty"))
  } else {
    Ok(trimmed)
  }
}

/// Merge edited fields onto a fetched todo, producing the full replacement.
pub fn merge_edits(base: &Todo, title: &str, completed: bool) -> Result<Todo, ApiError> {
  let title = validate_title(title)?;
  Ok(Todo {
    title: title.to_string(),
    completed,
    ..base.clone()
  })
}

/// "Add New Todo" dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddForm {
  title: String,
}

impl AddForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn set_title(&mut self, title: impl Into<String>) {
    self.title = title.into();
  }

  /// The title to create, or a validation error that keeps the dialog open
  pub fn submit(&self) -> Result<String, ApiError> {
    validate_title(&self.title).map(String::from)
  }
}

/// "Edit Todo" dialog, prefilled from the fetched item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
  base: Todo,
  title: String,
  completed: bool,
}

impl EditForm {
  pub fn from_todo(todo: &Todo) -> Self {
    Self {
      base: todo.clone(),
      title: todo.title.clone(),
      completed: todo.completed,
    }
  }

  pub fn id(&self) -> u64 {
    self.base.id
  }

  pub fn base(&self) -> &Todo {
    &self.base
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn set_title(&mut self, title: impl Into<String>) {
    self.title = title.into();
  }

  pub fn completed(&self) -> bool {
    self.completed
  }

  pub fn toggle_completed(&mut self) {
    self.completed = !self.completed;
  }

  pub fn is_dirty(&self) -> bool {
    self.title != self.base.title || self.completed != self.base.completed
  }

  /// The full replacement item: the edits merged onto the fetched todo
  pub fn submit(&self) -> Result<Todo, ApiError> {
    merge_edits(&self.base, &self.title, self.completed)
  }
}

/// "Confirm Deletion" dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirm {
  pub id: u64,
  pub title: String,
}

impl DeleteConfirm {
  pub fn from_todo(todo: &Todo) -> Self {
    Self {
      id: todo.id,
      title: todo.title.clone(),
    }
  }
}
