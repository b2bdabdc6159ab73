use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::api::Todo;
use crate::forms::{AddForm, DeleteConfirm, EditForm};
use crate::ui::renderfns::{centered_rect, completion_color};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Events emitted by the dialog that the list view turns into mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
  Create(String),
  Update {
    base: Todo,
    title: String,
    completed: bool,
  },
  Delete(u64),
  Cancelled,
}

#[derive(Debug, Clone)]
enum Form {
  Add(AddForm),
  Edit(EditForm),
  Delete(DeleteConfirm),
}

/// Which control of the edit dialog has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
  #[default]
  Title,
  Completed,
}

/// Modal add/edit/delete dialog.
///
/// Stays open until the owner closes it after a successful mutation. While
/// a submission is pending, submit and cancel keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct TodoDialog {
  form: Option<Form>,
  input: TextInput,
  focus: Focus,
  pending: bool,
  error: Option<String>,
}

impl TodoDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_open(&self) -> bool {
    self.form.is_some()
  }

  pub fn is_pending(&self) -> bool {
    self.pending
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn open_add(&mut self) {
    self.open(Form::Add(AddForm::new()), TextInput::new());
  }

  pub fn open_edit(&mut self, todo: &Todo) {
    self.open(
      Form::Edit(EditForm::from_todo(todo)),
      TextInput::with_value(&todo.title),
    );
  }

  pub fn open_delete(&mut self, todo: &Todo) {
    self.open(Form::Delete(DeleteConfirm::from_todo(todo)), TextInput::new());
  }

  fn open(&mut self, form: Form, input: TextInput) {
    *self = Self {
      form: Some(form),
      input,
      ..Self::default()
    };
  }

  pub fn close(&mut self) {
    *self = Self::default();
  }

  pub fn set_pending(&mut self, pending: bool) {
    self.pending = pending;
  }

  /// Show a failure inside the dialog, which stays open
  pub fn set_error(&mut self, error: impl Into<String>) {
    self.error = Some(error.into());
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<DialogEvent> {
    let Some(form) = self.form.as_mut() else {
      return KeyResult::NotHandled;
    };

    // A pending submission owns the dialog until it settles
    if key.code == KeyCode::Esc {
      if self.pending {
        return KeyResult::Handled;
      }
      self.close();
      return KeyResult::Event(DialogEvent::Cancelled);
    }

    match form {
      Form::Add(add) => match self.input.handle_key(key) {
        InputResult::Submitted(_) => {
          if self.pending {
            return KeyResult::Handled;
          }
          match add.submit() {
            Ok(title) => KeyResult::Event(DialogEvent::Create(title)),
            Err(e) => {
              self.error = Some(e.to_string());
              KeyResult::Handled
            }
          }
        }
        InputResult::Consumed => {
          add.set_title(self.input.value());
          self.error = None;
          KeyResult::Handled
        }
        _ => KeyResult::Handled,
      },
      Form::Edit(edit) => {
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
          self.focus = match self.focus {
            Focus::Title => Focus::Completed,
            Focus::Completed => Focus::Title,
          };
          return KeyResult::Handled;
        }
        if key.code == KeyCode::Enter {
          if self.pending {
            return KeyResult::Handled;
          }
          return match edit.submit() {
            Ok(merged) => KeyResult::Event(DialogEvent::Update {
              base: edit.base().clone(),
              title: merged.title,
              completed: merged.completed,
            }),
            Err(e) => {
              self.error = Some(e.to_string());
              KeyResult::Handled
            }
          };
        }
        match self.focus {
          Focus::Completed => {
            if key.code == KeyCode::Char(' ') {
              edit.toggle_completed();
            }
          }
          Focus::Title => {
            if self.input.handle_key(key) == InputResult::Consumed {
              edit.set_title(self.input.value());
              self.error = None;
            }
          }
        }
        KeyResult::Handled
      }
      Form::Delete(confirm) => match key.code {
        KeyCode::Enter | KeyCode::Char('y') if !self.pending => {
          KeyResult::Event(DialogEvent::Delete(confirm.id))
        }
        KeyCode::Char('n') if !self.pending => {
          self.close();
          KeyResult::Event(DialogEvent::Cancelled)
        }
        _ => KeyResult::Handled,
      },
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(form) = &self.form else {
      return;
    };

    let (title, mut lines, actions) = match form {
      Form::Add(_) => (
        " Add New Todo ",
        vec![
          Line::styled("Todo Title", Style::default().fg(Color::DarkGray)),
          self.input_line(true),
        ],
        if self.pending { "Adding..." } else { "Enter: Add Todo   Esc: Cancel" },
      ),
      Form::Edit(edit) => {
        let checkbox = if edit.completed() { "[x]" } else { "[ ]" };
        let checkbox_style = if self.focus == Focus::Completed {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(completion_color(edit.completed()))
        };
        (
          if edit.is_dirty() { " Edit Todo (modified) " } else { " Edit Todo " },
          vec![
            Line::styled("Todo Title", Style::default().fg(Color::DarkGray)),
            self.input_line(self.focus == Focus::Title),
            Line::from(""),
            Line::from(vec![
              Span::styled(checkbox, checkbox_style),
              Span::raw(" Mark as Completed"),
            ]),
          ],
          if self.pending {
            "Saving..."
          } else {
            "Enter: Save Changes   Tab: focus   Space: toggle   Esc: Cancel"
          },
        )
      }
      Form::Delete(confirm) => (
        " Confirm Deletion ",
        vec![
          Line::from(vec![
            Span::raw("Are you sure you want to delete the todo: \""),
            Span::styled(confirm.title.as_str(), Style::default().bold()),
            Span::raw("\"?"),
          ]),
          Line::from("This action cannot be undone."),
        ],
        if self.pending { "Deleting..." } else { "y: Yes, Delete   n: No, Cancel" },
      ),
    };

    if let Some(error) = &self.error {
      lines.push(Line::from(""));
      lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(actions, Style::default().fg(Color::Cyan)));

    let height = lines.len() as u16 + 2;
    let rect = centered_rect(60, height, area);
    frame.render_widget(Clear, rect);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);
    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, rect);
  }

  fn input_line(&self, focused: bool) -> Line<'_> {
    let value = self.input.value();
    let split = value
      .char_indices()
      .nth(self.input.cursor_position())
      .map(|(i, _)| i)
      .unwrap_or(value.len());
    let cursor_style = if focused {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    };
    Line::from(vec![
      Span::raw(&value[..split]),
      Span::styled("_", cursor_style),
      Span::raw(&value[split..]),
    ])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn todo() -> Todo {
    Todo {
      id: 7,
      user_id: 1,
      title: "walk dog".to_string(),
      completed: false,
    }
  }

  #[test]
  fn test_blank_add_stays_open_with_error() {
    let mut dialog = TodoDialog::new();
    dialog.open_add();
    dialog.handle_key(key(KeyCode::Char(' ')));

    assert_eq!(dialog.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert!(dialog.is_open());
    assert_eq!(dialog.error(), Some("Title must not be empty"));

    // Typing clears the error
    dialog.handle_key(key(KeyCode::Char('a')));
    assert_eq!(dialog.error(), None);
  }

  #[test]
  fn test_add_submits_trimmed_title() {
    let mut dialog = TodoDialog::new();
    dialog.open_add();
    for c in " Buy milk".chars() {
      dialog.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      dialog.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(DialogEvent::Create("Buy milk".to_string()))
    );
  }

  #[test]
  fn test_pending_ignores_submit() {
    let mut dialog = TodoDialog::new();
    dialog.open_add();
    dialog.handle_key(key(KeyCode::Char('x')));
    dialog.set_pending(true);
    assert_eq!(dialog.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
  }

  #[test]
  fn test_edit_toggle_and_submit() {
    let mut dialog = TodoDialog::new();
    dialog.open_edit(&todo());
    dialog.handle_key(key(KeyCode::Backspace));
    dialog.handle_key(key(KeyCode::Tab));
    dialog.handle_key(key(KeyCode::Char(' ')));

    assert_eq!(
      dialog.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(DialogEvent::Update {
        base: todo(),
        title: "walk do".to_string(),
        completed: true,
      })
    );
  }

  #[test]
  fn test_delete_confirm_and_cancel() {
    let mut dialog = TodoDialog::new();
    dialog.open_delete(&todo());
    assert_eq!(dialog.handle_key(key(KeyCode::Char('j'))), KeyResult::Handled);
    assert_eq!(
      dialog.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(DialogEvent::Delete(7))
    );

    assert_eq!(
      dialog.handle_key(key(KeyCode::Char('n'))),
      KeyResult::Event(DialogEvent::Cancelled)
    );
    assert!(!dialog.is_open());
  }

  #[test]
  fn test_pending_ignores_cancel() {
    let mut dialog = TodoDialog::new();
    dialog.open_add();
    dialog.handle_key(key(KeyCode::Char('A')));
    dialog.handle_key(key(KeyCode::Enter));
    dialog.set_pending(true);

    assert_eq!(dialog.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(dialog.is_open());

    let mut confirm = TodoDialog::new();
    confirm.open_delete(&todo());
    confirm.set_pending(true);
    assert_eq!(confirm.handle_key(key(KeyCode::Char('n'))), KeyResult::Handled);
    assert_eq!(confirm.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(confirm.is_open());

    // Once settled with an error, cancelling works again
    confirm.set_pending(false);
    confirm.set_error("HTTP error! status: 500");
    assert_eq!(
      confirm.handle_key(key(KeyCode::Char('n'))),
      KeyResult::Event(DialogEvent::Cancelled)
    );
  }

  #[test]
  fn test_edit_title_marks_modified() {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    let render = |dialog: &TodoDialog| -> String {
      let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
      terminal
        .draw(|frame| {
          let area = frame.area();
          dialog.render_overlay(frame, area);
        })
        .unwrap();
      let buffer = terminal.backend().buffer();
      buffer.content().iter().map(|cell| cell.symbol()).collect()
    };

    let mut dialog = TodoDialog::new();
    dialog.open_edit(&todo());
    assert!(!render(&dialog).contains("(modified)"));

    dialog.handle_key(key(KeyCode::Char('s')));
    assert!(render(&dialog).contains("(modified)"));
  }

  #[test]
  fn test_closed_dialog_passes_keys_through() {
    let mut dialog = TodoDialog::new();
    assert_eq!(dialog.handle_key(key(KeyCode::Char('a'))), KeyResult::NotHandled);
  }
}
