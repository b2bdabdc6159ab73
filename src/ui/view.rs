use crate::routes::Route;
use crate::ui::components::Toast;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

pub type Shortcut = ShortcutInfo;

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Go to a route, replacing everything above the list
  Navigate(Route),
  /// Show a toast
  Notify(Toast),
  /// Drop all cached data and start over from the list
  Reload,
}

/// Trait for view behavior
///
/// Views handle their own input modes (dialogs, edit, etc.) and return
/// actions for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views that load data asynchronously should use Query<T> internally and
/// poll it in the tick() method.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// The route this view is showing, if it has one
  fn route(&self) -> Option<Route> {
    None
  }

  /// Whether the view is taking text input, so global keys must pass through
  fn captures_input(&self) -> bool {
    false
  }

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Get keyboard shortcuts to display in the header
  /// Override this to provide view-specific shortcuts
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
