use crate::routes::Route;
use crate::ui::view::{View, ViewAction};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Exercises the render error boundary: rendering always panics
#[derive(Debug, Default)]
pub struct CrashView;

impl View for CrashView {
  fn handle_key(&mut self, _key: KeyEvent) -> ViewAction {
    ViewAction::Pop
  }

  fn render(&mut self, _frame: &mut Frame, _area: Rect) {
    panic!("This is a simulated error for the error boundary!");
  }

  fn breadcrumb_label(&self) -> String {
    "Test Error".to_string()
  }

  fn route(&self) -> Option<Route> {
    Some(Route::CrashTest)
  }
}
