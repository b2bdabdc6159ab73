use crate::routes::Route;
use crate::ui::renderfns::centered_rect;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Catch-all for unknown routes and missing todos
#[derive(Debug, Default)]
pub struct NotFoundView;

impl View for NotFoundView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Enter | KeyCode::Char('b') | KeyCode::Char('h') => ViewAction::Navigate(Route::List),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let lines = vec![
      Line::styled("404 - Not Found", Style::default().bold()),
      Line::from(""),
      Line::styled(
        "Oops! The page you're looking for seems to have taken a detour.",
        Style::default().fg(Color::DarkGray),
      ),
      Line::from(""),
      Line::styled("Enter: Go Back Home", Style::default().fg(Color::Cyan)),
    ];
    let rect = centered_rect(area.width, lines.len() as u16, area);
    frame.render_widget(Paragraph::new(lines).centered(), rect);
  }

  fn breadcrumb_label(&self) -> String {
    "Not Found".to_string()
  }

  fn route(&self) -> Option<Route> {
    Some(Route::NotFound)
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("enter", "home").with_priority(20),
    ]
  }
}
