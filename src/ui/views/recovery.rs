use crate::ui::renderfns::centered_rect;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Shown in place of the whole view stack after a view failed to render
#[derive(Debug)]
pub struct RecoveryView {
  message: String,
  /// Development mode shows what failed
  show_details: bool,
}

impl RecoveryView {
  pub fn new(message: String, show_details: bool) -> Self {
    Self {
      message,
      show_details,
    }
  }
}

impl View for RecoveryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Enter | KeyCode::Char('r') => ViewAction::Reload,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
      Line::styled("Whoops! Something went wrong.", Style::default().bold()),
      Line::from(""),
      Line::styled(
        "It looks like there was an unexpected error. Please try reloading.",
        Style::default().fg(Color::DarkGray),
      ),
      Line::from(""),
      Line::styled("Enter: Reload", Style::default().fg(Color::Cyan)),
    ];
    let height = lines.len() as u16;

    if !self.show_details {
      let rect = centered_rect(area.width, height, area);
      frame.render_widget(Paragraph::new(lines).centered(), rect);
      return;
    }

    lines.push(Line::from(""));
    let details_height = 5;
    let rect = centered_rect(area.width.min(80), height + 1 + details_height, area);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(height + 1), Constraint::Min(0)])
      .split(rect);
    frame.render_widget(Paragraph::new(lines).centered(), chunks[0]);

    let details = Paragraph::new(self.message.as_str())
      .wrap(Wrap { trim: false })
      .style(Style::default().fg(Color::Red))
      .block(
        Block::default()
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Red))
          .title(" Error Details (Development Only) "),
      );
    frame.render_widget(details, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Error".to_string()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("enter", "reload")]
  }
}
