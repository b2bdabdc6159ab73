use crate::cache::{EntrySnapshot, EntryStatus};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Row, Table};

/// Development-mode panel listing every cache entry
#[derive(Debug, Clone, Default)]
pub struct CacheInspector {
  visible: bool,
}

impl CacheInspector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_visible(&self) -> bool {
    self.visible
  }

  pub fn toggle(&mut self) {
    self.visible = !self.visible;
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, entries: &[EntrySnapshot]) {
    if !self.visible {
      return;
    }

    let rows: Vec<Row> = entries
      .iter()
      .map(|entry| {
        let updated = entry
          .updated_at
          .map(|t| t.format("%H:%M:%S").to_string())
          .unwrap_or_else(|| "-".to_string());
        let detail = match &entry.error {
          Some(e) => e.to_string(),
          None if entry.has_value => String::new(),
          None => "no data".to_string(),
        };
        Row::new(vec![
          Cell::from(entry.key.to_string()),
          Cell::from(entry.status.label()).style(Style::default().fg(status_color(entry.status))),
          Cell::from(entry.observers.to_string()),
          Cell::from(updated),
          Cell::from(detail).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let header = Row::new(vec!["key", "status", "obs", "updated", ""])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(
      rows,
      [
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(4),
        Constraint::Length(9),
        Constraint::Min(0),
      ],
    )
    .header(header)
    .block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" Cache ({}) ", entries.len())),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(table, area);
  }
}

fn status_color(status: EntryStatus) -> Color {
  match status {
    EntryStatus::Fresh => Color::Green,
    EntryStatus::Stale => Color::Yellow,
    EntryStatus::Fetching => Color::Cyan,
    EntryStatus::Error => Color::Red,
  }
}
