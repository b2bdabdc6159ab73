use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Action, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Suggestions shown below the input at most
const MAX_VISIBLE: usize = 8;

/// What the palette hands back to the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  Submitted(String),
  Cancelled,
}

/// The `:` palette: a command word with completion, optionally followed by
/// an argument such as a todo id or a route path.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
  dev: bool,
}

impl CommandInput {
  /// `dev` makes development-only commands visible
  pub fn new(dev: bool) -> Self {
    Self {
      dev,
      ..Self::default()
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  pub fn activate(&mut self) {
    self.reset(true);
  }

  fn reset(&mut self, active: bool) {
    self.active = active;
    self.input.clear();
    self.selected = 0;
  }

  /// The input has moved past the command word
  fn has_argument(&self) -> bool {
    let value = self.input.value().trim_start();
    value.starts_with('/') || value.contains(char::is_whitespace)
  }

  /// Completions for the command word; none once an argument is typed
  pub fn suggestions(&self) -> Vec<&'static Command> {
    if self.has_argument() {
      return Vec::new();
    }
    commands::get_suggestions(self.input.value().trim(), self.dev)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected
  }

  /// Move the highlight by `delta`, wrapping around
  fn step(&mut self, delta: isize) {
    let count = self.suggestions().len() as isize;
    if count > 0 {
      self.selected = (self.selected as isize + delta).rem_euclid(count) as usize;
    }
  }

  /// `:` opens the palette; every other key is ignored until then
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.reset(false);
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let command = self.resolve_command();
        self.reset(false);
        KeyResult::Event(CommandEvent::Submitted(command))
      }
      KeyCode::Tab | KeyCode::Down => {
        self.step(1);
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.step(-1);
        KeyResult::Handled
      }
      _ => match self.input.handle_key(key) {
        InputResult::Consumed => {
          self.selected = 0;
          KeyResult::Handled
        }
        InputResult::NotHandled => KeyResult::NotHandled,
        _ => KeyResult::Handled,
      },
    }
  }

  /// Resolve the final command: the highlighted suggestion for a bare
  /// command word, the raw input once an argument follows
  fn resolve_command(&self) -> String {
    match self.suggestions().get(self.selected) {
      Some(cmd) => cmd.name.to_string(),
      None => self.input.value().trim().to_string(),
    }
  }

  /// One-line description of what Enter would do with an argument typed
  fn preview(&self) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    match commands::parse(self.input.value(), self.dev) {
      Some(Action::Navigate(route)) => Line::from(vec![
        Span::styled("go to ", dim),
        Span::styled(route.to_string(), Style::default().fg(Color::Cyan)),
      ]),
      Some(_) => Line::styled("run command", dim),
      None => Line::styled("unknown command", Style::default().fg(Color::Red)),
    }
  }

  fn suggestion_line(&self, index: usize, cmd: &Command) -> Line<'static> {
    let highlight = index == self.selected;
    let name_style = if highlight {
      Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
      Style::default().fg(Color::Cyan)
    };
    let mut spans = vec![
      Span::styled(format!(" {:<9}", cmd.name), name_style),
      Span::styled(format!(" {}", cmd.description), Style::default().fg(Color::Gray)),
    ];
    if !cmd.aliases.is_empty() {
      spans.push(Span::styled(
        format!("  ({})", cmd.aliases.join(", ")),
        Style::default().fg(Color::DarkGray),
      ));
    }
    Line::from(spans)
  }

  /// Draw the palette in the top-left corner of `area` while active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let mut lines = vec![Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value().to_string()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ])];
    if self.has_argument() {
      lines.push(self.preview());
    } else {
      let suggestions = self.suggestions();
      // Keep the highlighted row on screen
      let skip = (self.selected + 1).saturating_sub(MAX_VISIBLE);
      lines.extend(
        suggestions
          .iter()
          .enumerate()
          .skip(skip)
          .take(MAX_VISIBLE)
          .map(|(i, cmd)| self.suggestion_line(i, cmd)),
      );
    }

    let width = (area.width * 3 / 5).clamp(30, 70).min(area.width);
    let height = lines.len() as u16 + 2;
    let rect = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ")
      .title_bottom(Line::from(" tab: next  enter: run  esc: close ").right_aligned());
    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
  }
}
