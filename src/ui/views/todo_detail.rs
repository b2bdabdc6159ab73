use crate::api::Todo;
use crate::app::AppContext;
use crate::query::{Query, QueryState};
use crate::routes::Route;
use crate::ui::renderfns::completion_color;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for displaying one todo
pub struct TodoDetailView {
  id: u64,
  query: Query<Todo>,
  redirected: bool,
}

impl TodoDetailView {
  pub fn new(ctx: AppContext, id: u64) -> Self {
    let mut query = ctx.todo_query(id);
    // Start fetching immediately
    query.fetch();

    Self {
      id,
      query,
      redirected: false,
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Todo Details ")
      .title_bottom(Line::from(" b: Back to List ").right_aligned())
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let todo = match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        let paragraph = Paragraph::new("Loading todo...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
      QueryState::Error(e) => {
        let paragraph = Paragraph::new(format!("{}\n\nPress 'r' to retry.", e))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
      QueryState::Success(todo) => todo,
    };

    let dim = Style::default().fg(Color::DarkGray);
    let lines = vec![
      Line::styled(todo.title.as_str(), Style::default().bold()),
      Line::from(""),
      Line::from(vec![Span::styled("ID: ", dim), Span::raw(todo.id.to_string())]),
      Line::from(vec![
        Span::styled("User ID: ", dim),
        Span::raw(todo.user_id.to_string()),
      ]),
      Line::from(""),
      Line::styled(
        format!(" {} ", todo.status_label()),
        Style::default()
          .fg(Color::Black)
          .bg(completion_color(todo.completed)),
      ),
    ];

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
  }
}

impl View for TodoDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('b') => ViewAction::Navigate(Route::List),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Todo #{}", self.id)
  }

  fn route(&self) -> Option<Route> {
    Some(Route::Detail(self.id))
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    // A missing todo leaves the detail route once its fetch has settled
    let missing = self.query.error().is_some_and(|e| e.is_not_found());
    if missing && !self.redirected {
      self.redirected = true;
      return ViewAction::Navigate(Route::NotFound);
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("r", "refresh").with_priority(20),
      Shortcut::new("b", "back to list").with_priority(30),
    ]
  }
}
