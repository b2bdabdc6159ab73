use crate::api::{ApiError, Todo};
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::pagination::Pagination;
use crate::query::{Query, QueryState};
use crate::routes::Route;
use crate::ui::components::{DialogEvent, KeyResult, Toast, TodoDialog};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{completion_color, draw_pagination, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::TodoDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// The paginated todo list with add/edit/delete dialogs
pub struct TodoListView {
  ctx: AppContext,
  query: Query<Vec<Todo>>,
  pagination: Pagination,
  list_state: ListState,
  dialog: TodoDialog,
  create: Mutation<Todo>,
  update: Mutation<Todo>,
  delete: Mutation<bool>,
  /// Last mutation failure, shown above the list until the next success
  alert: Option<String>,
}

impl TodoListView {
  pub fn new(ctx: AppContext) -> Self {
    let mut query = ctx.todos_query();
    // Start fetching immediately
    query.fetch();

    Self {
      pagination: Pagination::new(ctx.config.list.page_size),
      ctx,
      query,
      list_state: ListState::default().with_selected(Some(0)),
      dialog: TodoDialog::new(),
      create: Mutation::new(),
      update: Mutation::new(),
      delete: Mutation::new(),
      alert: None,
    }
  }

  fn todos(&self) -> &[Todo] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn page(&self) -> &[Todo] {
    self.pagination.window(self.todos())
  }

  fn selected(&self) -> Option<&Todo> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.page().get(idx))
  }

  fn handle_dialog_event(&mut self, event: DialogEvent) {
    let mutations = self.ctx.mutations.clone();
    let started = match event {
      DialogEvent::Create(title) => self
        .create
        .start(async move { mutations.submit_create(&title).await }),
      DialogEvent::Update {
        base,
        title,
        completed,
      } => self.update.start(async move {
        mutations.submit_update(&base, &title, completed).await
      }),
      DialogEvent::Delete(id) => self
        .delete
        .start(async move { mutations.submit_delete(id).await }),
      DialogEvent::Cancelled => false,
    };
    if started {
      self.dialog.set_pending(true);
    }
  }

  /// Turn a finished mutation into dialog state, the inline alert and a toast
  fn settle<T>(&mut self, outcome: Result<T, ApiError>, success: impl FnOnce(T) -> String) -> ViewAction {
    self.dialog.set_pending(false);
    match outcome {
      Ok(value) => {
        self.dialog.close();
        self.alert = None;
        ViewAction::Notify(Toast::success(success(value)))
      }
      Err(e) => {
        let message = e.to_string();
        self.dialog.set_error(message.clone());
        self.alert = Some(message.clone());
        ViewAction::Notify(Toast::error(message))
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Your Todos ")
      .title_bottom(Line::from(" a: Add New Todo ").right_aligned())
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        let paragraph = Paragraph::new("Loading todos...")
          .block(block)
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
      }
      QueryState::Error(e) => {
        let paragraph = Paragraph::new(format!("{}\n\nPress 'r' to retry.", e))
          .block(block)
          .wrap(Wrap { trim: true })
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, area);
        return;
      }
      QueryState::Success(_) => {}
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let alert_height = if self.alert.is_some() { 1 } else { 0 };
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(alert_height), // Inline alert
        Constraint::Min(1),               // Rows
        Constraint::Length(1),            // Pager
      ])
      .split(inner);

    if let Some(alert) = &self.alert {
      let paragraph = Paragraph::new(format!("! {}", alert)).style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, chunks[0]);
    }

    let len = self.page().len();
    ensure_valid_selection(&mut self.list_state, len);

    let width = chunks[1].width.saturating_sub(20) as usize;
    let items: Vec<ListItem> = self
      .page()
      .iter()
      .map(|todo| {
        let color = completion_color(todo.completed);
        let checkbox = if todo.completed { "[x]" } else { "[ ]" };
        let title_style = if todo.completed {
          Style::default().add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
        } else {
          Style::default()
        };

        let line = Line::from(vec![
          Span::styled(checkbox, Style::default().fg(color)),
          Span::raw(" "),
          Span::styled(truncate(&todo.title, width), title_style),
          Span::raw(" "),
          Span::styled(
            format!("({})", todo.status_label()),
            Style::default().fg(color),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    if items.is_empty() {
      let paragraph = Paragraph::new("No todos yet. Press 'a' to add one.")
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[1]);
    } else {
      let list = List::new(items)
        .highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
    }

    draw_pagination(frame, chunks[2], &self.pagination, self.todos().len());
  }
}

impl View for TodoListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // An open dialog takes every key
    match self.dialog.handle_key(key) {
      KeyResult::Event(event) => {
        self.handle_dialog_event(event);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let len = self.todos().len();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
        self.pagination.next_page(len);
        self.list_state.select(Some(0));
      }
      KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
        self.pagination.previous_page();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('s') => {
        self.pagination.cycle_page_size();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('a') => {
        self.dialog.open_add();
      }
      KeyCode::Char('e') | KeyCode::Char(' ') => {
        if let Some(todo) = self.selected().cloned() {
          self.dialog.open_edit(&todo);
        }
      }
      KeyCode::Char('d') | KeyCode::Delete => {
        if let Some(todo) = self.selected().cloned() {
          self.dialog.open_delete(&todo);
        }
      }
      KeyCode::Enter | KeyCode::Char('v') => {
        if let Some(todo) = self.selected() {
          let id = todo.id;
          return ViewAction::Push(Box::new(TodoDetailView::new(self.ctx.clone(), id)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.dialog.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Todos".to_string()
  }

  fn route(&self) -> Option<Route> {
    Some(Route::List)
  }

  fn captures_input(&self) -> bool {
    self.dialog.is_open()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if let Some(list) = self.query.shared_data() {
      if self.pagination.observe(list) {
        self.list_state.select(Some(0));
      }
    }

    if let Some(outcome) = self.create.poll() {
      return self.settle(outcome, |todo| {
        format!("\"{}\" has been successfully added.", todo.title)
      });
    }
    if let Some(outcome) = self.update.poll() {
      return self.settle(outcome, |todo| {
        format!("\"{}\" has been successfully updated.", todo.title)
      });
    }
    if let Some(outcome) = self.delete.poll() {
      return self.settle(outcome, |_| "The todo has been successfully deleted.".to_string());
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("a", "add").with_priority(20),
      Shortcut::new("e", "edit").with_priority(30),
      Shortcut::new("d", "delete").with_priority(40),
      Shortcut::new("enter", "details").with_priority(50),
      Shortcut::new("r", "refresh").with_priority(60),
      Shortcut::new("q", "quit").with_priority(90),
    ]
  }
}
