use crate::api::{Todo, TodoClient};
use crate::cache::{EntryStatus, QueryKey, QueryStore};
use crate::commands::{self, Action};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::mutation::Mutations;
use crate::query::Query;
use crate::routes::Route;
use crate::ui;
use crate::ui::components::{CacheInspector, CommandEvent, CommandInput, KeyResult, Toast, Toasts};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{self, RecoveryView};
use color_eyre::Result;
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Everything a view needs to talk to the data layer
#[derive(Clone)]
pub struct AppContext {
  pub client: TodoClient,
  pub store: QueryStore,
  pub mutations: Mutations,
  pub config: Arc<Config>,
}

impl AppContext {
  pub fn new(config: Config) -> Result<Self> {
    let client = TodoClient::new(&config.api)?;
    let store = QueryStore::new(config.query.options());
    let mutations = Mutations::new(client.clone(), store.clone());
    Ok(Self {
      client,
      store,
      mutations,
      config: Arc::new(config),
    })
  }

  pub fn is_development(&self) -> bool {
    self.config.mode.is_development()
  }

  /// Observer of the whole collection
  pub fn todos_query(&self) -> Query<Vec<Todo>> {
    let client = self.client.clone();
    Query::new(self.store.clone(), QueryKey::Todos, move || {
      let client = client.clone();
      async move { client.list().await }
    })
  }

  /// Observer of one todo
  pub fn todo_query(&self, id: u64) -> Query<Todo> {
    let client = self.client.clone();
    Query::new(self.store.clone(), QueryKey::Todo(id), move || {
      let client = client.clone();
      async move { client.get(id).await }
    })
  }
}

/// Restores the terminal when dropped, including while unwinding
struct TerminalGuard;

impl TerminalGuard {
  fn enter() -> Result<Self> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    // Not every terminal reports focus; refetch-on-focus is best effort
    if let Err(e) = stdout().execute(EnableFocusChange) {
      debug!(error = %e, "focus reporting unavailable");
    }
    Ok(Self)
  }
}

impl Drop for TerminalGuard {
  fn drop(&mut self) {
    let _ = stdout().execute(DisableFocusChange);
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);
  }
}

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack - the list is at index 0 unless recovering
  stack: Vec<Box<dyn View>>,

  /// `:` palette
  command: CommandInput,

  toasts: Toasts,

  inspector: CacheInspector,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let ctx = AppContext::new(config)?;
    let stack = vec![views::open(Route::List, &ctx)];
    Ok(Self {
      command: CommandInput::new(ctx.is_development()),
      ctx,
      stack,
      toasts: Toasts::new(),
      inspector: CacheInspector::new(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(TICK_RATE);
    info!(base_url = %self.ctx.client.base_url(), "started");

    // Main loop
    while !self.should_quit {
      let mut failure = None;
      terminal.draw(|frame| failure = ui::draw(frame, self))?;
      if let Some(message) = failure {
        self.recover(message);
        continue;
      }

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::FocusGained) => {
          let refetching = self.ctx.store.focus_gained();
          debug!(refetching, "focus gained");
        }
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn tick(&mut self) {
    if let Some(view) = self.stack.last_mut() {
      let action = view.tick();
      self.apply(action);
    }
    self.toasts.expire(Instant::now());
    self.ctx.store.collect_garbage();
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let captured = self.current_view().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !captured {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(input)) => {
          self.execute_command(&input);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if !captured && key.code == KeyCode::Char('x') && self.toasts.dismiss() {
      return;
    }

    if let Some(view) = self.stack.last_mut() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn execute_command(&mut self, input: &str) {
    let Some(action) = commands::parse(input, self.ctx.is_development()) else {
      self.toasts.push(
        Toast::error(format!("Unknown command: {}", input)),
        Instant::now(),
      );
      return;
    };
    debug!(?action, "command");

    match action {
      Action::Navigate(route) => self.navigate(route),
      Action::Add => {
        self.navigate(Route::List);
        if let Some(list) = self.stack.last_mut() {
          // The list opens its add dialog on 'a'
          let action = list.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
          self.apply(action);
        }
      }
      Action::Refresh => {
        if let Some(view) = self.stack.last_mut() {
          let action = view.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE));
          self.apply(action);
        }
      }
      Action::ToggleCache => self.inspector.toggle(),
      Action::Quit => self.should_quit = true,
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.stack.push(view),
      ViewAction::Pop => {
        if self.stack.len() > 1 {
          self.stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Navigate(route) => self.navigate(route),
      ViewAction::Notify(toast) => self.toasts.push(toast, Instant::now()),
      ViewAction::Reload => self.reload(),
    }
  }

  /// Show `route` on top of the list. The list itself is kept, so its page
  /// survives a trip to a detail view.
  fn navigate(&mut self, route: Route) {
    debug!(%route, "navigate");
    let root_is_list = self.stack.first().and_then(|v| v.route()) == Some(Route::List);
    if !root_is_list {
      self.stack = vec![views::open(Route::List, &self.ctx)];
    }
    self.stack.truncate(1);
    if route != Route::List {
      self.stack.push(views::open(route, &self.ctx));
    }
  }

  /// Replace the whole stack with the recovery panel
  fn recover(&mut self, message: String) {
    error!(%message, "view failed to render");
    self.stack = vec![Box::new(RecoveryView::new(
      message,
      self.ctx.is_development(),
    ))];
  }

  /// Full reload: forget all server state and start from the list
  fn reload(&mut self) {
    warn!("reloading");
    self.stack.clear();
    self.ctx.store.clear();
    self.stack.push(views::open(Route::List, &self.ctx));
  }

  // Accessors for UI rendering
  pub fn context(&self) -> &AppContext {
    &self.ctx
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut dyn View> {
    match self.stack.last_mut() {
      Some(view) => Some(view.as_mut()),
      None => None,
    }
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }

  pub fn inspector(&self) -> &CacheInspector {
    &self.inspector
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  /// Footer hint while any fetch is running
  pub fn fetching_label(&self) -> Option<&'static str> {
    self
      .ctx
      .store
      .snapshot()
      .iter()
      .any(|entry| entry.status == EntryStatus::Fetching)
      .then_some("syncing...")
  }
}
