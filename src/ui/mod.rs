pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use view::View;

/// Main draw function. Returns the panic message if the current view failed
/// to render.
pub fn draw(frame: &mut Frame, app: &mut App) -> Option<String> {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let (content, inspector_area) = if app.inspector().is_visible() {
    let split = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(chunks[1]);
    (split[0], Some(split[1]))
  } else {
    (chunks[1], None)
  };

  let ctx = app.context().clone();
  let (route, shortcuts) = match app.current_view() {
    Some(view) => (
      view.route().map(|r| r.to_string()).unwrap_or_default(),
      view.shortcuts(),
    ),
    None => (String::new(), Vec::new()),
  };
  renderfns::draw_header(
    frame,
    chunks[0],
    ctx.config.title(),
    ctx.client.base_url(),
    &route,
    &shortcuts,
  );

  let failure = match app.current_view_mut() {
    Some(view) => render_guarded(view, frame, content).err(),
    None => None,
  };

  if let Some(area) = inspector_area {
    app.inspector().render(frame, area, &ctx.store.snapshot());
  }

  let status = app.fetching_label();
  renderfns::draw_footer(frame, chunks[2], &app.breadcrumb(), status);

  app.command().render_overlay(frame, content);
  app.toasts().render_overlay(frame, content);

  failure
}

/// Render a view, turning a panic inside it into an error message
pub fn render_guarded(view: &mut dyn View, frame: &mut Frame, area: Rect) -> Result<(), String> {
  panic::catch_unwind(AssertUnwindSafe(|| view.render(frame, area)))
    .map_err(|payload| panic_message(payload.as_ref()))
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown error".to_string()
  }
}

/// Keep a list selection inside `len` rows
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
