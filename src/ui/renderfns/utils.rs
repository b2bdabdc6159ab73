use ratatui::prelude::{Color, Rect};

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a todo's completion state
pub fn completion_color(completed: bool) -> Color {
  if completed {
    Color::Green
  } else {
    Color::Yellow
  }
}

/// A `width` x `height` rect centered in `area`, clamped to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  let x = area.x + (area.width - width) / 2;
  let y = area.y + (area.height - height) / 2;
  Rect::new(x, y, width, height)
}
