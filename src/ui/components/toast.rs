use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::ui::renderfns::truncate;

/// How many toasts are visible at once
pub const MAX_TOASTS: usize = 3;
/// Toasts disappear on their own after this long
pub const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

/// A transient notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
}

impl Toast {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      kind: ToastKind::Error,
      message: message.into(),
    }
  }
}

/// Stack of visible toasts, newest last
#[derive(Debug, Default)]
pub struct Toasts {
  items: VecDeque<(Toast, Instant)>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, toast: Toast, now: Instant) {
    if self.items.len() == MAX_TOASTS {
      self.items.pop_front();
    }
    self.items.push_back((toast, now));
  }

  /// Drop toasts older than [`TOAST_TTL`]
  pub fn expire(&mut self, now: Instant) {
    self
      .items
      .retain(|(_, shown)| now.saturating_duration_since(*shown) < TOAST_TTL);
  }

  /// Dismiss the newest toast; returns `false` if there was none
  pub fn dismiss(&mut self) -> bool {
    self.items.pop_back().is_some()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Toast> {
    self.items.iter().map(|(toast, _)| toast)
  }

  /// Stack toasts in the bottom-right corner of `area`
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let width = 44.min(area.width);
    let mut bottom = area.y + area.height;

    for toast in self.iter().rev() {
      let height = 3;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let rect = Rect::new(area.x + area.width - width, bottom, width, height);

      let (color, label) = match toast.kind {
        ToastKind::Success => (Color::Green, " ok "),
        ToastKind::Error => (Color::Red, " error "),
      };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(label)
        .title_bottom(Line::from(" x dismiss ").right_aligned());
      let message = truncate(&toast.message, (width as usize).saturating_sub(4) * 2);
      let paragraph = Paragraph::new(message)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White));

      frame.render_widget(Clear, rect);
      frame.render_widget(paragraph, rect);
    }
  }
}
