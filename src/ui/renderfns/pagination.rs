use crate::pagination::{page_count, Pagination};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the pager line under the list: rows per page, range and page number
pub fn draw_pagination(frame: &mut Frame, area: Rect, pagination: &Pagination, len: usize) {
  let dim = Style::default().fg(Color::DarkGray);
  let line = Line::from(vec![
    Span::styled("Rows per page: ", dim),
    Span::styled(
      pagination.page_size().rows().to_string(),
      Style::default().fg(Color::Cyan),
    ),
    Span::styled(" (s)   ", dim),
    Span::raw(pagination.range_label(len)),
    Span::styled("   ‹ h ", dim),
    Span::raw(format!(
      "page {}/{}",
      pagination.page_index() + 1,
      page_count(len, pagination.page_size())
    )),
    Span::styled(" l › ", dim),
  ])
  .right_aligned();

  frame.render_widget(Paragraph::new(line), area);
}
