use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with view breadcrumb and a right-aligned status
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&str>) {
  let mut spans = Vec::new();

  spans.push(Span::raw(" "));

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);

  if let Some(status) = status {
    let status = Paragraph::new(Line::from(format!("{} ", status)).right_aligned())
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, area);
  }
}
