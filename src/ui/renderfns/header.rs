use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, API host, current route and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  base_url: &str,
  route: &str,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(base_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", route), Style::default().fg(Color::Yellow).bold()),
    Span::raw(" "),
  ];

  // Shortcuts - keys and brackets highlighted, descriptions dimmed
  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Extract host from the API base URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
