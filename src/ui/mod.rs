use std::sync::OnceLock;
use std::time::{Duration, Instant};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::theme::{color_name, Theme};
use crate::view::{LogEntry, LogEvent, ViewState};

static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn header() -> Color { theme().header }

/// Text shown on the button for a given Status
pub fn button_label(status: &str) -> String {
    if status.is_empty() {
        "Install hook".to_string()
    } else {
        format!("Install hook {}", status)
    }
}

pub fn draw(f: &mut Frame, view: &ViewState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Button
            Constraint::Length(1), // Hello, world!
            Constraint::Length(1), // Spacer
            Constraint::Min(3),    // Activity log
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_title(f, chunks[0]);
    draw_button(f, view, centered(chunks[2], 60));
    draw_hello(f, view, chunks[3]);
    draw_log(f, view, chunks[5]);
    draw_footer(f, view, chunks[6]);
}

/// Horizontally centered slice of `area`, at most `width` columns
fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn draw_title(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled("◍ ", Style::default().fg(accent())),
        Span::styled("hookdemo", Style::default().fg(header()).add_modifier(Modifier::BOLD)),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(title, area);
}

fn draw_button(f: &mut Frame, view: &ViewState, area: Rect) {
    let status = view.status();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    let label = Paragraph::new(Span::styled(
        button_label(&status.text),
        Style::default().fg(text()).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(block);

    f.render_widget(label, area);
}

fn draw_hello(f: &mut Frame, view: &ViewState, area: Rect) {
    let hello = Paragraph::new(Span::styled(
        "Hello, world!",
        Style::default().fg(view.visual().color),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hello, area);
}

fn draw_log(f: &mut Frame, view: &ViewState, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Activity ", Style::default().fg(inactive())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));

    let now = Instant::now();
    // Newest first
    let items: Vec<ListItem> = view.log().rev().map(|e| log_item(e, now)).collect();

    f.render_widget(List::new(items).block(block), area);
}

fn log_item(entry: &LogEntry, now: Instant) -> ListItem<'static> {
    let age = now.saturating_duration_since(entry.at);
    let mut spans = vec![
        Span::styled(
            format!("{:>6.1}s ", age.as_secs_f32()),
            Style::default().fg(text_dim()),
        ),
        Span::styled(format!("{:<5}", entry.activation.to_string()), Style::default().fg(accent())),
    ];

    match &entry.event {
        LogEvent::Scheduled => {
            spans.push(Span::styled("scheduled", Style::default().fg(text_dim())));
        }
        LogEvent::StatusCommitted(status) => {
            spans.push(Span::styled("status ", Style::default().fg(text_dim())));
            spans.push(Span::styled(status.clone(), Style::default().fg(text())));
        }
        LogEvent::ColorCommitted(color) => {
            spans.push(Span::styled("color  ", Style::default().fg(text_dim())));
            spans.push(Span::styled("██ ", Style::default().fg(*color)));
            spans.push(Span::styled(color_name(*color), Style::default().fg(text())));
        }
    }

    ListItem::new(Line::from(spans))
}

/// Time between the Status and color commits, when both came from the same
/// activation
fn commit_lag(view: &ViewState) -> Option<Duration> {
    let status = view.status();
    let visual = view.visual();
    if status.activation.is_none() || status.activation != visual.activation {
        return None;
    }
    Some(visual.committed_at?.saturating_duration_since(status.committed_at?))
}

fn draw_footer(f: &mut Frame, view: &ViewState, area: Rect) {
    let mut spans = vec![
        Span::styled("Enter", Style::default().fg(accent())),
        Span::styled("/", Style::default().fg(inactive())),
        Span::styled("Space", Style::default().fg(accent())),
        Span::styled(" install hook  ", Style::default().fg(text_dim())),
        Span::styled("q", Style::default().fg(accent())),
        Span::styled(" quit", Style::default().fg(text_dim())),
    ];

    if let Some(lag) = commit_lag(view) {
        spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
        spans.push(Span::styled(
            format!("color +{}ms", lag.as_millis()),
            Style::default().fg(text_dim()),
        ));
    }

    let in_flight = view.in_flight();
    if in_flight > 0 {
        spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
        spans.push(Span::styled(
            format!("{} in flight", in_flight),
            Style::default().fg(accent()),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Status;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::watch;

    fn render(view: &ViewState) -> String {
        let backend = TestBackend::new(70, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_button_label() {
        assert_eq!(button_label(""), "Install hook");
        assert_eq!(button_label("installed"), "Install hook installed");
    }

    #[test]
    fn test_draw_shows_status_and_colored_greeting() {
        let (tx, rx) = watch::channel(Status::default());
        let view = ViewState::new(rx, Color::Blue, 4);

        let screen = render(&view);
        assert!(screen.contains("Install hook"));
        assert!(screen.contains("Hello, world!"));

        tx.send_replace(Status {
            text: "already installed (attempt 2)".to_string(),
            ..Status::default()
        });
        let screen = render(&view);
        assert!(screen.contains("Install hook already installed (attempt 2)"));
    }

    #[test]
    fn test_greeting_takes_visual_attribute() {
        let (_tx, rx) = watch::channel(Status::default());
        let view = ViewState::new(rx, Color::Magenta, 4);

        let backend = TestBackend::new(70, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &view)).unwrap();

        let buffer = terminal.backend().buffer();
        let hello = buffer
            .content()
            .iter()
            .find(|c| c.symbol() == "H")
            .expect("greeting rendered");
        assert_eq!(hello.fg, Color::Magenta);
    }
}
