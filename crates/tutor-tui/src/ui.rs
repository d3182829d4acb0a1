use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tutor_core::{ChatRole, ConversationState};
use crate::app::{App, ServerStatus};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        chars.next();

        let mut bold_text = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            bold_text.push(c);
        }

        if found_close && !bold_text.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(
                bold_text,
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            // No closing **, treat as literal
            current_text.push_str("**");
            current_text.push_str(&bold_text);
            if found_close {
                current_text.push_str("**");
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Copy out of the watch channel so drawing never holds its lock
    let state = app.view.borrow().clone();

    render_header(app, frame, header_area);
    render_chat(app, &state, frame, chat_area);
    render_input(app, state.pending, frame, input_area);
    render_footer(state.pending, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = match &app.server {
        ServerStatus::Checking => {
            Span::styled("checking server...", Style::default().fg(Color::Gray))
        }
        ServerStatus::Online(health) if health.is_ok() => {
            let tools = if health.mcp_connected {
                format!("online, {} tools", health.tools_count)
            } else {
                "online, no tools".to_string()
            };
            Span::styled(tools, Style::default().fg(Color::Green))
        }
        ServerStatus::Online(health) => Span::styled(
            format!("status: {}", health.status),
            Style::default().fg(Color::Yellow),
        ),
        ServerStatus::Offline(err) => {
            Span::styled(format!("offline: {}", err), Style::default().fg(Color::Red))
        }
    };

    let title = Line::from(vec![
        Span::styled(" Math Tutor ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!("{} ", app.endpoint), Style::default().fg(Color::Gray)),
        status,
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, state: &ConversationState, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();

    for msg in &state.history {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Tutor:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if state.pending {
        lines.push(Line::from(Span::styled(
            "Tutor:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, pending: bool, frame: &mut Frame, area: Rect) {
    let (border_color, title) = if pending {
        (Color::DarkGray, " Waiting for the tutor... ")
    } else {
        (Color::Yellow, " Ask your tutor ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box (inner width excludes borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if !pending {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(pending: bool, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan).bold();
    let hint_style = Style::default().fg(Color::Gray);

    let mut spans = Vec::new();
    if !pending {
        spans.push(Span::styled(" Enter", key_style));
        spans.push(Span::styled(" send ", hint_style));
    }
    spans.extend([
        Span::styled(" Ctrl+L", key_style),
        Span::styled(" clear ", hint_style),
        Span::styled(" PgUp/PgDn", key_style),
        Span::styled(" scroll ", hint_style),
        Span::styled(" Esc", key_style),
        Span::styled(" quit ", hint_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(line: &Line) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| {
                (
                    s.content.to_string(),
                    s.style.add_modifier.contains(Modifier::BOLD),
                )
            })
            .collect()
    }

    #[test]
    fn test_bold_markdown() {
        let line = parse_markdown_line("Step 1: **x = -3/2** done");
        assert_eq!(
            rendered(&line),
            vec![
                ("Step 1: ".to_string(), false),
                ("x = -3/2".to_string(), true),
                (" done".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_unclosed_and_single_stars_are_literal() {
        let line = parse_markdown_line("2*3 = 6 and **open");
        assert_eq!(rendered(&line), vec![("2*3 = 6 and **open".to_string(), false)]);
    }

    #[test]
    fn test_plain_and_empty_lines() {
        assert_eq!(rendered(&parse_markdown_line("x = 4")), vec![("x = 4".to_string(), false)]);
        assert!(parse_markdown_line("").spans.is_empty());
    }
}
