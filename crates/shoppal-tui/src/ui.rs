use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use shoppal_core::Role;
use unicode_width::UnicodeWidthChar;
use crate::app::{App, StatusLine};
use crate::markdown;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let session = app.dispatcher.session();
    let session_text = if session.is_established() {
        format!(" session {}", session.token())
    } else {
        " no session".to_string()
    };

    let title = Line::from(vec![
        Span::styled(" Shop Pal ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(session_text, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Build the transcript lines: one labelled block per visible turn.
pub fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for turn in app.dispatcher.transcript().visible() {
        match turn.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Role::Bot => {
                lines.push(Line::from(Span::styled(
                    "Shop Pal:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
        }
        lines.extend(markdown::render_lines(&turn.content));
        lines.push(Line::default());
    }

    if app.is_busy() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.endpoint));

    let lines = transcript_lines(app);
    let text = if lines.is_empty() {
        Text::from(Span::styled(
            "Tell me about what product you want to buy...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };
    let chat = Paragraph::new(text).wrap(Wrap { trim: false });

    // Rows as the word wrapper lays them out, measured before the block is attached
    let rows = u16::try_from(chat.line_count(app.chat_width)).unwrap_or(u16::MAX);

    // Clamp scroll and keep the newest turn visible unless the user scrolled up
    let max_scroll = rows.saturating_sub(app.chat_height);
    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.is_busy();
    let (border_color, title) = if busy {
        (Color::DarkGray, " Loading... ")
    } else {
        (Color::Yellow, " Send (Enter) ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) = input_window(app.dispatcher.draft(), app.input_cursor, inner_width);

    let text_style = if busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    // Cursor only while the input is enabled
    if !busy {
        let cursor_x = u16::try_from(cursor_col).unwrap_or(u16::MAX);
        frame.set_cursor_position((area.x.saturating_add(cursor_x).saturating_add(1), area.y + 1));
    }
}

/// Horizontal scroll for the input box, in terminal columns.
///
/// Returns the part of `draft` that fits in `width` columns with the cursor
/// (a char index) in view, and the cursor's column within that part.
fn input_window(draft: &str, cursor: usize, width: usize) -> (String, usize) {
    let widths: Vec<usize> = draft.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    // The cursor cell itself needs a free column after the text before it
    let mut start = 0;
    while start < cursor && widths[start..cursor].iter().sum::<usize>() >= width {
        start += 1;
    }
    let cursor_col = widths[start..cursor].iter().sum();

    let mut used = 0;
    let visible = draft
        .chars()
        .zip(widths.iter())
        .skip(start)
        .take_while(|&(_, w)| {
            used += w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, cursor_col)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.status {
        Some(StatusLine::Error(message)) => Line::from(Span::styled(
            format!(" {message} "),
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Some(StatusLine::Info(message)) => Line::from(Span::styled(
            format!(" {message} "),
            Style::default().fg(Color::Black).bg(Color::Green),
        )),
        None => Line::from(vec![
            Span::styled(" Enter ", Style::default().fg(Color::Black).bg(Color::Yellow)),
            Span::raw(" send  "),
            Span::styled(" ↑↓ PgUp PgDn ", Style::default().fg(Color::Black).bg(Color::Yellow)),
            Span::raw(" scroll  "),
            Span::styled(" Ctrl+S ", Style::default().fg(Color::Black).bg(Color::Yellow)),
            Span::raw(" save  "),
            Span::styled(" Esc ", Style::default().fg(Color::Black).bg(Color::Yellow)),
            Span::raw(" quit"),
        ]),
    };

    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use pretty_assertions::assert_eq;
    use shoppal_core::{AgentMessage, AgentResponse};

    use super::*;
    use crate::app::tests::{test_app, EchoTransport};
    use crate::markdown::plain_text;

    fn receive_reply(app: &mut App, content: &str) {
        let _ = app.dispatcher.begin("");
        app.dispatcher.settle(Ok(AgentResponse {
            session_id: "s1".to_string(),
            messages: vec![AgentMessage::new("assistant", content)],
        }));
    }

    fn draw(app: &mut App, terminal: &mut Terminal<TestBackend>) -> String {
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_transcript_hides_empty_turns() {
        let mut app = test_app(Arc::new(EchoTransport::default()));
        // Empty nudge: stored, echoed back as "echo: "
        app.submit();
        app.finish_exchange().await;

        let lines = plain_text(&transcript_lines(&app));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Shop Pal:");
        assert_eq!(lines[1].trim_end(), "echo:");
    }

    #[test]
    fn test_thinking_indicator_while_busy() {
        let mut app = test_app(Arc::new(EchoTransport::default()));
        let _ = app.dispatcher.begin("hello");

        let lines = plain_text(&transcript_lines(&app));
        assert_eq!(lines, vec!["You:", "hello", "", "Thinking."]);
    }

    #[test]
    fn test_word_wrapped_reply_scrolls_to_its_end() {
        let mut app = test_app(Arc::new(EchoTransport::default()));
        let words: Vec<String> = ('a'..='p').map(|c| c.to_string().repeat(6)).collect();
        receive_reply(&mut app, &format!("{} ENDMRK", words.join(" ")));
        // 10 columns inside the borders: one word per row
        let mut terminal = Terminal::new(TestBackend::new(12, 10)).unwrap();

        assert!(draw(&mut app, &mut terminal).contains("ENDMRK"));

        app.scroll_up(100);
        let top = draw(&mut app, &mut terminal);
        assert!(top.contains("aaaaaa"));
        assert!(!top.contains("ENDMRK"));

        for _ in 0..50 {
            app.scroll_down(1);
        }
        let bottom = draw(&mut app, &mut terminal);
        assert!(bottom.contains("pppppp"));
        assert!(bottom.contains("ENDMRK"));
        assert!(app.follow_tail);
    }

    #[test]
    fn test_input_window_scrolls_by_columns() {
        assert_eq!(input_window("abc", 3, 10), ("abc".to_string(), 3));
        assert_eq!(input_window("abcdef", 6, 4), ("def".to_string(), 3));
        assert_eq!(input_window("abcdef", 0, 4), ("abcd".to_string(), 0));
    }

    #[test]
    fn test_input_window_counts_wide_chars() {
        // Each of these takes two columns
        assert_eq!(input_window("購物車", 2, 10), ("購物車".to_string(), 4));
        assert_eq!(input_window("購物車好", 4, 5), ("車好".to_string(), 4));
        assert_eq!(input_window("ab購物", 3, 4), ("b購".to_string(), 3));
    }

    #[test]
    fn test_render_draws_header_and_placeholder() {
        let mut app = test_app(Arc::new(EchoTransport::default()));
        let backend = TestBackend::new(60, 12);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let screen: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Shop Pal"));
        assert!(screen.contains("no session"));
        assert!(screen.contains("Tell me about what product"));
        assert_eq!(app.chat_height, 5);
    }
}
