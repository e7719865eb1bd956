//! Terminal rendering of turn content.
//!
//! Same display policy as the HTML renderer, in terminal terms: links print
//! their target after the label, images become a bounded placeholder, rules
//! are padded with blank lines and raw HTML is reduced to its text.

use pulldown_cmark::{Event, LinkType, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use shoppal_core::render::{image_placeholder, markdown_options, HtmlSanitizer};

const RULE_WIDTH: usize = 24;

/// Convert markdown + inline HTML into styled terminal lines.
pub fn render_lines(content: &str) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::new();
    let mut html_block = String::new();
    let mut in_html_block = false;

    for event in Parser::new_ext(content, markdown_options()) {
        if let Some(alt) = builder.image_alt.as_mut() {
            match event {
                Event::End(TagEnd::Image) => {
                    let alt = builder.image_alt.take().unwrap_or_default();
                    builder.push_span(image_placeholder(&alt), Style::default().fg(Color::Magenta));
                }
                Event::Text(text) | Event::Code(text) => alt.push_str(&text),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::HtmlBlock) => {
                builder.flush_if_open();
                in_html_block = true;
            }
            Event::Start(tag) => builder.start(tag),
            Event::End(TagEnd::HtmlBlock) => {
                in_html_block = false;
                let text = builder.sanitizer.text(&std::mem::take(&mut html_block));
                builder.push_text(text.trim_matches('\n'));
                builder.blank();
            }
            Event::End(tag) => builder.end(tag),
            Event::Html(raw) if in_html_block => html_block.push_str(&raw),
            Event::Html(raw) | Event::InlineHtml(raw) => {
                let text = builder.sanitizer.text(&raw);
                builder.push_text(&text);
            }
            _ if builder.sanitizer.is_skipping() => {}
            Event::Text(text) => builder.push_text(&text),
            Event::Code(code) => builder.push_span(code.to_string(), Style::default().fg(Color::Yellow)),
            Event::SoftBreak => builder.push_text(" "),
            Event::HardBreak => builder.flush(),
            Event::Rule => {
                builder.blank();
                builder.lines.push(Line::from(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(Color::DarkGray),
                )));
                builder.lines.push(Line::default());
            }
            Event::TaskListMarker(checked) => {
                builder.push_text(if checked { "[x] " } else { "[ ] " });
            }
            _ => {}
        }
    }

    builder.finish()
}

/// Flatten styled lines to plain text, one string per line.
pub fn plain_text(lines: &[Line<'_>]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
        .collect()
}

struct LineBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// `None` for autolinks, whose label already is the target
    links: Vec<Option<String>>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    image_alt: Option<String>,
    sanitizer: HtmlSanitizer,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            styles: Vec::new(),
            links: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            image_alt: None,
            sanitizer: HtmlSanitizer::default(),
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { .. } => {
                self.flush_if_open();
                self.push_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
            }
            Tag::BlockQuote { .. } => {
                self.flush_if_open();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock { .. } => {
                self.flush_if_open();
                self.push_style(Style::default().fg(Color::Yellow));
            }
            Tag::List(start) => {
                self.flush_if_open();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_if_open();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let bullet = format!("{indent}{number}. ");
                        *number += 1;
                        bullet
                    }
                    _ => format!("{indent}• "),
                };
                self.push_span(bullet, Style::default().fg(Color::DarkGray));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { link_type, dest_url, .. } => {
                let target = match link_type {
                    LinkType::Autolink | LinkType::Email => None,
                    _ => Some(dest_url.to_string()),
                };
                self.links.push(target);
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Tag::Image { .. } => self.image_alt = Some(String::new()),
            Tag::Table(_) => self.flush_if_open(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_if_open();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading { .. } | TagEnd::CodeBlock => {
                self.pop_style();
                self.flush_if_open();
                self.blank();
            }
            TagEnd::BlockQuote { .. } => {
                self.pop_style();
                self.flush_if_open();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::List { .. } => {
                self.flush_if_open();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item | TagEnd::TableHead | TagEnd::TableRow => self.flush_if_open(),
            TagEnd::TableCell => self.push_span(" │ ".to_string(), Style::default().fg(Color::DarkGray)),
            TagEnd::Table => self.blank(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(Some(target)) = self.links.pop() {
                    if !target.is_empty() {
                        self.push_span(format!(" ({target})"), Style::default().fg(Color::DarkGray));
                    }
                }
            }
            _ => {}
        }
    }

    fn push_span(&mut self, text: String, style: Style) {
        self.spans.push(Span::styled(text, style));
    }

    /// Push text, starting a new line at every `\n`.
    fn push_text(&mut self, text: &str) {
        let style = self.style();
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            if !first.is_empty() {
                self.spans.push(Span::styled(first.to_string(), style));
            }
        }
        for part in parts {
            self.flush();
            if !part.is_empty() {
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn flush(&mut self) {
        let mut spans = std::mem::take(&mut self.spans);
        if self.quote_depth > 0 {
            spans.insert(
                0,
                Span::styled("│ ".repeat(self.quote_depth), Style::default().fg(Color::DarkGray)),
            );
        }
        self.lines.push(Line::from(spans));
    }

    fn flush_if_open(&mut self) {
        if !self.spans.is_empty() {
            self.flush();
        }
    }

    /// Separate blocks with a single empty line.
    fn blank(&mut self) {
        self.flush_if_open();
        match self.lines.last() {
            None => {}
            Some(line) if line.spans.is_empty() => {}
            Some(_) => self.lines.push(Line::default()),
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_if_open();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
