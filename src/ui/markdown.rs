//! Markdown to terminal lines.
//!
//! Assistant replies are parsed with pulldown-cmark and flattened into styled
//! ratatui lines. Wrapping to the pane width happens later, in the history
//! pane.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const RULE_WIDTH: usize = 24;

/// Render markdown into styled lines
pub fn render_markdown(markdown: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = MarkdownRenderer::default();
    for event in Parser::new_ext(markdown, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct MarkdownRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list: next number for ordered lists
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
}

impl MarkdownRenderer {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    self.code_text(&text);
                } else {
                    self.push_text(text.into_string(), self.style());
                }
            }
            Event::Code(code) => {
                self.push_text(code.into_string(), code_style());
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_text(html.trim_end_matches('\n').to_string(), self.style());
            }
            Event::SoftBreak => self.push_text(" ".to_string(), self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.block_gap();
                self.push_text("─".repeat(RULE_WIDTH), Style::default().fg(Color::DarkGray));
                self.flush();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_text(marker.to_string(), self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                self.styles.push(heading_style(level));
            }
            Tag::BlockQuote { .. } => {
                self.block_gap();
                self.quote_depth += 1;
                self.styles.push(self.style().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push_text(lang.into_string(), Style::default().fg(Color::DarkGray));
                        self.flush();
                    }
                }
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let prefix = format!("{}{}{}", self.quote_prefix(), "  ".repeat(depth), marker);
                self.spans
                    .push(Span::styled(prefix, Style::default().fg(Color::Cyan)));
            }
            Tag::Emphasis => self.styles.push(self.style().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(self.style().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.styles.push(self.style().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { .. } => self.styles.push(
                self.style()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.styles.pop();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
            }
            TagEnd::CodeBlock { .. } => {
                self.flush();
                self.in_code_block = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link { .. } => {
                self.styles.pop();
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn quote_prefix(&self) -> String {
        "│ ".repeat(self.quote_depth)
    }

    fn push_text(&mut self, text: String, style: Style) {
        if text.is_empty() {
            return;
        }
        if self.spans.is_empty() {
            let indent = format!("{}{}", self.quote_prefix(), "  ".repeat(self.lists.len()));
            if !indent.is_empty() {
                self.spans
                    .push(Span::styled(indent, Style::default().fg(Color::DarkGray)));
            }
        }
        self.spans.push(Span::styled(text, style));
    }

    fn code_text(&mut self, text: &str) {
        for line in text.lines() {
            let mut spans = vec![Span::raw(format!("{}  ", self.quote_prefix()))];
            spans.push(Span::styled(line.to_string(), code_style()));
            self.lines.push(Line::from(spans));
        }
    }

    /// Close the current line, if anything is on it
    fn flush(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.lines.push(Line::from(spans));
        }
    }

    /// Blank line between top-level blocks
    fn block_gap(&mut self) {
        self.flush();
        let last_blank = self
            .lines
            .last()
            .is_some_and(|line| line.spans.iter().all(|s| s.content.trim().is_empty()));
        if !self.lines.is_empty() && !last_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base.fg(Color::Magenta),
        _ => base.fg(Color::LightMagenta),
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}
