//! Conversation history pane

use crate::conversation::{ConversationState, Message, Role};
use crate::ui::markdown::render_markdown;
use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};
use std::cell::Cell;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display-side bookkeeping for the conversation: when each message
/// arrived and how far the user has scrolled back.
#[derive(Debug)]
pub struct ConversationHistory {
    title: String,
    greeting: String,
    stamps: Vec<DateTime<Local>>,
    /// Lines scrolled up from the bottom
    scroll_back: usize,
    /// Largest useful `scroll_back`, as of the last render
    max_scroll: Cell<usize>,
    last_seen: (usize, bool),
}

impl ConversationHistory {
    pub fn new(title: String, greeting: String) -> Self {
        Self {
            title,
            greeting,
            stamps: Vec::new(),
            scroll_back: 0,
            max_scroll: Cell::new(0),
            last_seen: (0, false),
        }
    }

    /// Record arrival times for new messages and jump back to the bottom
    /// whenever the messages or the loading flag changed.
    pub fn sync(&mut self, state: &ConversationState) {
        let count = state.messages().len();
        while self.stamps.len() < count {
            self.stamps.push(Local::now());
        }

        let seen = (count, state.is_loading());
        if seen != self.last_seen {
            self.last_seen = seen;
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = (self.scroll_back + lines).min(self.max_scroll.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_back == 0
    }

    /// Borrow the pane as a widget over `state`
    pub fn view<'a>(&'a self, state: &'a ConversationState, tick: usize) -> HistoryView<'a> {
        HistoryView {
            history: self,
            state,
            tick,
        }
    }

    /// All lines of the conversation, wrapped to `width`
    pub fn lines(&self, state: &ConversationState, width: u16, tick: usize) -> Vec<Line<'static>> {
        let width = width as usize;
        let mut all_lines = Vec::new();

        for (index, message) in state.messages().iter().enumerate() {
            if index > 0 {
                all_lines.push(Line::default());
            }
            let stamp = self.stamps.get(index).copied();
            all_lines.extend(render_message(message, stamp, width));
        }

        if state.is_loading() {
            if !all_lines.is_empty() {
                all_lines.push(Line::default());
            }
            all_lines.push(header_line(Role::Assistant, None));
            let pulse = if tick % 2 == 0 {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            all_lines.push(Line::from(vec![Span::raw("  "), Span::styled("...", pulse)]));
        }

        all_lines
    }
}

/// Widget form of [`ConversationHistory`] for one frame
pub struct HistoryView<'a> {
    history: &'a ConversationHistory,
    state: &'a ConversationState,
    tick: usize,
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.history.is_at_bottom() {
            self.history.title.clone()
        } else {
            format!("{} (scrolled, PgDn for newer)", self.history.title)
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.messages().is_empty() && !self.state.is_loading() {
            let greeting = Line::from(vec![Span::styled(
                self.history.greeting.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            let offset = inner_area.height / 3;
            let greeting_area = Rect {
                y: inner_area.y + offset,
                height: inner_area.height - offset,
                ..inner_area
            };
            Paragraph::new(greeting)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(greeting_area, buf);
            self.history.max_scroll.set(0);
            return;
        }

        let text_width = inner_area.width.saturating_sub(1);
        let all_lines = self.history.lines(self.state, text_width, self.tick);

        // Show the window ending `scroll_back` lines above the bottom
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_scroll = total.saturating_sub(height);
        self.history.max_scroll.set(max_scroll);
        let back = self.history.scroll_back.min(max_scroll);
        let start = total - height.min(total) - back;

        for (i, line) in all_lines[start..].iter().take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, text_width);
        }

        if max_scroll > 0 {
            let mut scroll_state = ScrollbarState::new(max_scroll).position(max_scroll - back);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(inner_area, buf, &mut scroll_state);
        }
    }
}

fn header_line(role: Role, stamp: Option<DateTime<Local>>) -> Line<'static> {
    let (badge, label, color) = match role {
        Role::User => ("U", "You", Color::Gray),
        Role::Assistant => ("AI", "Assistant", Color::Blue),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", badge),
            Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", label), Style::default().fg(color)),
    ];
    if let Some(stamp) = stamp {
        spans.push(Span::styled(
            format!(" {}", stamp.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Header plus body. User text is shown literally, assistant text as markdown.
fn render_message(message: &Message, stamp: Option<DateTime<Local>>, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![header_line(message.role(), stamp)];

    let body: Vec<Line<'static>> = match message.role() {
        Role::User => message
            .content()
            .split('\n')
            .map(|text| {
                Line::from(vec![Span::styled(
                    text.to_string(),
                    Style::default().fg(Color::LightBlue),
                )])
            })
            .collect(),
        Role::Assistant => render_markdown(message.content()),
    };

    for line in body {
        let mut indented = vec![Span::raw("  ")];
        indented.extend(line.spans);
        lines.extend(wrap_line(Line::from(indented), width));
    }

    lines
}

/// Greedy word wrap that keeps span styles, measured in display columns.
/// Words longer than `width` are split.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let mut out = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in line.spans {
        let style = span.style;
        for token in split_words(&span.content) {
            let is_space = token.chars().all(char::is_whitespace);
            for piece in split_to_width(token, width) {
                let piece_width = piece.width();
                if current_width + piece_width > width && current_width > 0 {
                    out.push(Line::from(std::mem::take(&mut current)));
                    current_width = 0;
                    if is_space {
                        continue;
                    }
                }
                current.push(Span::styled(piece.to_string(), style));
                current_width += piece_width;
            }
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(Line::from(current));
    }
    out
}

/// Break `token` into pieces no wider than `width` display columns. A single
/// character wider than `width` gets a piece of its own.
fn split_to_width(token: &str, width: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (i, c) in token.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width && used > 0 {
            pieces.push(&token[start..i]);
            start = i;
            used = 0;
        }
        used += w;
    }
    if start < token.len() {
        pieces.push(&token[start..]);
    }
    pieces
}

/// Split into alternating runs of whitespace and non-whitespace
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationController;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut text = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                text.push_str(buf.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let wrapped = wrap_line(Line::from("the quick brown fox"), 10);
        let texts: Vec<String> = wrapped.iter().map(plain).collect();
        assert_eq!(texts, vec!["the quick ", "brown fox"]);
    }

    #[test]
    fn splits_long_words() {
        let wrapped = wrap_line(Line::from("abcdefghij"), 4);
        let texts: Vec<String> = wrapped.iter().map(plain).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wide_characters_wrap_by_display_width() {
        let wrapped = wrap_line(Line::from("你好世界"), 5);
        let texts: Vec<String> = wrapped.iter().map(plain).collect();
        assert_eq!(texts, vec!["你好", "世界"]);
        assert!(wrapped.iter().all(|line| line.width() <= 5));

        let wrapped = wrap_line(Line::from("ok 🦀🦀🦀"), 4);
        assert!(wrapped.iter().all(|line| line.width() <= 4));
    }

    #[test]
    fn keeps_styles_across_wrap() {
        let line = Line::from(vec![
            Span::raw("plain "),
            Span::styled("bold words", Style::default().add_modifier(Modifier::BOLD)),
        ]);
        let wrapped = wrap_line(line, 8);
        let second = &wrapped[1];
        assert!(second.spans.iter().all(|s| s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn split_words_alternates() {
        assert_eq!(split_words("a  bc d"), vec!["a", "  ", "bc", " ", "d"]);
        assert!(split_words("").is_empty());
    }

    #[test]
    fn user_text_is_literal_and_assistant_is_markdown() {
        let mut controller = ConversationController::new();
        controller.begin_submit("**not bold**");
        let _ = controller.resolve(Ok("# Title\n\n- item".to_string()));

        let mut history = ConversationHistory::new("Chat".into(), "hi".into());
        history.sync(controller.state());
        let lines: Vec<String> = history
            .lines(controller.state(), 80, 0)
            .iter()
            .map(plain)
            .collect();

        assert!(lines.iter().any(|l| l == "  **not bold**"));
        assert!(lines.iter().any(|l| l == "  Title"));
        assert!(lines.iter().any(|l| l == "  • item"));
    }

    #[test]
    fn loading_shows_placeholder_bubble() {
        let mut controller = ConversationController::new();
        controller.begin_submit("question");
        let history = ConversationHistory::new("Chat".into(), "hi".into());
        let lines: Vec<String> = history
            .lines(controller.state(), 80, 0)
            .iter()
            .map(plain)
            .collect();
        assert_eq!(lines.last().map(String::as_str), Some("  ..."));
    }

    #[test]
    fn empty_conversation_shows_greeting() {
        let controller = ConversationController::new();
        let history = ConversationHistory::new("Chat".into(), "Ask me anything".into());
        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        history.view(controller.state(), 0).render(area, &mut buf);
        assert!(buffer_text(&buf).contains("Ask me anything"));
    }

    #[test]
    fn follows_bottom_until_scrolled() {
        let mut controller = ConversationController::new();
        let mut history = ConversationHistory::new("Chat".into(), String::new());
        for i in 0..6 {
            controller.begin_submit(&format!("question {}", i));
            let _ = controller.resolve(Ok(format!("answer {}", i)));
        }
        history.sync(controller.state());

        let area = Rect::new(0, 0, 40, 6);
        let mut buf = Buffer::empty(area);
        history.view(controller.state(), 0).render(area, &mut buf);
        assert!(buffer_text(&buf).contains("answer 5"));

        history.scroll_up(100);
        assert!(!history.is_at_bottom());
        let mut buf = Buffer::empty(area);
        history.view(controller.state(), 0).render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("question 0"));
        assert!(!text.contains("answer 5"));
        assert!(text.contains("scrolled"));

        controller.begin_submit("one more");
        history.sync(controller.state());
        assert!(history.is_at_bottom());
    }
}
