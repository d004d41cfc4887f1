use crate::ui::conversation::commands::{
    CommandEntry, ParsedCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::cell::{Cell, RefCell};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter on non-blank text; the composer keeps its content until the
    /// caller clears it
    Submitted(String),
    Command(ParsedCommand),
    /// The text changed
    Edited,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in characters
    pub cursor_position: usize,
}

impl TextAreaState {
    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }
}

/// Input line at the bottom of the chat
pub struct ConversationComposer {
    state: RefCell<TextAreaState>,
    placeholder: String,
    has_focus: bool,
    enabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: RefCell<Vec<CommandEntry>>,
    show_command_palette: Cell<bool>,
    selected_command: Cell<Option<usize>>,
}

impl ConversationComposer {
    pub fn new(placeholder: String) -> Self {
        Self {
            state: RefCell::new(TextAreaState::default()),
            placeholder,
            has_focus: true,
            enabled: true,
            command_entries: command_entries(),
            filtered_commands: RefCell::new(Vec::new()),
            show_command_palette: Cell::new(false),
            selected_command: Cell::new(None),
        }
    }

    /// Handle key input. Ignored entirely while disabled.
    pub fn handle_key(&self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press || !self.enabled {
            return ComposerResult::None;
        }

        let mut state = self.state.borrow_mut();

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_str(&mut state, "\n");
                    return ComposerResult::Edited;
                } else if self.show_command_palette.get()
                    && parse_slash_command(&state.content).is_none()
                    && self.apply_selected_command(&mut state)
                {
                    return ComposerResult::Edited;
                } else if !state.content.trim().is_empty() {
                    self.close_command_palette();
                    if let Some(command) = parse_slash_command(&state.content) {
                        state.content.clear();
                        state.cursor_position = 0;
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(state.content.clone());
                }
            }
            KeyCode::Up => {
                if self.show_command_palette.get() {
                    self.move_command_selection(-1);
                }
            }
            KeyCode::Down => {
                if self.show_command_palette.get() {
                    self.move_command_selection(1);
                }
            }
            KeyCode::Esc => {
                if self.show_command_palette.get() {
                    self.close_command_palette();
                }
            }
            KeyCode::Tab => {
                if self.show_command_palette.get() && self.apply_selected_command(&mut state) {
                    return ComposerResult::Edited;
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return ComposerResult::None;
                }
                self.insert_str(&mut state, &c.to_string());
                self.sync_command_palette(&state);
                return ComposerResult::Edited;
            }
            KeyCode::Backspace => {
                if self.backspace(&mut state) {
                    self.sync_command_palette(&state);
                    return ComposerResult::Edited;
                }
            }
            KeyCode::Delete => {
                if self.delete(&mut state) {
                    self.sync_command_palette(&state);
                    return ComposerResult::Edited;
                }
            }
            KeyCode::Left => {
                state.cursor_position = state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if state.cursor_position < state.char_count() {
                    state.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                state.cursor_position = 0;
            }
            KeyCode::End => {
                state.cursor_position = state.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&self, text: &str) -> ComposerResult {
        if !self.enabled || text.is_empty() {
            return ComposerResult::None;
        }
        let mut state = self.state.borrow_mut();
        self.insert_str(&mut state, text);
        self.sync_command_palette(&state);
        ComposerResult::Edited
    }

    fn insert_str(&self, state: &mut TextAreaState, text: &str) {
        let at = state.byte_index(state.cursor_position);
        state.content.insert_str(at, text);
        state.cursor_position += text.chars().count();
    }

    /// Delete character before cursor
    fn backspace(&self, state: &mut TextAreaState) -> bool {
        if state.cursor_position == 0 {
            return false;
        }
        state.cursor_position -= 1;
        let at = state.byte_index(state.cursor_position);
        state.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&self, state: &mut TextAreaState) -> bool {
        if state.cursor_position >= state.char_count() {
            return false;
        }
        let at = state.byte_index(state.cursor_position);
        state.content.remove(at);
        true
    }

    fn sync_command_palette(&self, state: &TextAreaState) {
        let is_command_word = state.content.starts_with('/')
            && !state.content.chars().any(char::is_whitespace);
        if is_command_word {
            if !self.show_command_palette.get() {
                self.show_command_palette.set(true);
                self.selected_command.set(Some(0));
            }
            self.refresh_command_palette(state);
        } else if self.show_command_palette.get() {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&self) {
        self.show_command_palette.set(false);
        self.filtered_commands.borrow_mut().clear();
        self.selected_command.set(None);
    }

    fn refresh_command_palette(&self, state: &TextAreaState) {
        let query = state.content.trim_start_matches('/').to_lowercase();
        let mut filtered = self.filtered_commands.borrow_mut();
        filtered.clear();

        for entry in &self.command_entries {
            if query.is_empty() || entry.keyword.starts_with(&query) {
                filtered.push(*entry);
            }
        }

        if filtered.is_empty() {
            self.selected_command.set(None);
        } else {
            let index = self.selected_command.get().unwrap_or(0);
            self.selected_command.set(Some(index.min(filtered.len() - 1)));
        }
    }

    fn move_command_selection(&self, delta: isize) {
        let filtered = self.filtered_commands.borrow();
        if filtered.is_empty() {
            self.selected_command.set(None);
            return;
        }

        let len = filtered.len() as isize;
        let current = self.selected_command.get().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command.set(Some(next as usize));
    }

    fn apply_selected_command(&self, state: &mut TextAreaState) -> bool {
        let entry = {
            let filtered = self.filtered_commands.borrow();
            match self.selected_command.get().and_then(|i| filtered.get(i)) {
                Some(entry) => *entry,
                None => return false,
            }
        };

        state.content = format!("/{}", entry.keyword);
        state.cursor_position = state.char_count();
        self.close_command_palette();
        true
    }

    /// Disable while a request is in flight
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Get current content
    pub fn content(&self) -> String {
        self.state.borrow().content.clone()
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette.get()
    }

    /// Clear content
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.content.clear();
        state.cursor_position = 0;
        drop(state);
        self.close_command_palette();
    }

    /// Height of the command palette when shown, including borders
    pub fn palette_height(&self) -> u16 {
        if self.show_command_palette.get() {
            (self.filtered_commands.borrow().len().min(5) + 2) as u16
        } else {
            0
        }
    }

    /// Draw the palette into `area`, typically just above the composer
    pub fn render_palette(&self, area: Rect, buf: &mut Buffer) {
        if !self.show_command_palette.get() {
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Commands")
            .style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        block.render(area, buf);

        let filtered = self.filtered_commands.borrow();
        let selected = self.selected_command.get();
        for (index, entry) in filtered.iter().enumerate().take(inner.height as usize) {
            let style = if selected == Some(index) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(format!("/{}", entry.keyword), style),
                Span::styled("  ", Style::default()),
                Span::styled(entry.description, Style::default().fg(Color::Gray)),
            ]);
            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state.borrow();

        let border_style = if !self.enabled {
            Style::default().fg(Color::DarkGray)
        } else if self.has_focus {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        let title = if self.enabled { "Message" } else { "Message (waiting for reply)" };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = state.content.clone();
        if self.has_focus && self.enabled {
            content.insert(state.byte_index(state.cursor_position), '▌');
        }

        // Keep the line holding the cursor visible
        let lines: Vec<&str> = content.split('\n').collect();
        let height = inner_area.height.max(1) as usize;
        let start = lines.len().saturating_sub(height);
        for (i, line_text) in lines[start..].iter().enumerate() {
            let line = Line::from(vec![Span::raw(*line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}
