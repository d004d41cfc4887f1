use crate::answer::AnswerService;
use crate::config::UiConfig;
use crate::conversation::{ConversationController, Message, SubmitOutcome};
use crate::error::TransportError;
use crate::events::AppEvent;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, LoadingIndicator, ParsedCommand,
    SlashCommand, get_help_text,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::sync::Arc;
use tokio::sync::mpsc;

const PAGE: usize = 5;
const MAX_COMPOSER_LINES: u16 = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Owns the conversation controller and the widgets that display it, and
/// runs requests to the answer service in the background.
pub struct ConversationManager {
    controller: ConversationController,
    composer: ConversationComposer,
    history: ConversationHistory,
    service: Arc<dyn AnswerService>,
    events: mpsc::UnboundedSender<AppEvent>,
    notice: Option<String>,
    tick: usize,
}

impl ConversationManager {
    pub fn new(
        ui: &UiConfig,
        service: Arc<dyn AnswerService>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            controller: ConversationController::new(),
            composer: ConversationComposer::new(ui.placeholder.clone()),
            history: ConversationHistory::new(ui.title.clone(), ui.greeting.clone()),
            service,
            events,
            notice: None,
            tick: 0,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            return ConversationAction::Exit;
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up(PAGE);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(PAGE);
                return ConversationAction::None;
            }
            // Esc closes the palette first, then quits
            KeyCode::Esc if !self.composer.is_palette_open() => {
                return ConversationAction::Exit;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(_) => {
                self.notice = None;
                self.submit();
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::Edited => {
                self.controller.set_input(self.composer.content());
                ConversationAction::None
            }
            ComposerResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        if self.composer.paste(text) == ComposerResult::Edited {
            self.controller.set_input(self.composer.content());
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.history.scroll_up(1),
            MouseEventKind::ScrollDown => self.history.scroll_down(1),
            _ => {}
        }
    }

    /// Apply the result of the in-flight request
    pub fn handle_answer(&mut self, result: Result<String, TransportError>) {
        if let Err(err) = self.controller.resolve(result) {
            tracing::debug!(error = ?err, "showing answer failure in the status line");
        }
        self.sync();
    }

    /// Advance animations
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn submit(&mut self) {
        self.controller.set_input(self.composer.content());
        if let SubmitOutcome::Dispatched(payload) = self.controller.submit_input() {
            self.composer.clear();
            self.dispatch(payload);
        }
        self.sync();
    }

    fn dispatch(&self, payload: Vec<Message>) {
        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = service.answer(&payload).await;
            if events.send(AppEvent::Answer(result)).is_err() {
                tracing::debug!("event loop closed before the answer arrived");
            }
        });
    }

    /// Bring the widgets in line with the controller
    fn sync(&mut self) {
        self.history.sync(self.controller.state());
        self.composer.set_enabled(!self.controller.is_loading());
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        self.controller.set_input(String::new());
        match command.command {
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    fn status_line(&self) -> Option<Line<'static>> {
        if let Some(error) = self.controller.error() {
            return Some(Line::from(vec![Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            )]));
        }
        if let Some(notice) = &self.notice {
            return Some(Line::from(vec![Span::styled(
                notice.clone(),
                Style::default().fg(Color::Gray),
            )]));
        }
        None
    }

    fn composer_height(&self) -> u16 {
        let lines = self.composer.content().split('\n').count() as u16;
        lines.clamp(1, MAX_COMPOSER_LINES) + 2
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),                        // History
                Constraint::Length(1),                     // Status
                Constraint::Length(self.composer_height()), // Composer
            ])
            .split(area);

        self.history
            .view(self.controller.state(), self.tick)
            .render(chunks[0], buf);

        if self.controller.is_loading() {
            LoadingIndicator::new(self.tick).render(chunks[1], buf);
        } else if let Some(line) = self.status_line() {
            buf.set_line(chunks[1].x, chunks[1].y, &line, chunks[1].width);
        }

        self.composer.render(chunks[2], buf);

        let palette_height = self.composer.palette_height().min(chunks[0].height);
        if palette_height > 0 {
            let palette_area = Rect {
                x: chunks[0].x,
                y: chunks[0].bottom() - palette_height,
                width: chunks[0].width,
                height: palette_height,
            };
            self.composer.render_palette(palette_area, buf);
        }
    }
}
