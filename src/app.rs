use crate::answer::{AnswerService, HttpAnswerService};
use crate::config::Config;
use crate::conversation::{ConversationController, Exchange};
use crate::error::FALLBACK_ERROR;
use crate::events::AppEvent;
use crate::tui::{self, EventHandler};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Result, anyhow};
use ratatui::{Terminal, backend::Backend};
use std::sync::Arc;

/// Run the interactive chat until the user quits
pub async fn run(config: Config) -> Result<()> {
    let service = HttpAnswerService::new(&config)?;
    tracing::info!(url = service.url(), "starting chat session");

    let mut events = EventHandler::new();
    let mut manager = ConversationManager::new(&config.ui, Arc::new(service), events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = event_loop(&mut terminal, &mut events, &mut manager).await;

    tui::restore()?;
    tracing::info!(
        messages = manager.controller().messages().len(),
        "chat session ended"
    );
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
    manager: &mut ConversationManager,
) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            let area = frame.size();
            manager.render(area, frame.buffer_mut());
        })?;

        let Some(event) = events.next().await else {
            return Ok(());
        };

        match event {
            AppEvent::Key(key) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            AppEvent::Mouse(mouse) => manager.handle_mouse(mouse),
            AppEvent::Paste(text) => manager.handle_paste(&text),
            AppEvent::Resize(width, height) => {
                tracing::debug!(width, height, "terminal resized");
            }
            AppEvent::Tick => manager.tick(),
            AppEvent::Answer(result) => manager.handle_answer(result),
            AppEvent::InputLost(reason) => {
                return Err(anyhow!("terminal input stopped: {}", reason));
            }
        }
    }
}

/// One-shot exchange: send `text` as a fresh conversation and return the
/// reply text.
pub async fn ask<S>(service: &S, text: &str) -> Result<String>
where
    S: AnswerService + ?Sized,
{
    let mut controller = ConversationController::new();
    match controller.submit(text, service).await {
        Exchange::Answered => controller
            .messages()
            .last()
            .map(|message| message.content().to_string())
            .ok_or_else(|| anyhow!(FALLBACK_ERROR)),
        Exchange::Failed(_) | Exchange::Rejected(_) | Exchange::Ignored => Err(anyhow!(
            controller.error().unwrap_or(FALLBACK_ERROR).to_string()
        )),
    }
}
