mod common;

use common::{ScriptedService, assistant, user};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ragchat::config::UiConfig;
use ragchat::error::FALLBACK_ERROR;
use ragchat::events::AppEvent;
use ragchat::TransportError;
use ragchat::ui::conversation::{ConversationAction, ConversationManager};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::sync::Arc;
use tokio::sync::mpsc;

fn manager_with(
    service: ScriptedService,
) -> (ConversationManager, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = ConversationManager::new(&UiConfig::default(), Arc::new(service), tx);
    (manager, rx)
}

fn type_text(manager: &mut ConversationManager, text: &str) {
    for c in text.chars() {
        manager.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
}

fn press(manager: &mut ConversationManager, code: KeyCode) -> ConversationAction {
    manager.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
}

async fn next_answer(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Result<String, TransportError> {
    loop {
        match rx.recv().await {
            Some(AppEvent::Answer(result)) => return result,
            Some(_) => continue,
            None => panic!("event channel closed"),
        }
    }
}

fn screen(manager: &ConversationManager) -> String {
    let area = Rect::new(0, 0, 70, 24);
    let mut buf = Buffer::empty(area);
    manager.render(area, &mut buf);
    (0..area.height)
        .map(|y| {
            (0..area.width)
                .map(|x| buf.get(x, y).symbol().to_string())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn typed_question_round_trips_through_the_event_channel() {
    let (mut manager, mut rx) = manager_with(ScriptedService::replying("**Ten** years of Rust."));

    type_text(&mut manager, "How much experience?");
    assert_eq!(manager.controller().input(), "How much experience?");

    press(&mut manager, KeyCode::Enter);
    assert!(manager.controller().is_loading());
    assert_eq!(manager.controller().messages(), &[user("How much experience?")]);
    assert!(screen(&manager).contains("AI is thinking"));

    let result = next_answer(&mut rx).await;
    manager.handle_answer(result);

    assert!(!manager.controller().is_loading());
    assert_eq!(
        manager.controller().messages(),
        &[user("How much experience?"), assistant("**Ten** years of Rust.")]
    );
    let rendered = screen(&manager);
    assert!(rendered.contains("Ten years of Rust."));
    assert!(!rendered.contains("**Ten**"));
}

#[tokio::test]
async fn keys_are_ignored_while_awaiting() {
    let (mut manager, mut rx) = manager_with(ScriptedService::new(vec![
        Ok("first answer".into()),
        Ok("second answer".into()),
    ]));

    type_text(&mut manager, "one");
    press(&mut manager, KeyCode::Enter);
    assert!(manager.controller().is_loading());

    type_text(&mut manager, "two");
    press(&mut manager, KeyCode::Enter);
    assert_eq!(manager.controller().messages().len(), 1);

    let result = next_answer(&mut rx).await;
    manager.handle_answer(result);
    assert_eq!(manager.controller().messages().len(), 2);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failure_shows_banner_and_keeps_question() {
    let (mut manager, mut rx) = manager_with(ScriptedService::new(vec![Err(
        TransportError::Network("refused".into()),
    )]));

    type_text(&mut manager, "Hello?");
    press(&mut manager, KeyCode::Enter);
    let result = next_answer(&mut rx).await;
    manager.handle_answer(result);

    assert_eq!(manager.controller().error(), Some(FALLBACK_ERROR));
    assert_eq!(manager.controller().messages(), &[user("Hello?")]);
    assert!(screen(&manager).contains(FALLBACK_ERROR));
}

#[tokio::test]
async fn slash_commands_stay_out_of_the_conversation() {
    let (mut manager, _rx) = manager_with(ScriptedService::default());

    type_text(&mut manager, "/help");
    assert_eq!(press(&mut manager, KeyCode::Enter), ConversationAction::None);
    assert!(manager.notice().is_some());
    assert!(manager.controller().messages().is_empty());

    type_text(&mut manager, "/quit");
    assert_eq!(press(&mut manager, KeyCode::Enter), ConversationAction::Exit);
    assert!(manager.controller().messages().is_empty());
}

#[tokio::test]
async fn ctrl_c_exits() {
    let (mut manager, _rx) = manager_with(ScriptedService::default());
    let action = manager.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert_eq!(action, ConversationAction::Exit);
}

#[tokio::test]
async fn esc_exits() {
    let (mut manager, _rx) = manager_with(ScriptedService::default());
    assert_eq!(press(&mut manager, KeyCode::Esc), ConversationAction::Exit);
}

#[tokio::test]
async fn esc_closes_palette_before_exiting() {
    let (mut manager, _rx) = manager_with(ScriptedService::default());

    type_text(&mut manager, "/");
    assert_eq!(press(&mut manager, KeyCode::Esc), ConversationAction::None);
    assert_eq!(press(&mut manager, KeyCode::Esc), ConversationAction::Exit);
}

#[tokio::test]
async fn esc_exits_while_awaiting() {
    let (mut manager, _rx) = manager_with(ScriptedService::replying("later"));

    type_text(&mut manager, "still there?");
    press(&mut manager, KeyCode::Enter);
    assert!(manager.controller().is_loading());
    assert_eq!(press(&mut manager, KeyCode::Esc), ConversationAction::Exit);
}

#[tokio::test]
async fn service_error_replaces_help_notice() {
    let (mut manager, mut rx) = manager_with(ScriptedService::new(vec![Err(
        TransportError::Service {
            status: 503,
            message: "index is rebuilding".into(),
        },
    )]));

    type_text(&mut manager, "/help");
    press(&mut manager, KeyCode::Enter);
    assert!(manager.notice().is_some());

    type_text(&mut manager, "Hi");
    press(&mut manager, KeyCode::Enter);
    let result = next_answer(&mut rx).await;
    manager.handle_answer(result);

    assert_eq!(manager.controller().error(), Some("index is rebuilding"));
    assert!(screen(&manager).contains("index is rebuilding"));
}

#[tokio::test]
async fn empty_conversation_shows_greeting() {
    let (manager, _rx) = manager_with(ScriptedService::default());
    let rendered = screen(&manager);
    assert!(rendered.contains(&UiConfig::default().greeting));
}
