//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use commands::{ParsedCommand, SlashCommand, get_help_text};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use indicator::LoadingIndicator;
pub use manager::{ConversationAction, ConversationManager};
