//! Terminal chat client for a retrieval-augmented answer service.
//!
//! The conversation lives in a [`conversation::ConversationController`],
//! which talks to an [`answer::AnswerService`]. The `ui` and `tui` modules
//! put a ratatui front end on top.

pub mod answer;
pub mod app;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod tui;
pub mod ui;

pub use answer::{AnswerService, HttpAnswerService};
pub use config::Config;
pub use conversation::{ConversationController, ConversationState, Exchange, Message, Role};
pub use error::{TransportError, ValidationError};
