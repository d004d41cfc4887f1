//! Conversation state and the controller that drives a single exchange with
//! the answer service.
//!
//! The controller is a two-state machine. From `Idle`, a valid submission
//! appends the user's message right away, clears the input and moves to
//! `Awaiting`. The reply (or failure) moves it back to `Idle`. Submissions
//! made while `Awaiting` are ignored rather than queued.

use crate::answer::AnswerService;
use crate::error::{TransportError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in the conversation. Content is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    role: Role,
    content: String,
}

#[derive(Deserialize)]
struct RawMessage {
    role: Role,
    content: String,
}

impl TryFrom<RawMessage> for Message {
    type Error = ValidationError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Message::new(raw.role, raw.content)
    }
}

impl Message {
    /// Build a message, rejecting content that is empty once trimmed.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(Self { role, content })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Whether a request is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Awaiting,
}

/// Everything the view needs to draw a conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    input: String,
    phase: Phase,
    error: Option<String>,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Result of the first half of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted: the full conversation to send to the answer service
    Dispatched(Vec<Message>),
    /// Blank text; only the error field changed
    Rejected(ValidationError),
    /// A request is already in flight
    Ignored,
}

/// Result of a complete submission round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Answered,
    Failed(TransportError),
    Rejected(ValidationError),
    Ignored,
}

/// Owns the conversation and mediates between the composer and the service
#[derive(Debug, Default)]
pub struct ConversationController {
    state: ConversationState,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    pub fn input(&self) -> &str {
        self.state.input()
    }

    /// Replace the input buffer
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
    }

    /// Mirrors the Send button: enabled when idle with non-blank input.
    pub fn can_send(&self) -> bool {
        !self.is_loading() && !self.state.input.trim().is_empty()
    }

    /// Submit whatever is in the input buffer.
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.state.input.clone();
        self.begin_submit(&text)
    }

    /// Validate `text` and, if accepted, append it and enter `Awaiting`.
    pub fn begin_submit(&mut self, text: &str) -> SubmitOutcome {
        if self.is_loading() {
            tracing::debug!("submission ignored while a request is in flight");
            return SubmitOutcome::Ignored;
        }

        let message = match Message::user(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("rejected blank submission");
                self.state.error = Some(err.to_string());
                return SubmitOutcome::Rejected(err);
            }
        };

        self.state.error = None;
        self.state.messages.push(message);
        self.state.input.clear();
        self.state.phase = Phase::Awaiting;

        tracing::info!(messages = self.state.messages.len(), "dispatching conversation");
        SubmitOutcome::Dispatched(self.state.messages.clone())
    }

    /// Apply the service's answer and return to `Idle`.
    ///
    /// Returns the failure that was recorded in the error field, if any.
    pub fn resolve(&mut self, result: Result<String, TransportError>) -> Result<(), TransportError> {
        if !self.is_loading() {
            tracing::warn!("received a reply with no request in flight; dropping it");
            return Ok(());
        }
        self.state.phase = Phase::Idle;

        let message = result.and_then(|reply| {
            Message::assistant(reply)
                .map_err(|_| TransportError::Malformed("empty response".to_string()))
        });

        match message {
            Ok(message) => {
                tracing::info!(chars = message.content().len(), "reply received");
                self.state.messages.push(message);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(status = ?err.status(), error = ?err, "request failed");
                self.state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Full round trip: validate, append, ask the service, apply the result.
    pub async fn submit<S>(&mut self, text: &str, service: &S) -> Exchange
    where
        S: AnswerService + ?Sized,
    {
        let payload = match self.begin_submit(text) {
            SubmitOutcome::Dispatched(payload) => payload,
            SubmitOutcome::Rejected(err) => return Exchange::Rejected(err),
            SubmitOutcome::Ignored => return Exchange::Ignored,
        };

        let result = service.answer(&payload).await;
        match self.resolve(result) {
            Ok(()) => Exchange::Answered,
            Err(err) => Exchange::Failed(err),
        }
    }
}
