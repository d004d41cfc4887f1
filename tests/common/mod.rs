#![allow(dead_code)]

use async_trait::async_trait;
use ragchat::{AnswerService, Message, TransportError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answer service that replays canned results and records every payload
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerService for ScriptedService {
    async fn answer(&self, messages: &[Message]) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
    }
}

pub fn user(text: &str) -> Message {
    Message::user(text).unwrap()
}

pub fn assistant(text: &str) -> Message {
    Message::assistant(text).unwrap()
}
