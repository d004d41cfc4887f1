use crate::config::{Config, FormEncoding};
use crate::conversation::Message;
use crate::error::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Duration;

/// Form field carrying the JSON-encoded conversation
pub const MESSAGES_FIELD: &str = "messages";

/// Backend that turns a conversation into one assistant reply
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Send the full conversation, newest user message last, and return the
    /// reply text.
    async fn answer(&self, messages: &[Message]) -> Result<String, TransportError>;
}

/// Answer service reached over HTTP with a form-encoded POST
#[derive(Clone)]
pub struct HttpAnswerService {
    client: reqwest::Client,
    url: String,
    encoding: FormEncoding,
}

impl HttpAnswerService {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.answer_url(),
            encoding: config.encoding,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, payload: String) -> reqwest::RequestBuilder {
        let request = self.client.post(&self.url);
        match self.encoding {
            FormEncoding::Multipart => {
                let form = reqwest::multipart::Form::new().text(MESSAGES_FIELD, payload);
                request.multipart(form)
            }
            FormEncoding::Urlencoded => request.form(&[(MESSAGES_FIELD, payload)]),
        }
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn answer(&self, messages: &[Message]) -> Result<String, TransportError> {
        let payload = serde_json::to_string(messages)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        tracing::debug!(url = %self.url, messages = messages.len(), encoding = ?self.encoding, "posting conversation");

        let response = self
            .build_request(payload)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "answer service responded");
        parse_answer(status.as_u16(), status.is_success(), &body)
    }
}

/// Interpret an answer service response body.
///
/// Success bodies must carry a non-blank string `response`. Failure bodies may
/// carry a string `error`, which is passed through verbatim.
pub fn parse_answer(status: u16, success: bool, body: &str) -> Result<String, TransportError> {
    let parsed = serde_json::from_str::<Value>(body);

    if !success {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        return Err(match message {
            Some(message) => TransportError::Service { status, message },
            None => TransportError::Status { status },
        });
    }

    let value = parsed.map_err(|e| TransportError::Malformed(e.to_string()))?;
    match value.get("response").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_owned()),
        Some(_) => Err(TransportError::Malformed("empty `response` field".to_string())),
        None => Err(TransportError::Malformed("missing `response` field".to_string())),
    }
}
