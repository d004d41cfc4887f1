//! Error taxonomy for a chat session.
//!
//! Neither error is fatal: both are surfaced in the error banner and the
//! controller returns to idle afterwards.

use thiserror::Error;

/// Message shown when the answer service fails without saying why.
pub const FALLBACK_ERROR: &str = "Failed to get response.";

/// Message shown when the user tries to send blank text.
pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty.";

/// Local rejection of a candidate message before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message cannot be empty.")]
    EmptyMessage,
}

/// Failure of a round trip to the answer service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The service answered with a non-success status and its own message
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The service answered with a non-success status and no usable message
    #[error("Failed to get response.")]
    Status { status: u16 },

    /// The request never produced a response
    #[error("Failed to get response.")]
    Network(String),

    /// The response body was not the expected JSON shape
    #[error("Failed to get response.")]
    Malformed(String),
}

impl TransportError {
    /// Text to place in the conversation's error field.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// HTTP status, when the service responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Service { status, .. } | TransportError::Status { status } => {
                Some(*status)
            }
            TransportError::Network(_) | TransportError::Malformed(_) => None,
        }
    }
}
