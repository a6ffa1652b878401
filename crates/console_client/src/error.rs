use console_types::error::{ErrorDetail, FieldErrors};
use thiserror::Error;

/// Failure of a single intent invocation.
///
/// `Transport` covers network failures and undecodable bodies, `Http` a
/// non-success status without field-level detail, and `Validation` a
/// body-encoded failure whose fields are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("remote rejected request: {0}")]
    Validation(FieldErrors),
}

impl IntentError {
    /// Collapse to the display shape carried by terminal error events.
    pub fn detail(&self) -> ErrorDetail {
        match self {
            IntentError::Transport(message) => ErrorDetail::Message(message.clone()),
            IntentError::Http { message, .. } => ErrorDetail::Message(message.clone()),
            IntentError::Validation(fields) => ErrorDetail::Fields(fields.clone()),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            IntentError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for IntentError {
    fn from(value: reqwest::Error) -> Self {
        IntentError::Transport(value.to_string())
    }
}
