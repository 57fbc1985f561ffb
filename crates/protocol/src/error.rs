//! Protocol error taxonomy.

use thiserror::Error;

/// Errors raised while interning agents, parsing utterances or decoding wire data.
///
/// All variants are recoverable by the caller; the session client decides
/// whether to substitute a default or abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed utterance {text:?}: {reason}")]
    MalformedUtterance { text: String, reason: String },

    #[error("Invalid agent index: {0}")]
    InvalidAgentIndex(i64),

    #[error("Schema error in {context}: {message}")]
    SchemaError { context: String, message: String },
}

impl ProtocolError {
    pub(crate) fn malformed(text: &str, reason: impl Into<String>) -> Self {
        ProtocolError::MalformedUtterance {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(context: impl Into<String>, message: impl ToString) -> Self {
        ProtocolError::SchemaError {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
