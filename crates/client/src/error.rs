//! Session client errors.

use thiserror::Error;
use wolf_protocol::{ProtocolError, Request};

/// Client errors.
///
/// `ConnectionLost` always ends the session. `ResponseTimeout` is only
/// returned in strict mode; otherwise timeouts are logged and the late
/// value is still sent.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Response timeout for {request}: took {elapsed_ms}ms, budget {budget_ms}ms")]
    ResponseTimeout {
        request: Request,
        elapsed_ms: u64,
        budget_ms: u64,
    },

    #[error("Player callback for {0} panicked")]
    PlayerPanicked(Request),

    #[error("Unexpected request: {0}")]
    UnexpectedRequest(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::ConnectionLost("stream closed before FINISH".to_string());
        assert_eq!(err.to_string(), "Connection lost: stream closed before FINISH");

        let err = ClientError::ResponseTimeout {
            request: Request::Vote,
            elapsed_ms: 250,
            budget_ms: 100,
        };
        assert_eq!(
            err.to_string(),
            "Response timeout for VOTE: took 250ms, budget 100ms"
        );
    }

    #[test]
    fn test_protocol_error_converts() {
        let err: ClientError = ProtocolError::InvalidAgentIndex(-4).into();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::InvalidAgentIndex(-4))
        ));
    }
}
