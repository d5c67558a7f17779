//! The `error` module defines the error types used within the `popbridge`
//! application.
//!
//! Decode failures and broker-side failures are deliberately separate types:
//! the first category is always recoverable (the offending frame is dropped),
//! while the second feeds the session state machine's transitions.

use thiserror::Error;

/// A client frame that could not be turned into a control message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed control frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{kind} request with empty topic")]
    EmptyTopic { kind: &'static str },
}

/// Failures raised while driving a session or its broker connection.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("broker operation failed: {0}")]
    BrokerOperation(#[from] rumqttc::ClientError),

    #[error("'{kind}' not valid while session is {state}")]
    OutOfSequence {
        kind: &'static str,
        state: &'static str,
    },
}
