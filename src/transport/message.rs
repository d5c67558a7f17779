use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::utils::error::DecodeError;

/// A control message sent by a client over the WebSocket.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "connect")]
    Connect,

    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "publish")]
    Publish { topic: String, payload: String },

    #[serde(rename = "disconnect")]
    Disconnect,
}

impl ClientMessage {
    /// The wire discriminator for this message, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Connect => "connect",
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::Publish { .. } => "publish",
            ClientMessage::Disconnect => "disconnect",
        }
    }
}

/// A notification pushed from the bridge to a client.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected")]
    Connected { message: String },

    #[serde(rename = "message")]
    Message { topic: String, payload: String },

    #[serde(rename = "subscribed")]
    Subscribed { topic: String },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "disconnected")]
    Disconnected { message: String },
}

/// Parses one text frame into a `ClientMessage`.
///
/// A failure here never tears the session down; the caller logs the error
/// and drops the frame. Topics are required to be non-empty so a broker
/// operation is never attempted on a blank filter.
pub fn decode(frame: &str) -> Result<ClientMessage, DecodeError> {
    let message: ClientMessage = serde_json::from_str(frame)?;

    match &message {
        ClientMessage::Subscribe { topic } | ClientMessage::Publish { topic, .. }
            if topic.is_empty() =>
        {
            Err(DecodeError::EmptyTopic {
                kind: message.kind(),
            })
        }
        _ => Ok(message),
    }
}

/// Serializes a `ServerMessage` into a WebSocket text frame.
pub fn encode(message: &ServerMessage) -> WsMessage {
    // Serializing these enums cannot fail: every variant is a flat
    // struct of strings.
    WsMessage::text(serde_json::to_string(message).unwrap())
}
