use serde::Serialize;
use serde_json::Value;

use super::messages::{CLIENT_MESSAGE_KINDS, ClientMessage, ServerMessage};

/// Maximum inbound frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    Malformed(String),
    MissingKind,
    UnknownKind(String),
    SerializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::Malformed(e) => write!(f, "malformed message: {e}"),
            Self::MissingKind => write!(f, "message has no string `type` field"),
            Self::UnknownKind(kind) => write!(f, "unknown message type: {kind:?}"),
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Unknown kinds are well-formed frames this server does not handle;
    /// everything else means the frame itself could not be understood.
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, Self::UnknownKind(_))
    }
}

fn encode<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Encode a `ServerMessage` to its JSON text form.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    encode(msg)
}

/// Encode a `ClientMessage` to its JSON text form.
pub fn encode_client_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    encode(msg)
}

/// Parse a frame into a JSON object and return it together with its `type`.
fn parse_envelope(data: &[u8]) -> Result<(Value, String), ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let value: Value =
        serde_json::from_slice(data).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(ProtocolError::Malformed("expected a JSON object".to_string()));
    };
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingKind)?
        .to_string();
    Ok((value, kind))
}

/// Decode raw wire data into a `ClientMessage`.
///
/// Gameplay frames must carry a non-null `state`; a missing one is treated
/// as malformed rather than silently becoming `null`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let (value, kind) = parse_envelope(data)?;
    if !CLIENT_MESSAGE_KINDS.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownKind(kind));
    }
    let msg: ClientMessage =
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let missing_state = matches!(
        &msg,
        ClientMessage::Move(m) | ClientMessage::Pass(m) | ClientMessage::Shoot(m)
            if m.state.is_null()
    );
    if missing_state {
        return Err(ProtocolError::Malformed(format!(
            "{} message without state",
            msg.kind()
        )));
    }
    Ok(msg)
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    serde_json::from_slice(data).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
