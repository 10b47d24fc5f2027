//! Best-effort fan-out of server messages.
//!
//! Sends use `try_send` on each connection's bounded channel, so the caller
//! never waits on a socket. A full or closed channel loses that one frame
//! for that one recipient and nothing else.

use axum::extract::ws::Utf8Bytes;

use touchline_core::net::messages::ServerMessage;
use touchline_core::net::protocol::encode_server_message;
use touchline_core::participant::ConnectionId;

use crate::registry::{ConnectionRegistry, ConnectionSender};

fn encode(msg: &ServerMessage) -> Option<Utf8Bytes> {
    match encode_server_message(msg) {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server message");
            None
        },
    }
}

/// Encode `msg` once and queue it for every joined participant.
/// Returns how many recipients accepted the frame.
pub fn broadcast(registry: &ConnectionRegistry, msg: &ServerMessage) -> usize {
    let Some(frame) = encode(msg) else {
        return 0;
    };
    let mut delivered = 0;
    for (connection_id, sender) in registry.senders() {
        match sender.try_send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::debug!(
                    connection_id, error = %e,
                    "Skipping broadcast to slow or closed client"
                );
            },
        }
    }
    delivered
}

/// Queue `msg` for exactly one connection. Used for rejection notices that
/// must not reach anyone else.
pub fn send_direct(
    connection_id: ConnectionId,
    sender: &ConnectionSender,
    msg: &ServerMessage,
) -> bool {
    let Some(frame) = encode(msg) else {
        return false;
    };
    match sender.try_send(frame) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(
                connection_id, error = %e,
                "Failed to send to client (slow or disconnected)"
            );
            false
        },
    }
}
