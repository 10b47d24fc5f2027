use touchline_core::net::messages::{ClientMessage, GameplayKind, ServerMessage};
use touchline_core::net::protocol::decode_client_message;

use crate::broadcast::send_direct;
use crate::registry::Connection;
use crate::session_manager::SessionManager;

/// What became of one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// State changed and was broadcast.
    Handled,
    /// A precondition failed; the sender got a direct `error`.
    Rejected,
    /// Valid but inapplicable right now (gameplay while idle).
    Ignored,
    /// Undecodable or of an unknown kind. Nobody is told.
    Dropped,
}

/// Decode one frame from `connection` and apply it to the shared state.
///
/// The caller must hold the manager exclusively for the duration, which is
/// what serializes concurrent connections.
pub fn route_message(
    manager: &mut SessionManager,
    connection: &Connection,
    data: &[u8],
) -> RouteOutcome {
    let msg = match decode_client_message(data) {
        Ok(msg) => msg,
        Err(e) if e.is_unknown_kind() => {
            tracing::info!(connection_id = connection.id, error = %e, "Ignoring message");
            return RouteOutcome::Dropped;
        },
        Err(e) => {
            tracing::warn!(
                connection_id = connection.id,
                size = data.len(),
                error = %e,
                "Dropping undecodable message"
            );
            return RouteOutcome::Dropped;
        },
    };

    match msg {
        ClientMessage::Join(join) => match manager.join(connection, join) {
            Ok(()) => RouteOutcome::Handled,
            Err(e) => reject(connection, "join", &e),
        },
        ClientMessage::Start => match manager.start(connection.id) {
            Ok(()) => RouteOutcome::Handled,
            Err(e) => reject(connection, "start", &e),
        },
        ClientMessage::Move(m) => gameplay(manager, connection, GameplayKind::Move, m.state),
        ClientMessage::Pass(m) => gameplay(manager, connection, GameplayKind::Pass, m.state),
        ClientMessage::Shoot(m) => gameplay(manager, connection, GameplayKind::Shoot, m.state),
    }
}

fn gameplay(
    manager: &mut SessionManager,
    connection: &Connection,
    kind: GameplayKind,
    state: serde_json::Value,
) -> RouteOutcome {
    if manager.apply_gameplay(connection.id, kind, state) {
        RouteOutcome::Handled
    } else {
        RouteOutcome::Ignored
    }
}

fn reject(connection: &Connection, kind: &str, reason: &dyn std::fmt::Display) -> RouteOutcome {
    tracing::warn!(connection_id = connection.id, kind, reason = %reason, "Request rejected");
    send_direct(
        connection.id,
        &connection.sender,
        &ServerMessage::error(reason.to_string()),
    );
    RouteOutcome::Rejected
}
