use touchline_core::net::messages::ServerMessage;
use touchline_core::participant::{ConnectionId, Participant};

use super::SessionManager;
use crate::broadcast::broadcast;

/// How departures of connections that never joined are announced.
const UNJOINED_DISPLAY_NAME: &str = "A player";

impl SessionManager {
    /// Allocate an identity for a freshly opened transport connection.
    /// The connection does not count toward the roster until it joins.
    pub fn open_connection(&mut self) -> ConnectionId {
        let id = self.ids.alloc();
        tracing::debug!(connection_id = id, "Connection opened");
        id
    }

    /// Handle a transport close for any reason. Safe to call for connections
    /// that never joined and for ids that were already removed.
    ///
    /// Every close triggers a roster update and a departure log; a connection
    /// that never joined is announced as "A player". If a departure leaves a
    /// running session below quorum, the session is stopped and everyone left
    /// is told so.
    pub fn close_connection(&mut self, id: ConnectionId) -> Option<Participant> {
        let departed = self.registry.remove(id);
        let name = match &departed {
            Some(participant) => {
                tracing::info!(
                    connection_id = id,
                    name = %participant.display_name,
                    players = self.registry.count(),
                    "Player disconnected"
                );
                participant.display_name.as_str()
            },
            None => {
                tracing::debug!(connection_id = id, "Connection closed before joining");
                UNJOINED_DISPLAY_NAME
            },
        };

        self.broadcast_roster();
        broadcast(
            &self.registry,
            &ServerMessage::log(format!("{name} disconnected.")),
        );

        if self.session.stop_below_quorum(self.registry.count()) {
            tracing::info!(
                players = self.registry.count(),
                "Not enough players, game stopped"
            );
            broadcast(
                &self.registry,
                &ServerMessage::log("Not enough players. Game stopped."),
            );
        }

        departed
    }
}
