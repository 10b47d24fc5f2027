//! The single owned aggregate behind all shared state: roster, session and
//! join policy. Every mutation goes through `&mut SessionManager`, and the
//! server holds it behind one `RwLock`, so there is exactly one critical
//! section for registry and session changes.

mod lifecycle;

use serde_json::Value;

use touchline_core::net::messages::{GameplayKind, JoinMsg, ServerMessage};
use touchline_core::participant::{ConnectionId, ConnectionIdAllocator, Participant};
use touchline_core::session::{Session, SessionStatus, StartError};

use crate::broadcast::broadcast;
use crate::join_policy::JoinPolicy;
use crate::registry::{Connection, ConnectionRegistry};

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    InvalidPassword,
    AlreadyJoined,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPassword => write!(f, "Invalid password."),
            Self::AlreadyJoined => write!(f, "Already joined."),
        }
    }
}

impl std::error::Error for JoinError {}

pub struct SessionManager {
    registry: ConnectionRegistry,
    session: Session,
    join_policy: JoinPolicy,
    ids: ConnectionIdAllocator,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(JoinPolicy::Open)
    }
}

impl SessionManager {
    pub fn new(join_policy: JoinPolicy) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            session: Session::default(),
            join_policy,
            ids: ConnectionIdAllocator::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Display names in join order.
    pub fn roster(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Register the connection as a participant and announce it.
    /// Nothing is registered or broadcast on error.
    pub fn join(&mut self, connection: &Connection, msg: JoinMsg) -> Result<(), JoinError> {
        if self.registry.contains(connection.id) {
            return Err(JoinError::AlreadyJoined);
        }
        if !self.join_policy.admits(msg.password.as_deref()) {
            return Err(JoinError::InvalidPassword);
        }

        let participant = Participant::new(connection.id, msg.name.as_deref());
        let name = participant.display_name.clone();
        self.registry.add(participant, connection.sender.clone());
        tracing::info!(
            connection_id = connection.id,
            name = %name,
            players = self.registry.count(),
            "Player joined"
        );

        self.broadcast_roster();
        broadcast(
            &self.registry,
            &ServerMessage::log(format!("{name} joined the game.")),
        );
        Ok(())
    }

    /// Idle -> Running. Broadcasts the fresh payload on success.
    pub fn start(&mut self, requester: ConnectionId) -> Result<(), StartError> {
        let payload = self.session.start(self.registry.count())?;
        tracing::info!(
            connection_id = requester,
            players = self.registry.count(),
            "Game started"
        );
        broadcast(&self.registry, &ServerMessage::started(payload));
        broadcast(&self.registry, &ServerMessage::log("Game started!"));
        Ok(())
    }

    /// Replace the payload with `state` and broadcast it. Returns false, with
    /// no broadcast, if no session is running.
    ///
    /// `state` is taken on trust from whichever connection sent it; the
    /// server has no notion of game rules.
    pub fn apply_gameplay(
        &mut self,
        sender: ConnectionId,
        kind: GameplayKind,
        state: Value,
    ) -> bool {
        let Some(payload) = self.session.apply(state) else {
            tracing::debug!(connection_id = sender, %kind, "Ignoring gameplay while idle");
            return false;
        };
        let msg = ServerMessage::state(payload.clone());
        tracing::debug!(
            connection_id = sender,
            name = self.registry.display_name(sender).unwrap_or("unjoined"),
            %kind,
            "Session payload replaced"
        );
        broadcast(&self.registry, &msg);
        true
    }

    fn broadcast_roster(&self) {
        broadcast(&self.registry, &ServerMessage::players(self.registry.names()));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::extract::ws::Utf8Bytes;
    use serde_json::json;
    use tokio::sync::mpsc;

    use touchline_core::net::protocol::decode_server_message;
    use touchline_core::session::fresh_payload;
    use touchline_core::test_helpers::scored_payload;

    use super::*;

    pub(crate) fn connect(
        mgr: &mut SessionManager,
    ) -> (Connection, mpsc::Receiver<Utf8Bytes>) {
        let (sender, rx) = mpsc::channel(64);
        let id = mgr.open_connection();
        (Connection { id, sender }, rx)
    }

    pub(crate) fn join_msg(name: &str) -> JoinMsg {
        JoinMsg {
            name: Some(name.to_string()),
            password: None,
        }
    }

    /// Everything queued for a connection so far.
    pub(crate) fn drain(rx: &mut mpsc::Receiver<Utf8Bytes>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(decode_server_message(frame.as_bytes()).unwrap());
        }
        out
    }

    #[test]
    fn join_broadcasts_roster_then_log() {
        let mut mgr = SessionManager::default();
        let (alice, mut alice_rx) = connect(&mut mgr);
        mgr.join(&alice, join_msg("Alice")).unwrap();

        assert_eq!(
            drain(&mut alice_rx),
            vec![
                ServerMessage::players(vec!["Alice".into()]),
                ServerMessage::log("Alice joined the game."),
            ]
        );

        let (bob, mut bob_rx) = connect(&mut mgr);
        mgr.join(&bob, join_msg("Bob")).unwrap();
        let expected = vec![
            ServerMessage::players(vec!["Alice".into(), "Bob".into()]),
            ServerMessage::log("Bob joined the game."),
        ];
        assert_eq!(drain(&mut alice_rx), expected);
        assert_eq!(drain(&mut bob_rx), expected);
    }

    #[test]
    fn join_without_name_uses_placeholder() {
        let mut mgr = SessionManager::default();
        let (conn, _rx) = connect(&mut mgr);
        mgr.join(&conn, JoinMsg::default()).unwrap();
        assert_eq!(mgr.roster(), vec!["Player"]);
    }

    #[test]
    fn wrong_password_changes_nothing() {
        let mut mgr = SessionManager::new(JoinPolicy::shared_secret("kickoff"));
        let (alice, mut alice_rx) = connect(&mut mgr);
        mgr.join(&alice, join_msg("Alice")).unwrap();
        drain(&mut alice_rx);

        let (eve, mut eve_rx) = connect(&mut mgr);
        let result = mgr.join(
            &eve,
            JoinMsg {
                name: Some("Eve".into()),
                password: Some("offside".into()),
            },
        );
        assert_eq!(result, Err(JoinError::InvalidPassword));
        assert_eq!(mgr.registry().count(), 1);
        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut eve_rx).is_empty());
    }

    #[test]
    fn correct_or_absent_password_admitted() {
        let mut mgr = SessionManager::new(JoinPolicy::shared_secret("kickoff"));
        let (a, _a_rx) = connect(&mut mgr);
        let (b, _b_rx) = connect(&mut mgr);
        mgr.join(
            &a,
            JoinMsg {
                name: Some("A".into()),
                password: Some("kickoff".into()),
            },
        )
        .unwrap();
        mgr.join(&b, join_msg("B")).unwrap();
        assert_eq!(mgr.registry().count(), 2);
    }

    #[test]
    fn second_join_on_same_connection_rejected() {
        let mut mgr = SessionManager::default();
        let (conn, mut rx) = connect(&mut mgr);
        mgr.join(&conn, join_msg("Alice")).unwrap();
        drain(&mut rx);

        assert_eq!(
            mgr.join(&conn, join_msg("Alice again")),
            Err(JoinError::AlreadyJoined)
        );
        assert_eq!(mgr.roster(), vec!["Alice"]);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn start_with_quorum_broadcasts_fresh_payload() {
        let mut mgr = SessionManager::default();
        let (a, mut a_rx) = connect(&mut mgr);
        let (b, mut b_rx) = connect(&mut mgr);
        mgr.join(&a, join_msg("A")).unwrap();
        mgr.join(&b, join_msg("B")).unwrap();
        drain(&mut a_rx);
        drain(&mut b_rx);

        mgr.start(a.id).unwrap();
        assert_eq!(mgr.status(), SessionStatus::Running);
        assert_eq!(mgr.session().payload(), Some(&fresh_payload()));

        let expected = vec![
            ServerMessage::started(fresh_payload()),
            ServerMessage::log("Game started!"),
        ];
        assert_eq!(drain(&mut a_rx), expected);
        assert_eq!(drain(&mut b_rx), expected);
    }

    #[test]
    fn start_without_quorum_is_silent() {
        let mut mgr = SessionManager::default();
        let (a, mut a_rx) = connect(&mut mgr);
        assert!(mgr.start(a.id).is_err());
        mgr.join(&a, join_msg("A")).unwrap();
        drain(&mut a_rx);

        assert_eq!(
            mgr.start(a.id),
            Err(StartError::NotEnoughPlayers { have: 1 })
        );
        assert_eq!(mgr.status(), SessionStatus::Idle);
        assert!(drain(&mut a_rx).is_empty());
    }

    #[test]
    fn gameplay_while_idle_is_dropped() {
        let mut mgr = SessionManager::default();
        let (a, mut a_rx) = connect(&mut mgr);
        mgr.join(&a, join_msg("A")).unwrap();
        drain(&mut a_rx);

        assert!(!mgr.apply_gameplay(a.id, GameplayKind::Move, json!({"turn": "black"})));
        assert!(mgr.session().payload().is_none());
        assert!(drain(&mut a_rx).is_empty());
    }

    #[test]
    fn gameplay_while_running_replaces_payload_with_one_broadcast() {
        let mut mgr = SessionManager::default();
        let (a, mut a_rx) = connect(&mut mgr);
        let (b, mut b_rx) = connect(&mut mgr);
        mgr.join(&a, join_msg("A")).unwrap();
        mgr.join(&b, join_msg("B")).unwrap();
        mgr.start(a.id).unwrap();
        drain(&mut a_rx);
        drain(&mut b_rx);

        let next = scored_payload(1, 0, "black");
        assert!(mgr.apply_gameplay(b.id, GameplayKind::Pass, next.clone()));
        assert_eq!(mgr.session().payload(), Some(&next));
        assert_eq!(drain(&mut a_rx), vec![ServerMessage::state(next.clone())]);
        assert_eq!(drain(&mut b_rx), vec![ServerMessage::state(next)]);
    }
}
