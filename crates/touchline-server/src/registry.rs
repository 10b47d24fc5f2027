use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

use touchline_core::participant::{ConnectionId, Participant};

/// Per-connection sender for outbound WebSocket text frames.
/// Bounded so a slow client cannot exhaust memory. `Utf8Bytes` clones are
/// reference-counted, so one encoded frame fans out without copying.
pub type ConnectionSender = mpsc::Sender<Utf8Bytes>;

/// An open transport connection, joined or not.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ConnectionSender,
}

struct RegistryEntry {
    participant: Participant,
    sender: ConnectionSender,
}

/// Joined participants in join order, each with its outbound channel.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Vec<RegistryEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, participant: Participant, sender: ConnectionSender) {
        self.entries.push(RegistryEntry {
            participant,
            sender,
        });
    }

    /// Remove a participant. Unknown ids are ignored.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Participant> {
        let index = self.entries.iter().position(|e| e.participant.id == id)?;
        Some(self.entries.remove(index).participant)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.iter().any(|e| e.participant.id == id)
    }

    pub fn display_name(&self, id: ConnectionId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.participant.id == id)
            .map(|e| e.participant.display_name.as_str())
    }

    /// Display names in join order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.participant.display_name.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Outbound channels of every joined participant, in join order.
    pub fn senders(&self) -> impl Iterator<Item = (ConnectionId, &ConnectionSender)> {
        self.entries.iter().map(|e| (e.participant.id, &e.sender))
    }
}
