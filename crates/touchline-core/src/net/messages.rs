use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every `type` value a client may send.
pub const CLIENT_MESSAGE_KINDS: &[&str] = &["join", "start", "move", "pass", "shoot"];

/// Gameplay kinds. All three replace the session payload wholesale; the
/// distinction only matters to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameplayKind {
    Move,
    Pass,
    Shoot,
}

impl GameplayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Pass => "pass",
            Self::Shoot => "shoot",
        }
    }
}

impl std::fmt::Display for GameplayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Client -> Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinMsg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Carries the full game payload as the sending client sees it after its
/// action. The server never looks inside `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameplayMsg {
    pub state: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Join(JoinMsg),
    Start,
    Move(GameplayMsg),
    Pass(GameplayMsg),
    Shoot(GameplayMsg),
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Start => "start",
            Self::Move(_) => GameplayKind::Move.as_str(),
            Self::Pass(_) => GameplayKind::Pass.as_str(),
            Self::Shoot(_) => GameplayKind::Shoot.as_str(),
        }
    }

    /// Split a gameplay message into its kind and payload.
    pub fn into_gameplay(self) -> Option<(GameplayKind, Value)> {
        match self {
            Self::Move(m) => Some((GameplayKind::Move, m.state)),
            Self::Pass(m) => Some((GameplayKind::Pass, m.state)),
            Self::Shoot(m) => Some((GameplayKind::Shoot, m.state)),
            Self::Join(_) | Self::Start => None,
        }
    }
}

// ============================================================================
// Server -> Client
// ============================================================================

/// Full roster snapshot, display names in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersMsg {
    pub players: Vec<String>,
}

/// Human-readable event narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMsg {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStateMsg {
    pub state: Value,
}

/// Rejection notice. Only ever sent to the offending connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Players(PlayersMsg),
    Log(LogMsg),
    Started(SessionStateMsg),
    State(SessionStateMsg),
    Error(ErrorMsg),
}

impl ServerMessage {
    pub fn players(players: Vec<String>) -> Self {
        Self::Players(PlayersMsg { players })
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::Log(LogMsg {
            message: message.into(),
        })
    }

    pub fn started(state: Value) -> Self {
        Self::Started(SessionStateMsg { state })
    }

    pub fn state(state: Value) -> Self {
        Self::State(SessionStateMsg { state })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorMsg {
            message: message.into(),
        })
    }
}
