use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Minimum roster size for a session to start or keep running.
pub const MIN_PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
}

/// Why a start request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    NotEnoughPlayers { have: usize },
    AlreadyRunning,
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEnoughPlayers { .. } => {
                write!(f, "Need at least {MIN_PLAYERS} players to start.")
            },
            Self::AlreadyRunning => write!(f, "Game already in progress."),
        }
    }
}

impl std::error::Error for StartError {}

/// Payload handed out when a session starts: zeroed scores, white to move,
/// and no board. Clients lay out the board themselves.
pub fn fresh_payload() -> Value {
    json!({
        "board": null,
        "scores": { "white": 0, "black": 0 },
        "turn": "white",
    })
}

/// The single game session. The payload only exists while running, so
/// "payload present iff Running" holds by construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Idle,
    Running {
        payload: Value,
    },
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::Running { .. } => SessionStatus::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Idle => None,
            Self::Running { payload } => Some(payload),
        }
    }

    /// Idle -> Running. Returns a copy of the fresh payload for broadcast.
    pub fn start(&mut self, roster_count: usize) -> Result<Value, StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        if roster_count < MIN_PLAYERS {
            return Err(StartError::NotEnoughPlayers { have: roster_count });
        }
        let payload = fresh_payload();
        *self = Self::Running {
            payload: payload.clone(),
        };
        Ok(payload)
    }

    /// Running -> Running with `payload` replacing the old one wholesale.
    /// While idle the payload is discarded and `None` is returned.
    pub fn apply(&mut self, payload: Value) -> Option<&Value> {
        match self {
            Self::Idle => None,
            Self::Running { payload: current } => {
                *current = payload;
                Some(&*current)
            },
        }
    }

    /// Running -> Idle when the roster has fallen below quorum. Returns true
    /// if the session was stopped.
    pub fn stop_below_quorum(&mut self, roster_count: usize) -> bool {
        if self.is_running() && roster_count < MIN_PLAYERS {
            *self = Self::Idle;
            true
        } else {
            false
        }
    }
}
