pub mod net;
pub mod participant;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use serde_json::{Value, json};

    use crate::net::messages::{ClientMessage, GameplayKind, GameplayMsg, JoinMsg};

    /// Build a join message with an optional password.
    pub fn join(name: &str, password: Option<&str>) -> ClientMessage {
        ClientMessage::Join(JoinMsg {
            name: Some(name.to_string()),
            password: password.map(str::to_string),
        })
    }

    /// Build a gameplay message of the given kind carrying `state`.
    pub fn gameplay(kind: GameplayKind, state: Value) -> ClientMessage {
        let msg = GameplayMsg { state };
        match kind {
            GameplayKind::Move => ClientMessage::Move(msg),
            GameplayKind::Pass => ClientMessage::Pass(msg),
            GameplayKind::Shoot => ClientMessage::Shoot(msg),
        }
    }

    /// A client-shaped payload with the given scores and turn.
    pub fn scored_payload(white: u32, black: u32, turn: &str) -> Value {
        json!({
            "board": null,
            "scores": { "white": white, "black": black },
            "turn": turn,
        })
    }
}
