use serde::{Deserialize, Serialize};

/// Process-unique connection identity. Allocated at connect time and never
/// reused while the process runs.
pub type ConnectionId = u64;

/// Name given to participants that join without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Player";

/// Display names are cut to this many characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// A joined player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ConnectionId,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: ConnectionId, requested_name: Option<&str>) -> Self {
        Self {
            id,
            display_name: sanitize_display_name(requested_name),
        }
    }
}

/// Trim, drop control characters and cap the length. Blank input falls back
/// to [`DEFAULT_DISPLAY_NAME`].
pub fn sanitize_display_name(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let trimmed: String = cleaned.trim().chars().take(MAX_DISPLAY_NAME_CHARS).collect();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Monotonic id source. Starts at 1.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next: ConnectionId,
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn alloc(&mut self) -> ConnectionId {
        let id = self.next;
        self.next += 1;
        id
    }
}
