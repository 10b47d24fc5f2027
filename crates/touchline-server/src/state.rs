use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::join_policy::JoinPolicy;
use crate::session_manager::SessionManager;

pub type SharedSessionManager = Arc<RwLock<SessionManager>>;

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSessionManager,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let join_policy = JoinPolicy::from(&config.join);
        Self {
            session: Arc::new(RwLock::new(SessionManager::new(join_policy))),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts an open WebSocket for as long as it lives.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    /// Claim one of `max` slots. The check and the increment are a single
    /// atomic step, so concurrent upgrades cannot overshoot the cap.
    pub fn try_acquire(counter: Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .ok()?;
        Some(Self { counter })
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
