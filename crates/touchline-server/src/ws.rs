use std::sync::Arc;

use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use touchline_core::net::protocol::MAX_MESSAGE_SIZE;

use crate::registry::Connection;
use crate::router::route_message;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    // Claim the slot before upgrading so simultaneous handshakes share one count.
    let counter = Arc::clone(&state.ws_connection_count);
    let Some(guard) = ConnectionGuard::try_acquire(counter, max_ws) else {
        tracing::warn!(max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let id = state.session.write().await.open_connection();
    let connection = Connection { id, sender: tx };

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, &connection).await;

    // Closed for whatever reason: client, network or protocol error.
    let departed = state.session.write().await.close_connection(id);
    tracing::info!(
        connection_id = id,
        joined = departed.is_some(),
        "Connection closed"
    );
}

/// Drain one connection's outbound queue into its socket. Ends when the
/// socket fails or every sender for the connection has been dropped.
fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the frame is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Frames from one connection are routed strictly in arrival order.
async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    connection: &Connection,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data: &[u8] = match &msg {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(bytes) => &bytes[..],
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(connection_id = connection.id, "Rate limited");
            continue;
        }

        if data.is_empty() {
            continue;
        }

        if data.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(
                connection_id = connection.id,
                size = data.len(),
                "Oversized message dropped"
            );
            continue;
        }

        let mut session = state.session.write().await;
        route_message(&mut session, connection, data);
    }
}
