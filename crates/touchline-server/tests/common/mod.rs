use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use touchline_core::net::messages::{ClientMessage, JoinMsg, ServerMessage};
use touchline_core::net::protocol::{decode_server_message, encode_client_message};

use touchline_server::build_app;
use touchline_server::config::{JoinConfig, ServerConfig};
use touchline_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with an open join policy.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server that checks joins against `password`.
    pub async fn with_password(password: &str) -> Self {
        let config = ServerConfig {
            join: JoinConfig {
                password: Some(password.to_string()),
                require_password: false,
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send raw text, well-formed or not.
pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream
        .send(Message::Text(text.to_string().into()))
        .await
        .unwrap();
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    ws_send_text(stream, &encoded).await;
}

/// Send a join with an optional password.
pub async fn ws_send_join(stream: &mut WsStream, name: &str, password: Option<&str>) {
    let msg = ClientMessage::Join(JoinMsg {
        name: Some(name.to_string()),
        password: password.map(str::to_string),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    ws_try_read_server_msg(stream, 5000)
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next ServerMessage, returning None on timeout.
pub async fn ws_try_read_server_msg(
    stream: &mut WsStream,
    timeout_ms: u64,
) -> Option<ServerMessage> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_message(text.as_str().as_bytes()).unwrap();
                },
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Assert nothing arrives within a short window.
pub async fn ws_expect_silence(stream: &mut WsStream) {
    if let Some(msg) = ws_try_read_server_msg(stream, 200).await {
        panic!("Expected no message, got: {msg:?}");
    }
}

/// Connect and join, consuming the joiner's own `players` and `log` frames.
/// Returns the stream and the roster it saw.
pub async fn join_player(server: &TestServer, name: &str) -> (WsStream, Vec<String>) {
    let mut stream = ws_connect(&server.ws_url()).await;
    ws_send_join(&mut stream, name, None).await;
    let roster = match ws_read_server_msg(&mut stream).await {
        ServerMessage::Players(p) => p.players,
        other => panic!("Expected players, got: {other:?}"),
    };
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::Log(log) => assert_eq!(log.message, format!("{name} joined the game.")),
        other => panic!("Expected log, got: {other:?}"),
    }
    (stream, roster)
}

/// Consume the `players` + `log` pair others receive when someone joins.
pub async fn skip_join_notice(stream: &mut WsStream) {
    assert!(matches!(
        ws_read_server_msg(stream).await,
        ServerMessage::Players(_)
    ));
    assert!(matches!(ws_read_server_msg(stream).await, ServerMessage::Log(_)));
}
