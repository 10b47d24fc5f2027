use tracing_subscriber::EnvFilter;

use touchline_server::config::ServerConfig;
use touchline_server::{build_app, shutdown_signal};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load();
    config.validate();

    let addr = config.listen_addr.clone();
    let web_root = config.web_root.clone();
    let (app, _state) = build_app(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(%addr, %web_root, "Touchline server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
