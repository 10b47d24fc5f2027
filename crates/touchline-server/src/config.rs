use serde::Deserialize;

/// Top-level server configuration, loaded from `touchline.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub join: JoinConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
            web_root: "web".to_string(),
            join: JoinConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Join policy section. With no password every join is admitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub password: Option<String>,
    /// When false, a join that carries no password at all is still admitted;
    /// only a wrong password is refused.
    pub require_password: bool,
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 50.0,
            player_message_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, logging warnings for issues.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.join.password.is_some() {
            tracing::warn!(
                "join.password is set in config file, use TOUCHLINE_JOIN_PASSWORD env var in production"
            );
        }
        if self.join.require_password && self.join.password.is_none() {
            tracing::warn!("join.require_password is set but no password is configured, ignoring");
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `touchline.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("touchline.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from touchline.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse touchline.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No touchline.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("TOUCHLINE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("TOUCHLINE_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(password) = std::env::var("TOUCHLINE_JOIN_PASSWORD")
            && !password.is_empty()
        {
            config.join.password = Some(password);
        }

        if let Ok(val) = std::env::var("TOUCHLINE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("TOUCHLINE_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }

        config
    }
}
