use crate::config::JoinConfig;

/// Decides whether a `join` may register a participant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Anyone may join; a supplied password is ignored.
    #[default]
    Open,
    /// One shared secret for every player.
    SharedSecret {
        password: String,
        /// Refuse joins that carry no password at all.
        require: bool,
    },
}

impl JoinPolicy {
    pub fn shared_secret(password: impl Into<String>) -> Self {
        Self::SharedSecret {
            password: password.into(),
            require: false,
        }
    }

    pub fn admits(&self, supplied: Option<&str>) -> bool {
        match self {
            Self::Open => true,
            Self::SharedSecret { password, require } => match supplied {
                // An empty string counts as "no password".
                None | Some("") => !require,
                Some(given) => given == password,
            },
        }
    }
}

impl From<&JoinConfig> for JoinPolicy {
    fn from(config: &JoinConfig) -> Self {
        match &config.password {
            Some(password) if !password.is_empty() => Self::SharedSecret {
                password: password.clone(),
                require: config.require_password,
            },
            _ => Self::Open,
        }
    }
}
