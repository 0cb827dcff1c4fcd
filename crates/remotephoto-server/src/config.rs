//! Server configuration

use crate::cli::Cli;
use remotephoto_core::{BrokerConfig, QueuePolicy, StepMode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory whose files make up the show
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,

    /// Credentials for the master pages
    #[serde(default)]
    pub auth: AuthConfig,

    /// Event stream settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// How prev/next commands move the show
    #[serde(default)]
    pub step_mode: StepMode,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(photo_dir) = &cli.photo_dir {
            config.photo_dir = photo_dir.clone();
        }
        if let Some(username) = &cli.username {
            config.auth.username = username.clone();
        }
        if let Some(password) = &cli.password {
            config.auth.password = password.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.username.is_empty() {
            anyhow::bail!("auth.username must not be empty");
        }
        if self.auth.username.contains(':') {
            anyhow::bail!("auth.username must not contain ':'");
        }
        if self.stream.queue_capacity == Some(0) {
            anyhow::bail!("stream.queue_capacity must be at least 1");
        }
        Ok(())
    }

    /// Address to bind
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.listen, self.port).parse()?)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            queue: self.stream.queue_policy(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            photo_dir: default_photo_dir(),
            auth: AuthConfig::default(),
            stream: StreamConfig::default(),
            step_mode: StepMode::default(),
        }
    }
}

/// Basic auth settings for the master pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Realm announced in `WWW-Authenticate`
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
            realm: default_realm(),
        }
    }
}

/// Event stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds between keep-alive comments on idle streams (0 disables)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Events a viewer may fall behind before it is disconnected;
    /// unset means its queue grows without limit
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

impl StreamConfig {
    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_secs > 0).then(|| Duration::from_secs(self.keep_alive_secs))
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        match self.queue_capacity {
            Some(capacity) => QueuePolicy::Bounded { capacity },
            None => QueuePolicy::Unbounded,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
            queue_capacity: None,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_photo_dir() -> PathBuf {
    PathBuf::from("./photos/")
}

fn default_username() -> String {
    "gordon".to_string()
}

fn default_password() -> String {
    "secret!".to_string()
}

fn default_realm() -> String {
    "Restricted".to_string()
}

fn default_keep_alive_secs() -> u64 {
    15
}
