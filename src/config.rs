//! Configuration types for media-dl
//!
//! The configuration is an explicit value: built once at process entry with
//! [`Config::load`] and handed to the components that need it. Every field
//! missing from `config.json` falls back to an environment variable and then
//! to a built-in default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where files, logs and the config itself live
    #[serde(default)]
    pub storage: StorageConfig,

    /// How completed downloads are announced
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Directories used by the application
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding downloaded files (default: `$VIDEO_DIR` or "./videos")
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,

    /// Directory holding `app.log` (default: `$LOG_DIR` or "./.logs")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory holding `config.json` (default: `$CONFIG_DIR` or "./.config")
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
            log_dir: default_log_dir(),
            config_dir: default_config_dir(),
        }
    }
}

/// Which notifier announces completed downloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    /// Send a JSON request to `webhook_url`
    #[default]
    Webhook,
    /// Run a local notification command (termux-notification)
    Command,
    /// Do not notify
    None,
}

/// HTTP method used for webhook requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    /// JSON body on a GET request, as the automation hook expects
    #[default]
    Get,
    /// JSON body on a POST request
    Post,
}

impl WebhookMethod {
    /// The matching `reqwest` method
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            WebhookMethod::Get => reqwest::Method::GET,
            WebhookMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Notification settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Notifier implementation (default: webhook)
    #[serde(default)]
    pub kind: NotifierKind,

    /// Webhook endpoint (default: `$WEBHOOK` or the local automation hook)
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Public base URL used to build retrieval links (default: `$PUBLIC_URL`)
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// HTTP method of webhook requests (default: GET)
    #[serde(default)]
    pub method: WebhookMethod,

    /// Optional `Authorization` header value sent with webhook requests
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Timeout for one notification attempt in seconds (default: 30)
    #[serde(default = "default_notify_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Program run by the command notifier (default: "termux-notification")
    #[serde(default = "default_notify_command")]
    pub command: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            webhook_url: default_webhook_url(),
            public_base_url: default_public_base_url(),
            method: WebhookMethod::default(),
            auth_header: None,
            timeout: default_notify_timeout(),
            command: default_notify_command(),
        }
    }
}

/// HTTP API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:`$PORT` or 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// How long clients may cache a served file, in seconds (default: 86400)
    #[serde(default = "default_cache_max_age", with = "duration_serde")]
    pub cache_max_age: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            cache_max_age: default_cache_max_age(),
        }
    }
}

impl Config {
    /// Load the configuration from `{config_dir}/config.json`
    ///
    /// `config_dir` defaults to `$CONFIG_DIR` or "./.config". A missing file
    /// yields the defaults; a malformed file is an error.
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let dir = config_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);
        let path = dir.join(CONFIG_FILE_NAME);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Config>(&contents).map_err(|e| {
                Error::Config {
                    message: format!("failed to parse {}: {}", path.display(), e),
                    key: None,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(Error::Config {
                    message: format!("failed to read {}: {}", path.display(), e),
                    key: None,
                });
            }
        };

        config.storage.config_dir = dir;
        config.validate()?;
        Ok(config)
    }

    /// Write the effective configuration to `{config_dir}/config.json`
    pub fn save(&self) -> Result<()> {
        let path = self.config_path();
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| Error::storage("writing", path, e))
    }

    /// Create the video, log and config directories
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.storage.video_dir,
            &self.storage.log_dir,
            &self.storage.config_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::storage("creating directory", dir.clone(), e))?;
        }
        Ok(())
    }

    /// Check settings that would only fail later, at notification time
    pub fn validate(&self) -> Result<()> {
        if self.notifier.kind == NotifierKind::Webhook {
            url::Url::parse(&self.notifier.webhook_url).map_err(|e| Error::Config {
                message: format!("invalid webhook URL '{}': {}", self.notifier.webhook_url, e),
                key: Some("notifier.webhook_url".to_string()),
            })?;
        }
        url::Url::parse(&self.notifier.public_base_url).map_err(|e| Error::Config {
            message: format!(
                "invalid public base URL '{}': {}",
                self.notifier.public_base_url, e
            ),
            key: Some("notifier.public_base_url".to_string()),
        })?;
        Ok(())
    }

    /// Location of `config.json`
    pub fn config_path(&self) -> PathBuf {
        self.storage.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Directory holding downloaded files
    pub fn video_dir(&self) -> &PathBuf {
        &self.storage.video_dir
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

// Default value functions
fn default_video_dir() -> PathBuf {
    PathBuf::from(env_or("VIDEO_DIR", "./videos"))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(env_or("LOG_DIR", "./.logs"))
}

fn default_config_dir() -> PathBuf {
    PathBuf::from(env_or("CONFIG_DIR", "./.config"))
}

fn default_webhook_url() -> String {
    env_or(
        "WEBHOOK",
        "http://host.docker.internal:5677/webhook/downloader-yt",
    )
}

fn default_public_base_url() -> String {
    env_or("PUBLIC_URL", "https://downloader.ajaxlima.dev.br")
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_notify_command() -> String {
    "termux-notification".to_string()
}

fn default_bind_address() -> SocketAddr {
    let port = env_or("PORT", "8080").parse::<u16>().unwrap_or_else(|_| {
        tracing::warn!("invalid PORT environment variable, using 8080");
        8080
    });
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cache_max_age() -> Duration {
    Duration::from_secs(86_400)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
