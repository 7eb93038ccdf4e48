use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct QuillConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Project-locality journal root. Relative paths resolve against the
    /// working directory at startup.
    pub project_dir: String,
    /// User-locality journal root.
    pub user_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub default_min_score: f64,
    pub excerpt_length: usize,
}

/// Remote journal server settings. Constructed once at startup (file +
/// `JOURNAL_*` env vars) and immutable for the life of the process.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RemoteConfig {
    pub server_url: Option<String>,
    pub team_id: Option<String>,
    pub api_key: Option<String>,
    pub enabled: bool,
    /// When set, the remote server is authoritative and local storage is
    /// never touched.
    pub remote_only: bool,
}

impl RemoteConfig {
    /// Remote calls are possible only when every connection field is present.
    pub fn is_active(&self) -> bool {
        self.enabled
            && self.server_url.is_some()
            && self.team_id.is_some()
            && self.api_key.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let user_dir = default_quill_dir()
            .join("journal")
            .to_string_lossy()
            .into_owned();
        Self {
            project_dir: ".quill".into(),
            user_dir,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_quill_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_min_score: 0.0,
            excerpt_length: 160,
        }
    }
}

/// Returns `~/.quill/`
pub fn default_quill_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".quill")
}

/// Returns the default config file path: `~/.quill/config.toml`
pub fn default_config_path() -> PathBuf {
    default_quill_dir().join("config.toml")
}

impl QuillConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            QuillConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. `QUILL_*` vars cover local
    /// settings; `JOURNAL_*` vars configure the remote server.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QUILL_PROJECT_DIR") {
            self.storage.project_dir = val;
        }
        if let Ok(val) = std::env::var("QUILL_USER_DIR") {
            self.storage.user_dir = val;
        }
        if let Ok(val) = std::env::var("QUILL_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("JOURNAL_SERVER_URL") {
            self.remote.server_url = Some(val);
        }
        if let Ok(val) = std::env::var("JOURNAL_TEAM_ID") {
            self.remote.team_id = Some(val);
        }
        if let Ok(val) = std::env::var("JOURNAL_API_KEY") {
            self.remote.api_key = Some(val);
        }
        if self.remote.server_url.is_some()
            && self.remote.team_id.is_some()
            && self.remote.api_key.is_some()
        {
            self.remote.enabled = true;
        }
        if let Ok(val) = std::env::var("JOURNAL_REMOTE_ONLY") {
            self.remote.remote_only = matches!(val.as_str(), "1" | "true" | "yes");
        }
    }

    /// Resolve the project journal root to an absolute path.
    pub fn resolved_project_dir(&self) -> PathBuf {
        absolutize(&expand_tilde(&self.storage.project_dir))
    }

    /// Resolve the user journal root to an absolute path.
    pub fn resolved_user_dir(&self) -> PathBuf {
        absolutize(&expand_tilde(&self.storage.user_dir))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .expect("working directory must exist")
            .join(path)
    }
}
