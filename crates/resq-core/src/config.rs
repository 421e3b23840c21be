use crate::context::DEFAULT_QUERY_TIMEOUT;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_MULTIPLIER};
use crate::statement::PlaceholderFormat;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Connection parameters (`[database]` section).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; when set, the individual fields are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Schema placed ahead of `public` on the search path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub sslmode: String,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "template_user".to_string(),
            password: "template_pass".to_string(),
            dbname: "template_db".to_string(),
            schema: None,
            sslmode: "disable".to_string(),
            max_connections: 8,
        }
    }
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("schema", &self.schema)
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseConfig {
    /// Apply `DATABASE_URL` and `DB_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = get("DATABASE_URL") {
            self.url = Some(v);
        }
        if let Some(v) = get("DB_HOST") {
            self.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            match v.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("ignoring invalid DB_PORT={}", v),
            }
        }
        if let Some(v) = get("DB_USER") {
            self.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = get("DB_NAME") {
            self.dbname = v;
        }
        if let Some(v) = get("DB_SCHEMA") {
            self.schema = Some(v);
        }
    }

    /// Connection URL: `url` verbatim if set, else a `postgres://` URL built
    /// from the parts.
    pub fn connect_url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }
        let mut url = Url::parse(&format!("postgres://{}:{}/", self.host, self.port))?;
        url.set_path(&self.dbname);
        url.set_username(&self.user)
            .map_err(|()| anyhow!("cannot set user on database url"))?;
        url.set_password(Some(&self.password))
            .map_err(|()| anyhow!("cannot set password on database url"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("sslmode", &self.sslmode);
            if let Some(schema) = self.schema.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("options", &format!("-c search_path={schema},public"));
            }
        }
        Ok(url.to_string())
    }
}

/// Retry policy parameters (optional `[retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Growth factor per attempt.
    pub multiplier: u32,
    /// Optional clamp on a single delay, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 100,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay_ms: None,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: cfg.max_attempts,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            multiplier: cfg.multiplier,
            max_delay: cfg.max_delay_ms.map(Duration::from_millis),
        }
    }
}

/// Start-up polling for database readiness (optional `[wait]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_secs: 2,
        }
    }
}

impl WaitConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Global configuration loaded from `~/.config/resq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResqConfig {
    /// Deadline for calls made without an explicit context.
    pub query_timeout_secs: u64,
    /// Placeholder style for statements; defaults to `dollar`.
    #[serde(default)]
    pub placeholder: Option<PlaceholderFormat>,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

impl Default for ResqConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
            placeholder: None,
            database: DatabaseConfig::default(),
            retry: None,
            wait: None,
        }
    }
}

impl ResqConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }

    pub fn wait_config(&self) -> WaitConfig {
        self.wait.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("resq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk (creating a default file if none exists),
/// then apply environment overrides.
pub fn load_or_init() -> Result<ResqConfig> {
    let mut cfg = load_or_init_at(&config_path()?)?;
    cfg.database.apply_env();
    Ok(cfg)
}

/// Load configuration from `path`, writing defaults there if it is missing.
pub fn load_or_init_at(path: &Path) -> Result<ResqConfig> {
    if !path.exists() {
        let default_cfg = ResqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: ResqConfig = toml::from_str(&data)?;
    Ok(cfg)
}
