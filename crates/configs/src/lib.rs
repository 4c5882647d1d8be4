//! Application configuration.
//!
//! Values come from `config.toml` (path overridable with `CONFIG_PATH`), or
//! from defaults when no file exists. Environment variables are then applied
//! by [`AppConfig::apply_env`]: `DATABASE_URL` and `JWT_SECRET` fill empty
//! values, the remaining variables replace file values. A variable that does
//! not parse is a startup error.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

pub const PASSWORD_ALGORITHMS: [&str; 2] = ["bcrypt", "argon2"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), log_format: default_log_format() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")] 
    pub max_connections: u32,
    #[serde(default = "default_min_connections")] 
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")] 
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")] 
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")] 
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")] 
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
    /// Apply pending migrations on startup.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
            auto_migrate: true,
        }
    }
}

/// Session token and password hashing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret. Required; filled from `JWT_SECRET` when empty.
    #[serde(default)]
    pub jwt_secret: String,
    /// Lifetime of issued tokens in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Scheme used for newly registered users.
    #[serde(default = "default_password_algorithm")]
    pub password_algorithm: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
            password_algorithm: default_password_algorithm(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_true() -> bool { true }
fn default_log_format() -> String { "compact".into() }
fn default_token_ttl() -> u64 { 3600 }
fn default_password_algorithm() -> String { "bcrypt".into() }
fn default_bcrypt_cost() -> u32 { 10 }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| anyhow!("{key}=`{raw}` is invalid: {e}")))
        .transpose()
}

impl AppConfig {
    /// Load `config.toml` if present, otherwise start from defaults; then
    /// apply the environment, normalize and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(env_var)
    }

    /// Same as [`AppConfig::apply_env`] with an explicit variable source.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var::<u16>(&lookup, "SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(threads) = parse_var::<usize>(&lookup, "TOKIO_WORKER_THREADS")? {
            self.server.worker_threads = Some(threads);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.server.log_format = format;
        }
        if self.database.url.trim().is_empty() {
            if let Some(url) = lookup("DATABASE_URL") {
                self.database.url = url;
            }
        }
        if self.auth.jwt_secret.trim().is_empty() {
            if let Some(secret) = lookup("JWT_SECRET") {
                self.auth.jwt_secret = secret;
            }
        }
        if let Some(ttl) = parse_var::<u64>(&lookup, "JWT_TTL_SECS")? {
            self.auth.token_ttl_secs = ttl;
        }
        if let Some(algorithm) = lookup("PASSWORD_ALGORITHM") {
            self.auth.password_algorithm = algorithm;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.validate()?;
        self.auth.normalize();
        self.auth.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        let format = self.log_format.trim().to_ascii_lowercase();
        if format != "compact" && format != "json" {
            return Err(anyhow!("server.log_format must be `compact` or `json`"));
        }
        self.log_format = format;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthSettings {
    fn normalize(&mut self) {
        self.password_algorithm = self.password_algorithm.trim().to_ascii_lowercase();
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        if self.token_ttl_secs == 0 {
            return Err(anyhow!("auth.token_ttl_secs must be positive"));
        }
        if !PASSWORD_ALGORITHMS.contains(&self.password_algorithm.as_str()) {
            return Err(anyhow!(
                "auth.password_algorithm must be one of {:?}, got `{}`",
                PASSWORD_ALGORITHMS,
                self.password_algorithm
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(anyhow!("auth.bcrypt_cost must be within 4..=31"));
        }
        Ok(())
    }
}
