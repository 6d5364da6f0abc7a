// crates/grc-config/src/config.rs
// ============================================================================
// Module: GRC Configuration
// Description: Configuration loading, overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: grc-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `GRC_CONFIG`, then `grc.toml`; only
//! the implicit default file may be absent, in which case defaults apply.
//! Secrets can be overridden from the environment before validation runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use grc_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use grc_store_sqlite::SqliteStoreConfig;
use grc_store_sqlite::SqliteStoreMode;
use grc_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "grc.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "GRC_CONFIG";
/// Environment override for `auth.jwt_secret`.
pub const JWT_SECRET_ENV_VAR: &str = "GRC_JWT_SECRET";
/// Environment override for `auth.external_api_key`.
pub const EXTERNAL_API_KEY_ENV_VAR: &str = "GRC_EXTERNAL_API_KEY";
/// Environment override for `email.password`.
pub const SMTP_PASSWORD_ENV_VAR: &str = "GRC_SMTP_PASSWORD";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum JWT signing secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 16;
/// Default session token lifetime.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 7;
/// Longest accepted session token lifetime.
pub const MAX_TOKEN_TTL_DAYS: u32 = 90;
/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Largest accepted request body limit.
pub const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// GRC server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrcConfig {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Background job configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Seed data configuration.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl GrcConfig {
    /// Loads configuration using the default resolution rules, applies
    /// environment overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = resolve_path(path)?;
        validate_path(&source.path)?;
        let mut config = if !source.explicit && !source.path.exists() {
            Self::default()
        } else {
            Self::from_file(&source.path)?
        };
        config.apply_overrides(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, oversized, not
    /// UTF-8, or not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses TOML text without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Replaces secrets with values from `lookup` when present and non-empty.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(secret) = lookup(JWT_SECRET_ENV_VAR) {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = lookup(EXTERNAL_API_KEY_ENV_VAR) {
            self.auth.external_api_key = key;
        }
        if let Some(password) = lookup(SMTP_PASSWORD_ENV_VAR) {
            self.email.password = Some(password);
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.auth.validate()?;
        self.email.validate()?;
        self.logging.validate()
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid server.bind address".to_string()))
    }

    /// Validates listener settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Converts to the store's own configuration type.
    #[must_use]
    pub fn to_sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates the store path.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())
    }
}

/// Authentication configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token lifetime in days.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: u32,
    /// Shared key required on external ticket endpoints.
    #[serde(default)]
    pub external_api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: default_token_ttl_days(),
            external_api_key: String::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("external_api_key", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Validates secrets and token lifetime.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret is required (or set {JWT_SECRET_ENV_VAR})"
            )));
        }
        if self.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_days must be between 1 and {MAX_TOKEN_TTL_DAYS}"
            )));
        }
        if self.external_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "auth.external_api_key is required (or set {EXTERNAL_API_KEY_ENV_VAR})"
            )));
        }
        Ok(())
    }
}

/// SMTP transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTls {
    /// Upgrade the connection with STARTTLS.
    #[default]
    Starttls,
    /// Plain SMTP, for local relays only.
    None,
}

/// Outbound email configuration.
#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    /// Sends email when true; otherwise messages are logged and dropped.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default)]
    pub host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address; the username is used when blank.
    #[serde(default)]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Transport security.
    #[serde(default)]
    pub tls: EmailTls,
    /// Front-end base url used for links in emails.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from_email: String::new(),
            from_name: default_from_name(),
            tls: EmailTls::default(),
            app_base_url: default_app_base_url(),
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("tls", &self.tls)
            .field("app_base_url", &self.app_base_url)
            .finish()
    }
}

impl EmailConfig {
    /// Returns the sender address, falling back to the SMTP username.
    #[must_use]
    pub fn sender_address(&self) -> Option<&str> {
        let from = self.from_email.trim();
        if !from.is_empty() {
            return Some(from);
        }
        self.username.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    /// Validates relay settings when sending is enabled.
    fn validate(&self) -> Result<(), ConfigError> {
        let base = self.app_base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "email.app_base_url must be an http(s) url".to_string(),
            ));
        }
        if !self.enabled {
            return Ok(());
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("email.host is required when enabled".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("email.port must be non-zero".to_string()));
        }
        if self.sender_address().is_none_or(|sender| !sender.contains('@')) {
            return Err(ConfigError::Invalid(
                "email.from_email must be an email address".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::Invalid(
                "email.username and email.password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Runs scheduled jobs inside `serve` when true.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates the filter directive.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Seed data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Inserts built-in users and catalog entries at startup.
    #[serde(default = "default_true")]
    pub on_startup: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolved config location.
struct ConfigSource {
    /// File to read.
    path: PathBuf,
    /// True when the caller or environment named the file.
    explicit: bool,
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            explicit: true,
        });
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource {
            path: PathBuf::from(env_path),
            explicit: true,
        });
    }
    Ok(ConfigSource {
        path: PathBuf::from(DEFAULT_CONFIG_NAME),
        explicit: false,
    })
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("grc.sqlite3")
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Default token lifetime.
const fn default_token_ttl_days() -> u32 {
    DEFAULT_TOKEN_TTL_DAYS
}

/// Default SMTP submission port.
const fn default_smtp_port() -> u16 {
    587
}

/// Default sender display name.
fn default_from_name() -> String {
    "GRC Compliance Platform".to_string()
}

/// Default front-end base url.
fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Default log filter.
fn default_log_filter() -> String {
    "info".to_string()
}

/// Serde default for enabled-by-default flags.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::use_debug, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn validate_path_string_rejects_blank_and_long_components() {
        assert!(validate_path_string("store.path", "  ").is_err());
        assert!(validate_path_string("store.path", &"a".repeat(300)).is_err());
        assert!(validate_path_string("store.path", "data/grc.sqlite3").is_ok());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: "super-secret-signing-key".to_string(),
            token_ttl_days: 7,
            external_api_key: "partner-key".to_string(),
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("partner-key"));
    }
}
