// crates/grc-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Defaults, secret requirements, overrides, and file limits.
// Purpose: Ensure invalid configs fail closed with actionable messages.
// ============================================================================

//! ## Overview
//! Validates config parsing and validation:
//! - Defaults and required secrets
//! - Environment-style overrides through an injected lookup
//! - Email relay requirements
//! - File size, encoding, and path limits

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::io::Write;
use std::path::Path;

use grc_config::ConfigError;
use grc_config::EXTERNAL_API_KEY_ENV_VAR;
use grc_config::EmailTls;
use grc_config::GrcConfig;
use grc_config::JWT_SECRET_ENV_VAR;
use grc_config::LogFormat;
use grc_config::SMTP_PASSWORD_ENV_VAR;
use grc_store_sqlite::SqliteStoreMode;
use tempfile::NamedTempFile;

use crate::common::TEST_API_KEY;
use crate::common::TEST_JWT_SECRET;
use crate::common::assert_invalid;
use crate::common::config_from_toml;
use crate::common::valid_config;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_file_uses_documented_defaults() -> TestResult {
    let config = config_from_toml("").map_err(|err| err.to_string())?;
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.auth.token_ttl_days, 7);
    assert!(!config.email.enabled);
    assert_eq!(config.email.port, 587);
    assert_eq!(config.email.tls, EmailTls::Starttls);
    assert_eq!(config.email.app_base_url, "http://localhost:3000");
    assert!(config.scheduler.enabled);
    assert!(config.seed.on_startup);
    assert_eq!(config.logging.format, LogFormat::Text);
    Ok(())
}

#[test]
fn defaults_without_secrets_are_rejected() -> TestResult {
    let config = config_from_toml("").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "auth.jwt_secret is required")
}

#[test]
fn valid_config_passes() -> TestResult {
    let config = valid_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn malformed_toml_is_parse_error() {
    let result = config_from_toml("[server\nbind = 1");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

// ============================================================================
// SECTION: Auth
// ============================================================================

#[test]
fn short_jwt_secret_is_rejected() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.auth.jwt_secret = "short".to_string();
    assert_invalid(config.validate(), "at least 16 bytes")
}

#[test]
fn token_ttl_bounds_are_enforced() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.auth.token_ttl_days = 0;
    assert_invalid(config.validate(), "auth.token_ttl_days")?;
    config.auth.token_ttl_days = 91;
    assert_invalid(config.validate(), "auth.token_ttl_days")?;
    config.auth.token_ttl_days = 90;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn missing_external_api_key_is_rejected() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.auth.external_api_key = "   ".to_string();
    assert_invalid(config.validate(), "auth.external_api_key is required")
}

#[test]
fn overrides_fill_secrets_and_ignore_blank_values() -> TestResult {
    let mut config = config_from_toml("").map_err(|err| err.to_string())?;
    config.apply_overrides(|name| match name {
        JWT_SECRET_ENV_VAR => Some(TEST_JWT_SECRET.to_string()),
        EXTERNAL_API_KEY_ENV_VAR => Some(TEST_API_KEY.to_string()),
        SMTP_PASSWORD_ENV_VAR => Some("  ".to_string()),
        _ => None,
    });
    assert_eq!(config.auth.jwt_secret, TEST_JWT_SECRET);
    assert_eq!(config.auth.external_api_key, TEST_API_KEY);
    assert!(config.email.password.is_none());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn overrides_replace_file_values() -> TestResult {
    let mut config = config_from_toml(
        r#"
        [auth]
        jwt_secret = "file-secret-value-long-enough"
        external_api_key = "file-key"
        "#,
    )
    .map_err(|err| err.to_string())?;
    config.apply_overrides(|name| {
        (name == EXTERNAL_API_KEY_ENV_VAR).then(|| "env-key".to_string())
    });
    assert_eq!(config.auth.jwt_secret, "file-secret-value-long-enough");
    assert_eq!(config.auth.external_api_key, "env-key");
    Ok(())
}

// ============================================================================
// SECTION: Server and Store
// ============================================================================

#[test]
fn bad_bind_address_is_rejected() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.server.bind = "localhost".to_string();
    assert_invalid(config.validate(), "invalid server.bind address")
}

#[test]
fn body_limit_bounds_are_enforced() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes")?;
    config.server.max_body_bytes = 64 * 1024 * 1024;
    assert_invalid(config.validate(), "server.max_body_bytes")
}

#[test]
fn store_section_maps_to_sqlite_config() -> TestResult {
    let config = config_from_toml(
        r#"
        [store]
        path = "data/grc.db"
        busy_timeout_ms = 250
        journal_mode = "delete"
        "#,
    )
    .map_err(|err| err.to_string())?;
    let sqlite = config.store.to_sqlite_config();
    assert_eq!(sqlite.path, Path::new("data/grc.db"));
    assert_eq!(sqlite.busy_timeout_ms, 250);
    assert_eq!(sqlite.journal_mode, SqliteStoreMode::Delete);
    Ok(())
}

#[test]
fn store_path_with_long_component_is_rejected() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.store.path = format!("data/{}.db", "x".repeat(300)).into();
    assert_invalid(config.validate(), "store.path path component too long")
}

// ============================================================================
// SECTION: Email
// ============================================================================

#[test]
fn enabled_email_requires_host() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.email.enabled = true;
    config.email.from_email = "grc@company.com".to_string();
    assert_invalid(config.validate(), "email.host is required when enabled")
}

#[test]
fn enabled_email_requires_sender_address() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.email.enabled = true;
    config.email.host = "smtp.company.com".to_string();
    assert_invalid(config.validate(), "email.from_email")
}

#[test]
fn sender_falls_back_to_smtp_username() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.email.enabled = true;
    config.email.host = "smtp.company.com".to_string();
    config.email.username = Some("mailer@company.com".to_string());
    config.email.password = Some("hunter2".to_string());
    assert_eq!(config.email.sender_address(), Some("mailer@company.com"));
    assert_eq!(config.email.from_name, "GRC Compliance Platform");
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn smtp_credentials_must_be_paired() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.email.enabled = true;
    config.email.host = "smtp.company.com".to_string();
    config.email.from_email = "grc@company.com".to_string();
    config.email.username = Some("mailer".to_string());
    assert_invalid(config.validate(), "must be set together")?;
    config.email.password = Some("hunter2".to_string());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn app_base_url_must_be_http() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.email.app_base_url = "ftp://files".to_string();
    assert_invalid(config.validate(), "email.app_base_url")
}

#[test]
fn blank_log_filter_is_rejected() -> TestResult {
    let mut config = valid_config().map_err(|err| err.to_string())?;
    config.logging.filter = " ".to_string();
    assert_invalid(config.validate(), "logging.filter")
}

// ============================================================================
// SECTION: Files
// ============================================================================

#[test]
fn explicit_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let result = GrcConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn load_reads_and_validates_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    write!(
        file,
        r#"
        [server]
        bind = "127.0.0.1:9000"

        [auth]
        jwt_secret = "{TEST_JWT_SECRET}"
        external_api_key = "{TEST_API_KEY}"
        token_ttl_days = 14

        [logging]
        format = "json"
        "#
    )
    .map_err(|err| err.to_string())?;
    let config = GrcConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    assert_eq!(config.server.bind_addr().map_err(|err| err.to_string())?.port(), 9000);
    assert_eq!(config.auth.token_ttl_days, 14);
    assert_eq!(config.logging.format, LogFormat::Json);
    Ok(())
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let padding = format!("# {}\n", "x".repeat(1024));
    for _ in 0..1100 {
        file.write_all(padding.as_bytes()).map_err(|err| err.to_string())?;
    }
    assert_invalid(GrcConfig::from_file(file.path()), "exceeds size limit")
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    assert_invalid(GrcConfig::from_file(file.path()), "must be utf-8")
}

#[test]
fn config_path_component_too_long_is_rejected() -> TestResult {
    let path = std::env::temp_dir().join(format!("{}.toml", "c".repeat(300)));
    assert_invalid(GrcConfig::load(Some(&path)), "config path component too long")
}
