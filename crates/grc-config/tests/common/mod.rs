// crates/grc-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for grc-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use grc_config::ConfigError;
use grc_config::GrcConfig;

/// Signing secret that satisfies the minimum length.
pub const TEST_JWT_SECRET: &str = "test-signing-secret-0123456789";

/// External API key used by tests.
pub const TEST_API_KEY: &str = "partner-key";

/// Parses a TOML string into a `GrcConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<GrcConfig, ConfigError> {
    GrcConfig::from_toml_str(toml_str)
}

/// Returns a config with defaults plus the required secrets.
pub fn valid_config() -> Result<GrcConfig, ConfigError> {
    let mut config = config_from_toml("")?;
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.auth.external_api_key = TEST_API_KEY.to_string();
    Ok(config)
}

/// Asserts that a result is an error whose message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
