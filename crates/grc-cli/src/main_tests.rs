// crates/grc-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and config/log helpers.
// Purpose: Keep the command surface and its failure messages stable.
// Dependencies: grc-cli main helpers
// ============================================================================

//! ## Overview
//! Validates job-name parsing, subcommand wiring, config loading errors, and
//! log filter selection.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::CommandFactory;
use clap::Parser;
use grc_config::LoggingConfig;
use grc_server::JobKind;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::ConfigArgs;
use super::ConfigCommand;
use super::load_config;
use super::log_filter;
use super::parse_job_kind;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn job_names_parse() {
    for kind in JobKind::ALL {
        assert_eq!(parse_job_kind(kind.as_str()).unwrap(), kind);
    }
    let err = parse_job_kind("hourly").unwrap_err();
    assert!(err.contains("unknown job `hourly`"));
    assert!(err.contains("due-check, overdue-check, daily-digest, weekly-digest"));
}

#[test]
fn run_job_accepts_config_flag() {
    let cli = Cli::try_parse_from(["grc", "run-job", "overdue-check", "--config", "ops/grc.toml"]).unwrap();
    let Commands::RunJob(command) = cli.command else {
        panic!("expected run-job");
    };
    assert_eq!(command.job, JobKind::OverdueCheck);
    assert_eq!(command.config.config.as_deref(), Some(std::path::Path::new("ops/grc.toml")));
}

#[test]
fn run_job_rejects_unknown_job() {
    assert!(Cli::try_parse_from(["grc", "run-job", "monthly-digest"]).is_err());
}

#[test]
fn config_validate_parses() {
    let cli = Cli::try_parse_from(["grc", "config", "validate"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Validate(args),
    } = cli.command
    else {
        panic!("expected config validate");
    };
    assert!(args.config.is_none());
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    let args = ConfigArgs {
        config: Some(dir.path().join("absent.toml")),
    };
    let err = load_config(&args).unwrap_err();
    assert!(err.to_string().starts_with("failed to load config:"));
}

#[test]
fn explicit_config_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grc.toml");
    let db = dir.path().join("grc.db");
    fs::write(
        &path,
        format!(
            "[store]\npath = {db:?}\n\n[auth]\njwt_secret = \"cli-test-signing-secret-0123456789\"\nexternal_api_key = \"partner-key\"\n"
        ),
    )
    .unwrap();
    let config = load_config(&ConfigArgs {
        config: Some(path),
    })
    .unwrap();
    assert_eq!(config.store.path, db);
}

#[test]
fn log_filter_prefers_environment() {
    let config = LoggingConfig::default();
    assert!(log_filter(&config, None).is_ok());
    assert!(log_filter(&config, Some("   ")).is_ok());
    assert!(log_filter(&config, Some("grc_server=debug")).is_ok());
    assert!(log_filter(&config, Some("grc_server=loud")).is_err());
}
