// crates/grc-cli/src/main.rs
// ============================================================================
// Module: GRC CLI Entry Point
// Description: Command dispatcher for the GRC back office.
// Purpose: Serve the API, seed data, validate config, and run jobs on demand.
// Dependencies: clap, grc-config, grc-server, grc-store-sqlite, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `grc` binary wraps the server crate. `serve` runs the HTTP API with its
//! scheduler, `seed` inserts the built-in accounts and control catalog,
//! `config validate` checks a config file, and `run-job` executes one
//! scheduled job immediately. Logs go to stderr; command results go to stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use grc_config::GrcConfig;
use grc_config::LogFormat;
use grc_config::LoggingConfig;
use grc_server::GrcServer;
use grc_server::JobKind;
use grc_server::open_store;
use grc_server::run_job;
use grc_store_sqlite::seed::seed;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "grc", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API and run scheduled jobs.
    Serve(ConfigArgs),
    /// Insert the built-in accounts and control catalog.
    Seed(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Run one scheduled job now.
    RunJob(RunJobCommand),
}

/// Config file selection shared by every command.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to grc.toml or `GRC_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load, apply environment overrides, and validate a config file.
    Validate(ConfigArgs),
}

/// Arguments for `run-job`.
#[derive(Args, Debug)]
struct RunJobCommand {
    /// Job name: due-check, overdue-check, daily-digest, or weekly-digest.
    #[arg(value_name = "JOB", value_parser = parse_job_kind)]
    job: JobKind,
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(&args).await,
        Commands::Seed(args) => command_seed(&args).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(args) => command_config_validate(&args),
        },
        Commands::RunJob(command) => command_run_job(&command).await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `serve`.
async fn command_serve(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    init_logging(&config.logging)?;
    let server = build_server(config).await?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `seed`.
async fn command_seed(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    init_logging(&config.logging)?;
    let report = tokio::task::spawn_blocking(move || {
        let store = open_store(&config).map_err(|err| err.to_string())?;
        seed(&store, OffsetDateTime::now_utc()).map_err(|err| err.to_string())
    })
    .await
    .map_err(|err| CliError::new(format!("seed task failed: {err}")))?
    .map_err(|err| CliError::new(format!("seed failed: {err}")))?;
    info!(users = report.users_inserted, controls = report.controls_inserted, "seed complete");
    write_stdout_line(&format!(
        "seeded {} users and {} catalog controls",
        report.users_inserted, report.controls_inserted
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = load_config(args)?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `run-job`.
async fn command_run_job(command: &RunJobCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    init_logging(&config.logging)?;
    let server = build_server(config).await?;
    let service = server.service();
    let kind = command.job;
    let job_service = Arc::clone(&service);
    let report = tokio::task::spawn_blocking(move || run_job(&job_service, kind, OffsetDateTime::now_utc()))
        .await
        .map_err(|err| CliError::new(format!("{kind} task failed: {err}")))?
        .map_err(|err| CliError::new(format!("{kind} failed: {err}")))?;
    service.email().drain().await;
    write_stdout_line(&format!(
        "{kind}: {} targets, {} notifications, {} emails",
        report.targets, report.notifications, report.emails
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration for a command.
fn load_config(args: &ConfigArgs) -> CliResult<GrcConfig> {
    GrcConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the store and builds the service off the async executor.
async fn build_server(config: GrcConfig) -> CliResult<GrcServer> {
    tokio::task::spawn_blocking(move || GrcServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("init failed: {err}")))
}

/// Parses a job name for clap.
fn parse_job_kind(value: &str) -> Result<JobKind, String> {
    JobKind::parse(value).ok_or_else(|| {
        let names: Vec<&str> = JobKind::ALL.iter().map(|kind| kind.as_str()).collect();
        format!("unknown job `{value}`; expected one of {}", names.join(", "))
    })
}

/// Builds the log filter: `RUST_LOG` when set, otherwise the configured filter.
fn log_filter(config: &LoggingConfig, env_value: Option<&str>) -> CliResult<EnvFilter> {
    let directive = env_value.filter(|value| !value.trim().is_empty()).unwrap_or(&config.filter);
    EnvFilter::try_new(directive).map_err(|err| CliError::new(format!("invalid log filter: {err}")))
}

/// Installs the global tracing subscriber writing to stderr.
fn init_logging(config: &LoggingConfig) -> CliResult<()> {
    let env_value = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(config, env_value.as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).try_init()
        }
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
