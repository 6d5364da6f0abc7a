// crates/grc-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite GRC Store
// Description: Connection setup, schema versioning, and row helpers.
// Purpose: Provide the shared connection and transaction primitives.
// Dependencies: grc-core, rusqlite, serde, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! The store holds a single `SQLite` connection behind a mutex. Reads run on
//! the locked connection; multi-statement writes run inside a transaction that
//! rolls back when the closure returns an error. Unique-key violations are
//! classified from the `SQLite` extended result code so callers can report
//! conflicts without inspecting message text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use grc_core::ErrorKind;
use grc_core::GrcError;
use grc_core::dates::format_date;
use grc_core::dates::format_timestamp;
use grc_core::dates::parse_date;
use grc_core::dates::parse_timestamp;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::ffi;
use rusqlite::params;
use rusqlite::types::Type;
use serde::Deserialize;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;

use crate::schema::SCHEMA_SQL;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` GRC store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with default pragmas for `path`.
    #[must_use]
    pub const fn for_path(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid input rejected by the store.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced row does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Unique key or referential conflict.
    #[error("{0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for GrcError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(message) => Self::not_found(message),
            SqliteStoreError::Conflict(message) => Self::conflict(message),
            SqliteStoreError::Invalid(message) => Self::validation(message),
            other @ (SqliteStoreError::Io(_)
            | SqliteStoreError::Db(_)
            | SqliteStoreError::Corrupt(_)
            | SqliteStoreError::VersionMismatch(_)) => Self::internal(other.to_string()),
        }
    }
}

impl From<GrcError> for SqliteStoreError {
    fn from(error: GrcError) -> Self {
        let message = error.message().to_string();
        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Validation | ErrorKind::Unauthorized | ErrorKind::Forbidden => {
                Self::Invalid(message)
            }
            ErrorKind::Internal => Self::Corrupt(message),
        }
    }
}

/// Classifies an engine error, surfacing unique-key violations as conflicts.
pub(crate) fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err
        && failure.code == ErrorCode::ConstraintViolation
        && matches!(
            failure.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    {
        return SqliteStoreError::Conflict(format!("duplicate record: {err}"));
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed GRC store.
#[derive(Clone)]
pub struct SqliteGrcStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteGrcStore {
    /// Opens the store, creating the database and schema when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened or initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Runs a read or single-statement write on the locked connection.
    pub(crate) fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        op(&guard)
    }

    /// Runs `op` in a transaction; an error from `op` rolls everything back.
    pub(crate) fn with_transaction<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(db_error)?;
        let value = op(&tx)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }

    /// Returns true when the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the connection is unusable.
    pub fn ping(&self) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", params![], |row| row.get::<_, i64>(0)).map_err(db_error)?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Row Helpers
// ============================================================================

/// Generates a new row identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Formats an instant as a bind parameter.
pub(crate) fn timestamp_param(instant: OffsetDateTime) -> Result<String, SqliteStoreError> {
    Ok(format_timestamp(instant)?)
}

/// Formats a date as a bind parameter.
pub(crate) fn date_param(date: Date) -> String {
    format_date(date)
}

/// Wraps a decode failure for a column.
fn conversion_error(index: usize, err: GrcError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

/// Reads a stored calendar date.
pub(crate) fn date_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Date> {
    let text: String = row.get(index)?;
    parse_date(&text).map_err(|err| conversion_error(index, err))
}

/// Reads an optional stored calendar date.
pub(crate) fn optional_date_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Date>> {
    let text: Option<String> = row.get(index)?;
    text.map(|text| parse_date(&text).map_err(|err| conversion_error(index, err))).transpose()
}

/// Reads a stored instant.
pub(crate) fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<OffsetDateTime> {
    let text: String = row.get(index)?;
    parse_timestamp(&text).map_err(|err| conversion_error(index, err))
}

/// Reads an optional stored instant.
pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<Option<OffsetDateTime>> {
    let text: Option<String> = row.get(index)?;
    text.map(|text| parse_timestamp(&text).map_err(|err| conversion_error(index, err))).transpose()
}

/// Reads a stored enum label through `parse`.
pub(crate) fn label_column<T>(
    row: &Row<'_>,
    index: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    parse(&text).ok_or_else(|| {
        conversion_error(index, GrcError::internal(format!("unknown stored label {text}")))
    })
}

/// Reads a non-negative count.
pub(crate) fn count_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    Ok(u64::try_from(value).unwrap_or(0))
}

/// Runs a single-value count query.
pub(crate) fn query_count(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<u64, SqliteStoreError> {
    conn.query_row(sql, params, |row| count_column(row, 0)).map_err(db_error)
}

/// Maps a missing row to [`SqliteStoreError::NotFound`].
pub(crate) fn require_row<T>(value: Option<T>, what: &str) -> Result<T, SqliteStoreError> {
    value.ok_or_else(|| SqliteStoreError::NotFound(format!("{what} not found")))
}

/// Fails with [`SqliteStoreError::NotFound`] when a write touched no rows.
pub(crate) fn require_changed(changed: usize, what: &str) -> Result<(), SqliteStoreError> {
    if changed == 0 {
        return Err(SqliteStoreError::NotFound(format!("{what} not found")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and referential integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
