// crates/grc-store-sqlite/src/audit.rs
// ============================================================================
// Module: Audit Log Queries
// Description: Append-only audit rows and filtered audit reads.
// Purpose: Persist one row per mutating action.
// Dependencies: grc-core, rusqlite, serde_json, time
// ============================================================================

//! ## Overview
//! The store never updates or deletes audit rows. The `changes` payload is
//! stored as JSON text and decoded back into a JSON value on read.

use grc_core::AuditLogEntry;
use grc_core::AuditQuery;
use grc_core::NewAuditEntry;
use grc_core::UserId;
use rusqlite::Row;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Type;
use rusqlite::types::Value as SqlValue;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

/// Decodes an audit row.
fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    let changes: Option<String> = row.get(6)?;
    let changes = changes
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(err)))
        })
        .transpose()?;
    Ok(AuditLogEntry {
        id: row.get(0)?,
        performed_at: timestamp_column(row, 1)?,
        user_id: row.get::<_, Option<String>>(2)?.map(UserId::new),
        action_type: row.get(3)?,
        target_entity_type: row.get(4)?,
        target_entity_id: row.get(5)?,
        changes,
        ip_address: row.get(7)?,
    })
}

impl SqliteGrcStore {
    /// Appends an audit row and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the payload cannot be encoded or on
    /// engine failures.
    pub fn append_audit(
        &self,
        entry: &NewAuditEntry,
        now: OffsetDateTime,
    ) -> Result<i64, SqliteStoreError> {
        let performed_at = timestamp_param(now)?;
        let changes = entry
            .changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| SqliteStoreError::Invalid(format!("audit changes: {err}")))?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO audit_log (performed_at, user_id, action_type, target_entity_type,
                    target_entity_id, changes, ip_address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    performed_at,
                    entry.user_id.as_ref().map(UserId::as_str),
                    entry.action.as_str(),
                    entry.entity_type.map(|kind| kind.as_str()),
                    entry.entity_id,
                    changes,
                    entry.ip_address
                ],
            )
            .map_err(db_error)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Reads audit rows newest first with optional filters and paging.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, SqliteStoreError> {
        let mut clauses = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        let filters = [
            ("user_id", query.user_id.as_deref()),
            ("action_type", query.action_type.as_deref()),
            ("target_entity_type", query.entity_type.as_deref()),
        ];
        for (column, value) in filters {
            if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
                values.push(SqlValue::Text(value.to_string()));
                clauses.push(format!("{column} = ?{}", values.len()));
            }
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        values.push(SqlValue::Integer(i64::from(query.effective_limit())));
        let limit_index = values.len();
        values.push(SqlValue::Integer(i64::try_from(query.effective_offset()).unwrap_or(i64::MAX)));
        let offset_index = values.len();
        let sql = format!(
            "SELECT id, performed_at, user_id, action_type, target_entity_type, target_entity_id,
                changes, ip_address
             FROM audit_log {where_clause}
             ORDER BY performed_at DESC, id DESC
             LIMIT ?{limit_index} OFFSET ?{offset_index}"
        );
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let rows =
                stmt.query_map(params_from_iter(values.iter()), audit_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }
}
