// crates/grc-server/src/audit.rs
// ============================================================================
// Module: Audit Recorder
// Description: Sinks for append-only audit events.
// Purpose: Record every mutation without ever failing the caller.
// Dependencies: grc-core, grc-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! Service operations hand a [`NewAuditEntry`] to an [`AuditSink`] after the
//! business write succeeds. Sinks swallow their own failures: a lost audit
//! row is logged at `warn` and the mutation stands.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::NewAuditEntry;
use grc_store_sqlite::SqliteGrcStore;
use time::OffsetDateTime;
use tracing::warn;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event at `now`.
    fn record(&self, entry: NewAuditEntry, now: OffsetDateTime);
}

/// Audit sink that appends rows to the `audit_log` table.
pub struct StoreAuditSink {
    /// Backing store.
    store: SqliteGrcStore,
}

impl StoreAuditSink {
    /// Creates a sink writing to `store`.
    #[must_use]
    pub const fn new(store: SqliteGrcStore) -> Self {
        Self {
            store,
        }
    }
}

impl AuditSink for StoreAuditSink {
    fn record(&self, entry: NewAuditEntry, now: OffsetDateTime) {
        if let Err(err) = self.store.append_audit(&entry, now) {
            warn!(action = entry.action.as_str(), error = %err, "audit write failed");
        }
    }
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: NewAuditEntry, _now: OffsetDateTime) {}
}
