// crates/grc-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite GRC Schema
// Description: DDL for schema version 1.
// Purpose: Define every table the persistence gateway owns.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Dates are `YYYY-MM-DD` text and instants are fixed-width UTC text, so
//! comparisons and `ORDER BY` on those columns are chronological.

/// Schema version 1 DDL, applied once when the database is created.
pub(crate) const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'user')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS control_library (
    id TEXT PRIMARY KEY,
    standard TEXT NOT NULL,
    family TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS activated_controls (
    id TEXT PRIMARY KEY,
    control_library_id TEXT NOT NULL REFERENCES control_library(id),
    owner_id TEXT NOT NULL REFERENCES users(id),
    status TEXT NOT NULL CHECK (status IN ('active', 'retired')),
    review_interval_days INTEGER NOT NULL CHECK (review_interval_days > 0),
    next_review_due_date TEXT NOT NULL,
    last_reviewed_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activated_controls_due
    ON activated_controls (status, next_review_due_date);

CREATE TABLE IF NOT EXISTS control_evidence_log (
    id TEXT PRIMARY KEY,
    activated_control_id TEXT NOT NULL REFERENCES activated_controls(id),
    performed_by_id TEXT NOT NULL REFERENCES users(id),
    performed_at TEXT NOT NULL,
    compliance_status TEXT NOT NULL,
    notes TEXT NOT NULL,
    evidence_link TEXT
);
CREATE INDEX IF NOT EXISTS idx_control_evidence_log_control
    ON control_evidence_log (activated_control_id, performed_at);

CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    asset_type TEXT NOT NULL,
    owner_id TEXT NOT NULL REFERENCES users(id),
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS asset_control_mappings (
    asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    activated_control_id TEXT NOT NULL REFERENCES activated_controls(id),
    mapping_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (asset_id, activated_control_id)
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    owner_id TEXT REFERENCES users(id),
    published_version_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_versions (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    body_content TEXT NOT NULL,
    change_description TEXT,
    status TEXT NOT NULL CHECK (status IN ('draft', 'published', 'archived')),
    created_by_user_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    UNIQUE (document_id, version_number)
);

CREATE TABLE IF NOT EXISTS document_read_acknowledgements (
    document_version_id TEXT NOT NULL REFERENCES document_versions(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id),
    acknowledged_at TEXT NOT NULL,
    PRIMARY KEY (document_version_id, user_id)
);

CREATE TABLE IF NOT EXISTS document_control_mappings (
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    activated_control_id TEXT NOT NULL REFERENCES activated_controls(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (document_id, activated_control_id)
);

CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY,
    sequential_id INTEGER NOT NULL UNIQUE,
    ticket_type TEXT NOT NULL CHECK (ticket_type IN ('internal', 'external')),
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    category TEXT,
    created_by_id TEXT REFERENCES users(id),
    assigned_to_user_id TEXT REFERENCES users(id),
    external_customer_ref TEXT,
    activated_control_id TEXT REFERENCES activated_controls(id),
    document_id TEXT REFERENCES documents(id) ON DELETE SET NULL,
    asset_id TEXT REFERENCES assets(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    resolved_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tickets_customer_ref ON tickets (external_customer_ref);

CREATE TABLE IF NOT EXISTS ticket_comments (
    id TEXT PRIMARY KEY,
    ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id),
    body TEXT NOT NULL,
    is_internal_note INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    message TEXT NOT NULL,
    link_url TEXT,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, created_at);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    performed_at TEXT NOT NULL,
    user_id TEXT,
    action_type TEXT NOT NULL,
    target_entity_type TEXT,
    target_entity_id TEXT,
    changes TEXT,
    ip_address TEXT
);
CREATE INDEX IF NOT EXISTS idx_audit_log_performed_at ON audit_log (performed_at);

CREATE TABLE IF NOT EXISTS risk_assessments (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT,
    likelihood INTEGER NOT NULL CHECK (likelihood BETWEEN 1 AND 5),
    impact INTEGER NOT NULL CHECK (impact BETWEEN 1 AND 5),
    risk_score INTEGER NOT NULL,
    status TEXT NOT NULL,
    owner_id TEXT REFERENCES users(id),
    mitigation_plan TEXT,
    residual_likelihood INTEGER,
    residual_impact INTEGER,
    residual_risk_score INTEGER NOT NULL DEFAULT 0,
    review_date TEXT,
    created_by_id TEXT REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS risk_control_mappings (
    risk_id TEXT NOT NULL REFERENCES risk_assessments(id) ON DELETE CASCADE,
    activated_control_id TEXT NOT NULL REFERENCES activated_controls(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (risk_id, activated_control_id)
);

CREATE TABLE IF NOT EXISTS gdpr_dsr (
    id TEXT PRIMARY KEY,
    request_type TEXT NOT NULL,
    requester_name TEXT NOT NULL,
    requester_email TEXT NOT NULL,
    requester_phone TEXT,
    data_subject_info TEXT NOT NULL,
    request_details TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    assigned_to_user_id TEXT REFERENCES users(id),
    deadline_date TEXT NOT NULL,
    completed_date TEXT,
    response_summary TEXT,
    rejection_reason TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gdpr_ropa (
    id TEXT PRIMARY KEY,
    activity_name TEXT NOT NULL,
    department TEXT,
    data_controller_details TEXT NOT NULL,
    data_categories TEXT NOT NULL,
    data_subject_categories TEXT NOT NULL,
    recipients TEXT,
    third_country_transfers TEXT,
    retention_period TEXT,
    security_measures TEXT,
    status TEXT NOT NULL CHECK (status IN ('draft', 'active', 'archived')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    risk_tier TEXT NOT NULL CHECK (risk_tier IN ('low', 'medium', 'high', 'critical')),
    status TEXT NOT NULL,
    contact_name TEXT,
    contact_email TEXT,
    contact_phone TEXT,
    website TEXT,
    contract_start_date TEXT,
    contract_end_date TEXT,
    contract_value REAL,
    last_assessment_date TEXT,
    next_assessment_due TEXT,
    owner_id TEXT REFERENCES users(id),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vendor_assessments (
    id TEXT PRIMARY KEY,
    vendor_id TEXT NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
    assessment_date TEXT NOT NULL,
    assessor_id TEXT NOT NULL REFERENCES users(id),
    overall_risk_score INTEGER NOT NULL CHECK (overall_risk_score BETWEEN 1 AND 25),
    data_security_score INTEGER,
    compliance_score INTEGER,
    financial_stability_score INTEGER,
    operational_capability_score INTEGER,
    findings TEXT,
    recommendations TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vendor_assessments_vendor ON vendor_assessments (vendor_id, assessment_date);

CREATE TABLE IF NOT EXISTS vendor_control_mappings (
    vendor_id TEXT NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
    activated_control_id TEXT NOT NULL REFERENCES activated_controls(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (vendor_id, activated_control_id)
);
";
