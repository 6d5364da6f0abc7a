// crates/grc-store-sqlite/tests/store_records.rs
// ============================================================================
// Module: SQLite Record Tests
// Description: Tickets, notifications, audit, assets, risks, DSRs, dashboard.
// Purpose: Validate the non-control record stores against a real database.
// ============================================================================

//! ## Overview
//! Covers sequencing, scoping, and aggregate behavior of the record stores:
//! - Ticket numbering and comment visibility
//! - Notification ownership and read idempotence
//! - Audit filtering and ordering
//! - Asset and risk mappings, severity buckets
//! - DSR deadlines, completion, and metrics
//! - Dashboard counters

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

use grc_core::AssetId;
use grc_core::AssetStatus;
use grc_core::AssetUpdate;
use grc_core::AuditAction;
use grc_core::AuditQuery;
use grc_core::ComplianceStatus;
use grc_core::ControlLibraryId;
use grc_core::DsrRequestType;
use grc_core::DsrStatus;
use grc_core::EntityType;
use grc_core::NewAsset;
use grc_core::NewAuditEntry;
use grc_core::NewComment;
use grc_core::NewDsr;
use grc_core::NewExternalTicket;
use grc_core::NewInternalTicket;
use grc_core::NewNotification;
use grc_core::NewRisk;
use grc_core::NotificationId;
use grc_core::RiskStatus;
use grc_core::RiskUpdate;
use grc_core::Severity;
use grc_core::TicketStatus;
use grc_core::TicketType;
use grc_core::TicketUpdate;
use grc_core::UserId;
use grc_store_sqlite::SEED_USERS;
use grc_store_sqlite::SqliteGrcStore;
use grc_store_sqlite::SqliteStoreConfig;
use grc_store_sqlite::SqliteStoreError;
use grc_store_sqlite::seed::seed;
use serde_json::json;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;
use time::macros::date;
use time::macros::datetime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const NOW: OffsetDateTime = datetime!(2025-03-10 12:00 UTC);

fn seeded_store(dir: &TempDir) -> SqliteGrcStore {
    let config = SqliteStoreConfig::for_path(dir.path().join("grc.db"));
    let store = SqliteGrcStore::new(&config).unwrap();
    seed(&store, NOW).unwrap();
    store
}

fn admin() -> UserId {
    UserId::new(SEED_USERS[0].id)
}

fn user() -> UserId {
    UserId::new(SEED_USERS[1].id)
}

fn new_risk(likelihood: i64, impact: i64) -> NewRisk {
    NewRisk {
        title: "Vendor breach".to_string(),
        description: "Payroll vendor compromise".to_string(),
        likelihood,
        impact,
        ..NewRisk::default()
    }
}

fn new_dsr() -> NewDsr {
    NewDsr {
        request_type: Some(DsrRequestType::Access),
        requester_name: "Ada Lovelace".to_string(),
        requester_email: "ada@example.com".to_string(),
        data_subject_info: "Customer #42".to_string(),
        ..NewDsr::default()
    }
}

// ============================================================================
// SECTION: Tickets
// ============================================================================

#[test]
fn ticket_numbers_are_sequential_across_origins() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let internal = NewInternalTicket {
        title: "Rotate keys".to_string(),
        ..NewInternalTicket::default()
    };
    let external = NewExternalTicket {
        title: "Portal access".to_string(),
        external_customer_ref: "CUST-9".to_string(),
        ..NewExternalTicket::default()
    };
    let first = store.create_internal_ticket(&admin(), &internal, NOW).unwrap();
    let second = store.create_external_ticket(&external, NOW).unwrap();
    let third = store.create_internal_ticket(&user(), &internal, NOW).unwrap();
    assert_eq!((first.sequential_id, second.sequential_id, third.sequential_id), (1, 2, 3));
    assert_eq!(second.created_by_id, None);
    assert_eq!(store.list_tickets(Some(TicketType::Internal)).unwrap().len(), 2);
    assert_eq!(store.list_tickets(None).unwrap().len(), 3);
    let by_customer = store.list_tickets_by_customer("CUST-9").unwrap();
    assert_eq!(by_customer.len(), 1);
    assert_eq!(by_customer[0].id, second.id);
}

#[test]
fn internal_notes_are_hidden_from_customer_view() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let ticket = store
        .create_external_ticket(
            &NewExternalTicket {
                title: "Invoice".to_string(),
                external_customer_ref: "CUST-1".to_string(),
                ..NewExternalTicket::default()
            },
            NOW,
        )
        .unwrap();
    let public = NewComment {
        body: "We are on it".to_string(),
        is_internal_note: false,
    };
    let private = NewComment {
        body: "Escalate to finance".to_string(),
        is_internal_note: true,
    };
    store.add_comment(&ticket.id, &admin(), &public, NOW).unwrap();
    store.add_comment(&ticket.id, &admin(), &private, NOW + Duration::minutes(1)).unwrap();
    assert_eq!(store.list_comments(&ticket.id, true).unwrap().len(), 2);
    let visible = store.list_comments(&ticket.id, false).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].author_name, "System Administrator");
}

#[test]
fn resolving_a_ticket_stamps_resolution_time() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let ticket = store
        .create_internal_ticket(
            &admin(),
            &NewInternalTicket {
                title: "Patch VPN".to_string(),
                ..NewInternalTicket::default()
            },
            NOW,
        )
        .unwrap();
    let later = NOW + Duration::hours(3);
    let update = TicketUpdate {
        status: Some(TicketStatus::Resolved),
        ..TicketUpdate::default()
    };
    let resolved = store.update_ticket(&ticket.id, &update, later).unwrap();
    assert_eq!(resolved.resolved_at, Some(later));
    let summary = store.dashboard_summary(later.date()).unwrap();
    assert_eq!(summary.tickets.total, 1);
    assert_eq!(summary.tickets.open, 0);
    assert_eq!(summary.tickets.resolved_this_month, 1);
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

#[test]
fn marking_read_is_idempotent_and_owner_scoped() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let note = store
        .create_notification(&NewNotification::with_link(user(), "Review due", "/controls"), NOW)
        .unwrap();
    assert_eq!(store.list_notifications(&user(), true).unwrap().len(), 1);

    store.mark_notification_read(&user(), &note.id).unwrap();
    store.mark_notification_read(&user(), &note.id).unwrap();
    assert!(store.list_notifications(&user(), true).unwrap().is_empty());
    assert_eq!(store.list_notifications(&user(), false).unwrap().len(), 1);

    let Err(err) = store.mark_notification_read(&admin(), &note.id) else {
        panic!("other users cannot mark the notification");
    };
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
    let Err(err) = store.mark_notification_read(&user(), &NotificationId::new("missing")) else {
        panic!("unknown notification should be missing");
    };
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn audit_filters_and_orders_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    store
        .append_audit(
            &NewAuditEntry::new(AuditAction::UserLoginFailure)
                .ip(Some("10.0.0.1".to_string()))
                .changes(json!({"email": "nobody@company.com"})),
            NOW,
        )
        .unwrap();
    store
        .append_audit(
            &NewAuditEntry::new(AuditAction::TicketCreated)
                .actor(Some(admin()))
                .entity(EntityType::Ticket, "t-1"),
            NOW + Duration::seconds(1),
        )
        .unwrap();
    store
        .append_audit(
            &NewAuditEntry::new(AuditAction::TicketUpdated)
                .actor(Some(user()))
                .entity(EntityType::Ticket, "t-1"),
            NOW + Duration::seconds(2),
        )
        .unwrap();

    let all = store.query_audit(&AuditQuery::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].action_type, "TICKET_UPDATED");
    assert_eq!(all[2].user_id, None);
    assert_eq!(all[2].changes, Some(json!({"email": "nobody@company.com"})));

    let by_user = store
        .query_audit(&AuditQuery {
            user_id: Some(admin().as_str().to_string()),
            ..AuditQuery::default()
        })
        .unwrap();
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].action_type, "TICKET_CREATED");

    let paged = store
        .query_audit(&AuditQuery {
            entity_type: Some("ticket".to_string()),
            limit: Some(1),
            offset: Some(1),
            ..AuditQuery::default()
        })
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].action_type, "TICKET_CREATED");
}

// ============================================================================
// SECTION: Assets
// ============================================================================

#[test]
fn asset_mappings_and_breakdown() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let asset = store
        .create_asset(
            &NewAsset {
                name: "Payroll DB".to_string(),
                description: None,
                asset_type: "database".to_string(),
                owner_id: admin().as_str().to_string(),
            },
            NOW,
        )
        .unwrap();
    let control = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &admin(), 30, NOW)
        .unwrap();
    store.map_asset_control(&asset.id, &control.id, "implements", NOW).unwrap();
    store.map_asset_control(&asset.id, &control.id, "supports", NOW).unwrap();
    let mapped = store.list_asset_controls(&asset.id).unwrap();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].mapping_type, "supports");

    store.unmap_asset_control(&asset.id, &control.id).unwrap();
    let Err(err) = store.unmap_asset_control(&asset.id, &control.id) else {
        panic!("second unmap should be missing");
    };
    assert!(matches!(err, SqliteStoreError::NotFound(_)));

    let update = AssetUpdate {
        status: Some(AssetStatus::Decommissioned),
        ..AssetUpdate::default()
    };
    let updated = store.update_asset(&asset.id, &update, NOW).unwrap();
    assert_eq!(updated.status, AssetStatus::Decommissioned);
    assert_eq!(updated.name, "Payroll DB");

    let breakdown = store.asset_breakdown().unwrap();
    assert_eq!(breakdown.by_type[0].label, "database");
    assert_eq!(breakdown.by_status[0].label, "decommissioned");

    store.delete_asset(&asset.id).unwrap();
    let Err(err) = store.get_asset(&AssetId::new(asset.id.as_str())) else {
        panic!("deleted asset should be missing");
    };
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
}

// ============================================================================
// SECTION: Risks
// ============================================================================

#[test]
fn risk_scores_recompute_and_distribution_skips_closed() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let critical = store.create_risk(&admin(), &new_risk(5, 4), NOW).unwrap();
    assert_eq!(critical.risk_score, 20);
    assert_eq!(critical.severity, Severity::Critical);
    let medium = store.create_risk(&admin(), &new_risk(2, 3), NOW).unwrap();
    assert_eq!(medium.severity, Severity::Medium);
    let closed = store.create_risk(&admin(), &new_risk(1, 1), NOW).unwrap();

    let update = RiskUpdate {
        impact: Some(5),
        ..RiskUpdate::default()
    };
    let raised = store.update_risk(&medium.id, &update, NOW).unwrap();
    assert_eq!(raised.risk_score, 10);
    assert_eq!(raised.severity, Severity::High);

    let close = RiskUpdate {
        status: Some(RiskStatus::Closed),
        ..RiskUpdate::default()
    };
    store.update_risk(&closed.id, &close, NOW).unwrap();

    let distribution = store.risk_distribution().unwrap();
    let counts: Vec<_> = distribution.iter().map(|bucket| (bucket.severity, bucket.count)).collect();
    assert_eq!(
        counts,
        vec![
            (Severity::Critical, 1),
            (Severity::High, 1),
            (Severity::Medium, 0),
            (Severity::Low, 0)
        ]
    );

    let Err(err) = store.create_risk(&admin(), &new_risk(0, 3), NOW) else {
        panic!("zero likelihood should be rejected");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn risk_control_links_ignore_repeats() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let risk = store.create_risk(&admin(), &new_risk(3, 3), NOW).unwrap();
    let control = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &admin(), 30, NOW)
        .unwrap();
    store.map_risk_control(&risk.id, &control.id, NOW).unwrap();
    store.map_risk_control(&risk.id, &control.id, NOW).unwrap();
    assert_eq!(store.list_risk_controls(&risk.id).unwrap().len(), 1);
    store.delete_risk(&risk.id).unwrap();
    let Err(err) = store.list_risk_controls(&risk.id) else {
        panic!("deleted risk should be missing");
    };
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
}

// ============================================================================
// SECTION: Data-Subject Requests
// ============================================================================

#[test]
fn completing_a_request_keeps_its_deadline() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let dsr = store.create_dsr(&new_dsr(), NOW).unwrap();
    assert_eq!(dsr.status, DsrStatus::Submitted);
    assert_eq!(dsr.deadline_date, date!(2025 - 04 - 09));

    let done_at = NOW + Duration::days(3);
    let completed = store.complete_dsr(&dsr.id, "Export sent", done_at).unwrap();
    assert_eq!(completed.status, DsrStatus::Completed);
    assert_eq!(completed.completed_date, Some(done_at));
    assert_eq!(completed.deadline_date, dsr.deadline_date);

    let reloaded = store.get_dsr(&dsr.id).unwrap();
    assert_eq!(reloaded.deadline_date, dsr.deadline_date);
    assert_eq!(reloaded.response_summary.as_deref(), Some("Export sent"));
}

#[test]
fn dsr_metrics_count_overdue_and_average_response() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let done = store.create_dsr(&new_dsr(), NOW).unwrap();
    store.complete_dsr(&done.id, "Done", NOW + Duration::days(2)).unwrap();
    store.create_dsr(&new_dsr(), NOW).unwrap();

    let metrics = store.dsr_metrics(date!(2025 - 04 - 20)).unwrap();
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.completed, 1);
    assert_eq!(metrics.submitted, 1);
    assert_eq!(metrics.overdue, 1);
    assert!((metrics.avg_response_days - 2.0).abs() < 1e-6);
    assert!((metrics.completion_rate - 50.0).abs() < f64::EPSILON);
}

// ============================================================================
// SECTION: Dashboard
// ============================================================================

#[test]
fn dashboard_uses_latest_evidence_per_control() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let first = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &admin(), 30, NOW)
        .unwrap();
    let second = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &user(), 5, NOW)
        .unwrap();
    store
        .submit_evidence(&first.id, &admin(), ComplianceStatus::NonCompliant, "gap", None, NOW)
        .unwrap();
    store
        .submit_evidence(
            &first.id,
            &admin(),
            ComplianceStatus::Compliant,
            "fixed",
            None,
            NOW + Duration::hours(1),
        )
        .unwrap();

    let today = NOW.date() + Duration::days(10);
    let summary = store.dashboard_summary(today).unwrap();
    assert_eq!(summary.controls.activated, 2);
    assert_eq!(summary.controls.compliant, 1);
    assert_eq!(summary.controls.non_compliant, 0);
    assert_eq!(summary.controls.overdue, 1);
    assert!((summary.controls.compliance_percentage - 50.0).abs() < f64::EPSILON);
    assert!(summary.controls.total > 0);
    assert_eq!(second.owner_id, user());

    let weekly = store.weekly_stats(NOW + Duration::days(1)).unwrap();
    assert_eq!(weekly.evidence_submissions, 2);
    assert_eq!(weekly.compliance_rate, 50);
}
