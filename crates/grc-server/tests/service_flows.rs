// crates/grc-server/tests/service_flows.rs
// ============================================================================
// Module: Service Flow Tests
// Description: Role checks, audit routing, and scheduled jobs.
// Purpose: Validate service behavior without an HTTP listener.
// ============================================================================

//! ## Overview
//! Drives [`GrcService`] and [`run_job`] directly at fixed instants:
//! - Review reminders fire at the due date and escalate after the grace period
//! - Digests reach every administrator
//! - Audit events flow through the configured sink
//! - Role checks reject regular users

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

use std::sync::Arc;
use std::sync::Mutex;

use grc_core::ActivateControlRequest;
use grc_core::ActivatedControl;
use grc_core::AuditAction;
use grc_core::AuditQuery;
use grc_core::ControlLibraryId;
use grc_core::DsrRequestType;
use grc_core::ErrorKind;
use grc_core::LoginRequest;
use grc_core::NewAuditEntry;
use grc_core::NewDsr;
use grc_core::UserId;
use grc_server::AuditSink;
use grc_server::AuthUser;
use grc_server::EmailDispatcher;
use grc_server::GrcService;
use grc_server::JobKind;
use grc_server::NoopAuditSink;
use grc_server::RequestContext;
use grc_server::SessionKeys;
use grc_server::run_job;
use grc_store_sqlite::SEED_USERS;
use grc_store_sqlite::SqliteGrcStore;
use grc_store_sqlite::SqliteStoreConfig;
use grc_store_sqlite::seed::seed;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const DAY_ZERO: OffsetDateTime = datetime!(2025-01-01 10:00 UTC);

fn service(dir: &TempDir) -> GrcService {
    let store = SqliteGrcStore::new(&SqliteStoreConfig::for_path(dir.path().join("grc.db"))).unwrap();
    seed(&store, DAY_ZERO).unwrap();
    GrcService::new(
        store,
        SessionKeys::new("service-test-signing-secret-0123", 7),
        "partner-key",
        EmailDispatcher::disabled("http://localhost:3000"),
    )
}

fn context(index: usize, now: OffsetDateTime) -> RequestContext {
    RequestContext::for_user(AuthUser::from(&SEED_USERS[index].to_user()), now)
}

fn activate(service: &GrcService, owner: usize, interval: i64) -> ActivatedControl {
    let request = ActivateControlRequest {
        control_library_id: ControlLibraryId::new("CIS-1.1"),
        owner_id: UserId::new(SEED_USERS[owner].id),
        review_interval_days: interval,
    };
    service.activate_control(&context(0, DAY_ZERO), &request).unwrap()
}

fn at_day(offset: i64) -> OffsetDateTime {
    DAY_ZERO + Duration::days(offset)
}

/// Sink that keeps every entry in memory.
#[derive(Default)]
struct RecordingSink {
    /// Captured entries in arrival order.
    entries: Mutex<Vec<NewAuditEntry>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, entry: NewAuditEntry, _now: OffsetDateTime) {
        self.entries.lock().unwrap().push(entry);
    }
}

// ============================================================================
// SECTION: Scheduled Jobs
// ============================================================================

#[test]
fn due_check_fires_on_the_review_date() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    let control = activate(&service, 1, 30);
    let owner = UserId::new(SEED_USERS[1].id);

    let early = run_job(&service, JobKind::DueCheck, at_day(29)).unwrap();
    assert_eq!(early.targets, 0);

    let due = run_job(&service, JobKind::DueCheck, at_day(30)).unwrap();
    assert_eq!(due.targets, 1);
    assert_eq!(due.notifications, 1);
    assert_eq!(due.emails, 1);

    let notifications = service.store().list_notifications(&owner, true).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "Control CIS-1.1 is due for review");
    assert_eq!(
        notifications[0].link_url.as_deref(),
        Some(format!("/controls/activated/{}", control.id.as_str()).as_str())
    );
}

#[test]
fn overdue_check_waits_for_the_grace_period() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    activate(&service, 2, 30);
    let owner = UserId::new(SEED_USERS[2].id);

    assert_eq!(run_job(&service, JobKind::OverdueCheck, at_day(36)).unwrap().targets, 0);
    let overdue = run_job(&service, JobKind::OverdueCheck, at_day(37)).unwrap();
    assert_eq!(overdue.targets, 1);
    assert_eq!(overdue.notifications, 1);

    let notifications = service.store().list_notifications(&owner, false).unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.starts_with("URGENT: Control CIS-1.1"));
}

#[test]
fn retired_controls_are_not_scanned() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    let control = activate(&service, 1, 30);
    service.retire_control(&context(0, at_day(1)), &control.id).unwrap();

    assert_eq!(run_job(&service, JobKind::DueCheck, at_day(30)).unwrap().targets, 0);
    assert_eq!(run_job(&service, JobKind::OverdueCheck, at_day(40)).unwrap().targets, 0);
}

#[test]
fn daily_digest_notifies_each_admin() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    activate(&service, 1, 30);

    let report = run_job(&service, JobKind::DailyDigest, at_day(1)).unwrap();
    assert_eq!(report.targets, 1);
    assert_eq!(report.notifications, 1);
    assert_eq!(report.emails, 1);

    let admin = UserId::new(SEED_USERS[0].id);
    let notifications = service.store().list_notifications(&admin, true).unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.starts_with("Daily Summary - Controls: "));
    assert!(notifications[0].message.contains("0 compliant, 0 overdue"));
    assert_eq!(notifications[0].link_url.as_deref(), Some("/dashboard"));
}

#[test]
fn weekly_digest_only_sends_email() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    let report = run_job(&service, JobKind::WeeklyDigest, at_day(7)).unwrap();
    assert_eq!(report.targets, 1);
    assert_eq!(report.notifications, 0);
    assert_eq!(report.emails, 1);

    let admin = UserId::new(SEED_USERS[0].id);
    assert!(service.store().list_notifications(&admin, false).unwrap().is_empty());
}

// ============================================================================
// SECTION: Audit and Roles
// ============================================================================

#[test]
fn audit_events_reach_the_configured_sink() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let service = service(&dir).with_audit_sink(Arc::clone(&sink) as Arc<dyn AuditSink>);

    let ctx = RequestContext::anonymous(DAY_ZERO).with_ip("10.0.0.7");
    let request = LoginRequest {
        email: SEED_USERS[1].email.to_string(),
        password: "user123".to_string(),
    };
    let response = service.login(&ctx, &request).unwrap();
    assert_eq!(response.user.email, SEED_USERS[1].email);

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::UserLoginSuccess);
    assert_eq!(entries[0].user_id.as_ref().map(UserId::as_str), Some(SEED_USERS[1].id));
    assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.7"));
    drop(entries);

    let stored = service.store().query_audit(&AuditQuery::default()).unwrap();
    assert!(stored.is_empty());
}

#[test]
fn regular_users_cannot_create_internal_dsrs() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir).with_audit_sink(Arc::new(NoopAuditSink));
    let request = NewDsr {
        request_type: Some(DsrRequestType::Access),
        requester_name: "Dana Subject".to_string(),
        requester_email: "dana@example.org".to_string(),
        data_subject_info: "Customer account 1182".to_string(),
        ..NewDsr::default()
    };

    let err = service.create_dsr(&context(1, DAY_ZERO), &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let created = service.create_dsr(&context(0, DAY_ZERO), &request).unwrap();
    assert_eq!(created.deadline_date, DAY_ZERO.date() + Duration::days(30));
}

#[test]
fn session_tokens_round_trip_through_authenticate() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let ctx = RequestContext::anonymous(OffsetDateTime::now_utc());
    let request = LoginRequest {
        email: SEED_USERS[0].email.to_string(),
        password: "admin123".to_string(),
    };
    let token = service.login(&ctx, &request).unwrap().token;

    let header = format!("Bearer {token}");
    let user = service.authenticate(Some(&header)).unwrap().unwrap();
    assert!(user.is_admin());
    assert!(service.authenticate(None).unwrap().is_none());
    assert_eq!(service.authenticate(Some("Basic abc")).unwrap_err().kind(), ErrorKind::Unauthorized);
}
