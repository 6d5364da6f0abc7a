// crates/grc-server/tests/http_api.rs
// ============================================================================
// Module: HTTP API Tests
// Description: End-to-end requests against the axum router.
// Purpose: Validate status codes, error bodies, and audited flows over HTTP.
// ============================================================================

//! ## Overview
//! Serves the real router on an ephemeral port over a seeded database file:
//! - Login success, failure auditing, and token enforcement
//! - Admin-only and partner-key guarded endpoints
//! - Evidence submission, notifications, and DSR completion
//! - Document publication, vendor assessment validation, register archival
//! - Error body shape for malformed requests

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

use std::net::SocketAddr;
use std::sync::Arc;

use grc_core::ControlDetail;
use grc_core::ControlLibraryId;
use grc_core::DataSubjectRequest;
use grc_core::Document;
use grc_core::DocumentDetail;
use grc_core::DocumentVersion;
use grc_core::DocumentVersionStatus;
use grc_core::DsrStatus;
use grc_core::NewNotification;
use grc_core::UserId;
use grc_core::Vendor;
use grc_server::EmailDispatcher;
use grc_server::GrcService;
use grc_server::SessionKeys;
use grc_server::build_router;
use grc_store_sqlite::SEED_PASSWORDS;
use grc_store_sqlite::SEED_USERS;
use grc_store_sqlite::SqliteGrcStore;
use grc_store_sqlite::SqliteStoreConfig;
use grc_store_sqlite::seed::seed;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const TEST_SECRET: &str = "http-test-signing-secret-0123456789";
const TEST_API_KEY: &str = "partner-key";
const ADMIN_EMAIL: &str = "admin@company.com";
const USER_EMAIL: &str = "user@company.com";
const JOHN_EMAIL: &str = "john.doe@company.com";

/// Running API bound to a temporary database.
struct TestApi {
    /// Base URL including the `/api/v1` prefix.
    api: String,
    /// Server root URL.
    root: String,
    /// Shared HTTP client.
    client: Client,
    /// Service behind the router, for direct setup.
    service: Arc<GrcService>,
    /// Keeps the database directory alive.
    _dir: TempDir,
}

async fn spawn_api() -> TestApi {
    let dir = TempDir::new().unwrap();
    let store = SqliteGrcStore::new(&SqliteStoreConfig::for_path(dir.path().join("grc.db"))).unwrap();
    seed(&store, OffsetDateTime::now_utc()).unwrap();
    let service = Arc::new(GrcService::new(
        store,
        SessionKeys::new(TEST_SECRET, 7),
        TEST_API_KEY,
        EmailDispatcher::disabled("http://localhost:3000"),
    ));
    let router = build_router(Arc::clone(&service), 64 * 1024);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    TestApi {
        api: format!("http://{addr}/api/v1"),
        root: format!("http://{addr}"),
        client: Client::new(),
        service,
        _dir: dir,
    }
}

impl TestApi {
    async fn login(&self, email: &str) -> String {
        let response = self
            .client
            .post(format!("{}/auth/login", self.api))
            .json(&json!({ "email": email, "password": "admin123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api)
    }
}

fn seed_user(email: &str) -> UserId {
    let user = SEED_USERS.iter().find(|user| user.email == email).unwrap();
    UserId::new(user.id)
}

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

// ============================================================================
// SECTION: Session
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_checks_the_store() {
    let api = spawn_api().await;
    let response = api.client.get(format!("{}/health", api.root)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_logins_are_rejected_and_audited() {
    let api = spawn_api().await;
    let response = api
        .client
        .post(api.url("/auth/login"))
        .json(&json!({ "email": USER_EMAIL, "password": "not-a-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await, "invalid email or password");

    let unknown = api
        .client
        .post(api.url("/auth/login"))
        .json(&json!({ "email": "nobody@company.com", "password": "admin123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(unknown).await, "invalid email or password");

    let token = api.login(ADMIN_EMAIL).await;
    let rows: Vec<Value> = api
        .client
        .get(api.url("/audit/logs?action_type=USER_LOGIN_FAILURE"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row["user_id"].is_null()));
    assert!(rows.iter().any(|row| row["changes"]["email"] == USER_EMAIL));
    assert!(rows.iter().all(|row| row["ip_address"] == "127.0.0.1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_seed_password_logs_in_every_seed_user() {
    let api = spawn_api().await;
    for seeded in &SEED_USERS {
        for password in SEED_PASSWORDS {
            let response = api
                .client
                .post(api.url("/auth/login"))
                .json(&json!({ "email": seeded.email, "password": password }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{} with {password}", seeded.email);
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["user"]["email"], seeded.email);
            assert_eq!(body["user"]["role"], seeded.role.as_str());

            let token = body["token"].as_str().unwrap();
            let summary =
                api.client.get(api.url("/dashboard/summary")).bearer_auth(token).send().await.unwrap();
            assert_eq!(summary.status(), StatusCode::OK);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn protected_routes_require_a_valid_token() {
    let api = spawn_api().await;
    let missing = api.client.get(api.url("/dashboard/summary")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(missing).await, "authorization header required");

    let forged = api
        .client
        .get(api.url("/dashboard/summary"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(forged).await, "invalid or expired token");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admin_routes_reject_regular_users() {
    let api = spawn_api().await;
    let token = api.login(USER_EMAIL).await;
    let response = api
        .client
        .post(api.url("/controls/library"))
        .bearer_auth(&token)
        .json(&json!({ "id": "CUSTOM-1", "standard": "Internal", "name": "Custom control" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_message(response).await, "admin access required");

    let audit = api.client.get(api.url("/audit/logs")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(audit.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// SECTION: Controls
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn evidence_over_http_advances_the_review_date() {
    let api = spawn_api().await;
    let owner = seed_user(USER_EMAIL);
    let activated_at = OffsetDateTime::now_utc() - Duration::days(20);
    let control = api
        .service
        .store()
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &owner, 30, activated_at)
        .unwrap();

    let token = api.login(USER_EMAIL).await;
    let response = api
        .client
        .post(api.url(&format!("/controls/activated/{}/evidence", control.id.as_str())))
        .bearer_auth(&token)
        .json(&json!({
            "compliance_status": "compliant",
            "notes": "Quarterly inventory reconciled",
            "evidence_link": "  https://evidence.example/inv  "
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let today = OffsetDateTime::now_utc().date();

    let detail: ControlDetail = api
        .client
        .get(api.url(&format!("/controls/activated/{}", control.id.as_str())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.control.next_review_due_date, today + Duration::days(30));
    assert_eq!(detail.evidence.len(), 1);
    assert_eq!(detail.evidence[0].evidence_link.as_deref(), Some("https://evidence.example/inv"));
    assert!(detail.control.last_reviewed_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_evidence_is_rejected() {
    let api = spawn_api().await;
    let owner = seed_user(USER_EMAIL);
    let control = api
        .service
        .store()
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &owner, 30, OffsetDateTime::now_utc())
        .unwrap();
    let token = api.login(USER_EMAIL).await;
    let response = api
        .client
        .post(api.url(&format!("/controls/activated/{}/evidence", control.id.as_str())))
        .bearer_auth(&token)
        .json(&json!({ "compliance_status": "compliant", "notes": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api.service.store().count_evidence(&control.id).unwrap(), 0);
}

// ============================================================================
// SECTION: Tickets
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn external_tickets_require_the_partner_key() {
    let api = spawn_api().await;
    let body = json!({ "title": "Portal login fails", "external_customer_ref": "CUST-42" });

    let missing = api.client.post(api.url("/tickets/external")).json(&body).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(missing).await, "API key required");

    let wrong = api
        .client
        .post(api.url("/tickets/external"))
        .header("x-api-key", "guess")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(wrong).await, "invalid API key");

    let created = api
        .client
        .post(api.url("/tickets/external"))
        .header("x-api-key", TEST_API_KEY)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let listed: Vec<Value> = api
        .client
        .get(api.url("/tickets/external/CUST-42"))
        .header("x-api-key", TEST_API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Portal login fails");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_creator_or_assignee_may_comment() {
    let api = spawn_api().await;
    let john = api.login(JOHN_EMAIL).await;
    let ticket: Value = api
        .client
        .post(api.url("/tickets/internal"))
        .bearer_auth(&john)
        .json(&json!({ "title": "Rotate backup keys" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ticket_id = ticket["id"].as_str().unwrap();

    let other = api.login(USER_EMAIL).await;
    let denied = api
        .client
        .post(api.url(&format!("/tickets/{ticket_id}/comments")))
        .bearer_auth(&other)
        .json(&json!({ "body": "Drive-by comment" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_message(denied).await, "only the creator or assignee may comment");

    let allowed = api
        .client
        .post(api.url(&format!("/tickets/{ticket_id}/comments")))
        .bearer_auth(&john)
        .json(&json!({ "body": "Keys rotated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::CREATED);
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn marking_a_notification_read_twice_succeeds() {
    let api = spawn_api().await;
    let owner = seed_user(USER_EMAIL);
    let notification = api
        .service
        .store()
        .create_notification(
            &NewNotification::with_link(owner, "Control CIS-1.1 is due for review", "/controls/activated/x"),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
    let token = api.login(USER_EMAIL).await;
    let path = api.url(&format!("/notifications/{}/read", notification.id.as_str()));

    for _ in 0..2 {
        let response = api.client.post(&path).bearer_auth(&token).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "status": "marked as read" }));
    }

    let unread: Vec<Value> = api
        .client
        .get(api.url("/notifications?unread=true"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(unread.is_empty());

    let stranger = api.login(JOHN_EMAIL).await;
    let foreign = api.client.post(&path).bearer_auth(&stranger).send().await.unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// SECTION: Data-Subject Requests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completing_a_public_dsr_keeps_its_deadline() {
    let api = spawn_api().await;
    let submitted = api
        .client
        .post(api.url("/gdpr/dsr/public"))
        .json(&json!({
            "request_type": "erasure",
            "requester_name": "Dana Subject",
            "requester_email": "dana@example.org",
            "data_subject_info": "Customer account 1182"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let dsr: DataSubjectRequest = submitted.json().await.unwrap();
    assert_eq!(dsr.status, DsrStatus::Submitted);
    assert_eq!(dsr.deadline_date, dsr.created_at.date() + Duration::days(30));

    let token = api.login(ADMIN_EMAIL).await;
    let completed: DataSubjectRequest = api
        .client
        .put(api.url(&format!("/gdpr/dsr/{}/complete", dsr.id.as_str())))
        .bearer_auth(&token)
        .json(&json!({ "response_summary": "Account data erased" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(completed.status, DsrStatus::Completed);
    assert_eq!(completed.deadline_date, dsr.deadline_date);
    assert_eq!(completed.response_summary.as_deref(), Some("Account data erased"));
    assert!(completed.completed_date.is_some());

    let rows: Vec<Value> = api
        .client
        .get(api.url("/audit/logs?action_type=DSR_CREATED"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["user_id"].is_null());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn public_dsr_requires_a_request_type() {
    let api = spawn_api().await;
    let response = api
        .client
        .post(api.url("/gdpr/dsr/public"))
        .json(&json!({
            "requester_name": "Dana Subject",
            "requester_email": "dana@example.org",
            "data_subject_info": "Customer account 1182"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "request_type is required");
}

// ============================================================================
// SECTION: Documents, Vendors, Processing Register
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publishing_a_new_version_archives_the_old_one_over_http() {
    let api = spawn_api().await;
    let admin = api.login(ADMIN_EMAIL).await;
    let reader = api.login(USER_EMAIL).await;

    let document: Document = api
        .client
        .post(api.url("/documents"))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Information Security Policy",
            "category": "policy",
            "owner_id": seed_user(ADMIN_EMAIL),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut versions = Vec::new();
    for body in ["first draft", "second draft"] {
        let response = api
            .client
            .post(api.url(&format!("/documents/{}/versions", document.id.as_str())))
            .bearer_auth(&admin)
            .json(&json!({ "body_content": body }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let version: DocumentVersion = response.json().await.unwrap();
        versions.push(version);
    }

    for version in &versions {
        let path = format!("/documents/{}/versions/{}/publish", document.id.as_str(), version.id.as_str());
        let forbidden = api.client.put(api.url(&path)).bearer_auth(&reader).send().await.unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        let published = api.client.put(api.url(&path)).bearer_auth(&admin).send().await.unwrap();
        assert_eq!(published.status(), StatusCode::OK);
        let body: Value = published.json().await.unwrap();
        assert_eq!(body, json!({ "status": "published" }));
    }

    let ack_path = format!("/versions/{}/acknowledge", versions[1].id.as_str());
    for _ in 0..2 {
        let ack = api.client.post(api.url(&ack_path)).bearer_auth(&reader).send().await.unwrap();
        assert_eq!(ack.status(), StatusCode::OK);
    }

    let detail: DocumentDetail = api
        .client
        .get(api.url(&format!("/documents/{}", document.id.as_str())))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.document.published_version_id.as_ref(), Some(&versions[1].id));
    assert_eq!(detail.versions[0].version_number, 2);
    assert_eq!(detail.versions[0].status, DocumentVersionStatus::Published);
    assert_eq!(detail.versions[0].acknowledgement_count, 1);
    assert_eq!(detail.versions[1].status, DocumentVersionStatus::Archived);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vendor_and_register_routes_enforce_roles() {
    let api = spawn_api().await;
    let admin = api.login(ADMIN_EMAIL).await;
    let reader = api.login(USER_EMAIL).await;

    let denied = api
        .client
        .post(api.url("/vendors"))
        .bearer_auth(&reader)
        .json(&json!({ "name": "Acme", "category": "saas" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let vendor: Vendor = api
        .client
        .post(api.url("/vendors"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Acme", "category": "saas", "risk_tier": "high" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let assessed = api
        .client
        .post(api.url(&format!("/vendors/{}/assessments", vendor.id.as_str())))
        .bearer_auth(&reader)
        .json(&json!({ "overall_risk_score": 26 }))
        .send()
        .await
        .unwrap();
    assert_eq!(assessed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(assessed).await, "overall_risk_score must be between 1 and 25");

    let entry: Value = api
        .client
        .post(api.url("/gdpr/ropa"))
        .bearer_auth(&admin)
        .json(&json!({
            "activity_name": "Payroll",
            "data_controller_details": "Acme Ltd",
            "data_categories": "salary",
            "data_subject_categories": "employees",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let archive_path = format!("/gdpr/ropa/{}", entry["id"].as_str().unwrap());
    let archived = api.client.delete(api.url(&archive_path)).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(archived.status(), StatusCode::OK);
    let metrics: Value = api
        .client
        .get(api.url("/analytics/ropa-metrics"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        metrics,
        json!({ "total_processing_activities": 1, "active": 0, "draft": 0, "archived": 1 })
    );
}

// ============================================================================
// SECTION: Error Shape
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_bodies_return_json_errors() {
    let api = spawn_api().await;
    let response = api
        .client
        .post(api.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "invalid request body" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_records_return_not_found() {
    let api = spawn_api().await;
    let token = api.login(ADMIN_EMAIL).await;
    let response = api.client.get(api.url("/risks/no-such-risk")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(error_message(response).await.contains("not found"));
}
