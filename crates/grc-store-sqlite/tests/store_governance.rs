// crates/grc-store-sqlite/tests/store_governance.rs
// ============================================================================
// Module: SQLite Governance Tests
// Description: Policy documents, vendors, and the processing register.
// Purpose: Validate document publication, vendor assessments, and archival.
// ============================================================================

//! ## Overview
//! Covers the governance stores against a real database:
//! - Version numbering, single published version, acknowledgement idempotence
//! - Document and vendor control mappings
//! - Assessment bookkeeping and cascading vendor deletion
//! - Processing register archival and metrics

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

use grc_core::ControlLibraryId;
use grc_core::DocumentId;
use grc_core::DocumentVersionId;
use grc_core::DocumentVersionStatus;
use grc_core::NewDocument;
use grc_core::NewDocumentVersion;
use grc_core::NewInternalTicket;
use grc_core::NewProcessingActivity;
use grc_core::NewVendor;
use grc_core::NewVendorAssessment;
use grc_core::ProcessingActivityUpdate;
use grc_core::RiskTier;
use grc_core::RopaStatus;
use grc_core::UserId;
use grc_core::VendorStatus;
use grc_core::VendorUpdate;
use grc_store_sqlite::SEED_USERS;
use grc_store_sqlite::SqliteGrcStore;
use grc_store_sqlite::SqliteStoreConfig;
use grc_store_sqlite::SqliteStoreError;
use grc_store_sqlite::seed::seed;
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

fn new_document() -> NewDocument {
    NewDocument {
        title: "Acceptable Use Policy".to_string(),
        category: "policy".to_string(),
        owner_id: SEED_USERS[0].id.to_string(),
    }
}

fn draft(body: &str) -> NewDocumentVersion {
    NewDocumentVersion {
        body_content: body.to_string(),
        change_description: None,
    }
}

fn new_vendor(name: &str) -> NewVendor {
    NewVendor {
        name: name.to_string(),
        category: "saas".to_string(),
        ..NewVendor::default()
    }
}

fn assessment(score: i64, day: time::Date) -> NewVendorAssessment {
    NewVendorAssessment {
        assessment_date: Some(day),
        overall_risk_score: score,
        ..NewVendorAssessment::default()
    }
}

fn new_activity(name: &str) -> NewProcessingActivity {
    NewProcessingActivity {
        activity_name: name.to_string(),
        data_controller_details: "Acme Ltd, dpo@acme.example".to_string(),
        data_categories: "contact details".to_string(),
        data_subject_categories: "customers".to_string(),
        ..NewProcessingActivity::default()
    }
}

// ============================================================================
// SECTION: Documents
// ============================================================================

#[test]
fn versions_are_numbered_per_document() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let first = store.create_document(&new_document(), NOW).unwrap();
    let second = store.create_document(&new_document(), NOW).unwrap();

    let v1 = store.create_document_version(&first.id, &admin(), &draft("one"), NOW).unwrap();
    let v2 = store.create_document_version(&first.id, &admin(), &draft("two"), NOW).unwrap();
    let other = store.create_document_version(&second.id, &admin(), &draft("x"), NOW).unwrap();

    assert_eq!((v1.version_number, v2.version_number), (1, 2));
    assert_eq!(other.version_number, 1);
    assert_eq!(v1.status, DocumentVersionStatus::Draft);

    let detail = store.get_document(&first.id).unwrap();
    let numbers: Vec<u32> = detail.versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![2, 1]);
    assert!(detail.document.published_version_id.is_none());
}

#[test]
fn publishing_archives_the_previous_published_version() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let document = store.create_document(&new_document(), NOW).unwrap();
    let v1 = store.create_document_version(&document.id, &admin(), &draft("one"), NOW).unwrap();
    let v2 = store.create_document_version(&document.id, &admin(), &draft("two"), NOW).unwrap();
    let v3 = store.create_document_version(&document.id, &admin(), &draft("three"), NOW).unwrap();

    store.publish_document_version(&document.id, &v1.id, NOW).unwrap();
    let later = NOW + Duration::days(1);
    let published = store.publish_document_version(&document.id, &v2.id, later).unwrap();
    assert_eq!(published.status, DocumentVersionStatus::Published);

    let detail = store.get_document(&document.id).unwrap();
    assert_eq!(detail.document.published_version_id.as_ref(), Some(&v2.id));
    assert_eq!(detail.document.updated_at, later);
    let status_of = |id: &DocumentVersionId| {
        detail.versions.iter().find(|v| &v.id == id).map(|v| v.status).unwrap()
    };
    assert_eq!(status_of(&v1.id), DocumentVersionStatus::Archived);
    assert_eq!(status_of(&v2.id), DocumentVersionStatus::Published);
    assert_eq!(status_of(&v3.id), DocumentVersionStatus::Draft);
    let published_count =
        detail.versions.iter().filter(|v| v.status == DocumentVersionStatus::Published).count();
    assert_eq!(published_count, 1);
}

#[test]
fn republishing_the_current_version_keeps_it_published() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let document = store.create_document(&new_document(), NOW).unwrap();
    let v1 = store.create_document_version(&document.id, &admin(), &draft("one"), NOW).unwrap();
    store.publish_document_version(&document.id, &v1.id, NOW).unwrap();
    let again = store.publish_document_version(&document.id, &v1.id, NOW).unwrap();
    assert_eq!(again.status, DocumentVersionStatus::Published);
}

#[test]
fn publishing_a_version_of_another_document_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let first = store.create_document(&new_document(), NOW).unwrap();
    let second = store.create_document(&new_document(), NOW).unwrap();
    let foreign = store.create_document_version(&second.id, &admin(), &draft("x"), NOW).unwrap();

    let err = store.publish_document_version(&first.id, &foreign.id, NOW).unwrap_err();
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
    let detail = store.get_document(&second.id).unwrap();
    assert_eq!(detail.versions[0].status, DocumentVersionStatus::Draft);
}

#[test]
fn versions_of_unknown_documents_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let err = store
        .create_document_version(&DocumentId::new("missing"), &admin(), &draft("x"), NOW)
        .unwrap_err();
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
    let err = store
        .create_document_version(&DocumentId::new("missing"), &admin(), &draft("   "), NOW)
        .unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn acknowledgements_are_counted_once_per_user() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let document = store.create_document(&new_document(), NOW).unwrap();
    let version = store.create_document_version(&document.id, &admin(), &draft("one"), NOW).unwrap();

    store.acknowledge_document_version(&version.id, &user(), NOW).unwrap();
    store.acknowledge_document_version(&version.id, &user(), NOW).unwrap();
    store.acknowledge_document_version(&version.id, &admin(), NOW).unwrap();

    let detail = store.get_document(&document.id).unwrap();
    assert_eq!(detail.versions[0].acknowledgement_count, 2);

    let err = store
        .acknowledge_document_version(&DocumentVersionId::new("missing"), &user(), NOW)
        .unwrap_err();
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
}

#[test]
fn document_mappings_are_idempotent_and_unmap_requires_a_mapping() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let document = store.create_document(&new_document(), NOW).unwrap();
    let control = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &admin(), 30, NOW)
        .unwrap();

    store.map_document_control(&document.id, &control.id, NOW).unwrap();
    store.map_document_control(&document.id, &control.id, NOW).unwrap();
    let mapped = store.list_document_controls(&document.id).unwrap();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].control_library_id.as_str(), "CIS-1.1");

    store.unmap_document_control(&document.id, &control.id).unwrap();
    let err = store.unmap_document_control(&document.id, &control.id).unwrap_err();
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
}

#[test]
fn tickets_link_only_to_existing_documents() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let document = store.create_document(&new_document(), NOW).unwrap();

    let linked = store
        .create_internal_ticket(
            &user(),
            &NewInternalTicket {
                title: "Clarify policy".to_string(),
                document_id: Some(document.id.clone()),
                ..NewInternalTicket::default()
            },
            NOW,
        )
        .unwrap();
    assert_eq!(store.get_ticket(&linked.id).unwrap().document_id, Some(document.id));

    let dangling = store.create_internal_ticket(
        &user(),
        &NewInternalTicket {
            title: "Dangling".to_string(),
            document_id: Some(DocumentId::new("missing")),
            ..NewInternalTicket::default()
        },
        NOW,
    );
    assert!(dangling.is_err());
}

// ============================================================================
// SECTION: Vendors
// ============================================================================

#[test]
fn vendors_default_to_medium_tier_and_active_status() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let vendor = store.create_vendor(&new_vendor("Zeta Hosting"), NOW).unwrap();
    store.create_vendor(&new_vendor("Acme Payroll"), NOW).unwrap();

    assert_eq!(vendor.risk_tier, RiskTier::Medium);
    assert_eq!(vendor.status, VendorStatus::Active);
    let names: Vec<String> = store.list_vendors().unwrap().into_iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["Acme Payroll".to_string(), "Zeta Hosting".to_string()]);
}

#[test]
fn vendor_updates_are_partial() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let created = store
        .create_vendor(
            &NewVendor {
                contact_email: Some("sales@acme.example".to_string()),
                contract_value: Some(12_000.0),
                ..new_vendor("Acme")
            },
            NOW,
        )
        .unwrap();

    let update = VendorUpdate {
        risk_tier: Some(RiskTier::Critical),
        status: Some(VendorStatus::UnderReview),
        ..VendorUpdate::default()
    };
    let updated = store.update_vendor(&created.id, &update, NOW + Duration::hours(1)).unwrap();
    assert_eq!(updated.risk_tier, RiskTier::Critical);
    assert_eq!(updated.status, VendorStatus::UnderReview);

    let stored = store.get_vendor(&created.id).unwrap();
    assert_eq!(stored.contact_email.as_deref(), Some("sales@acme.example"));
    assert_eq!(stored.contract_value, Some(12_000.0));
    assert_eq!(stored.updated_at, NOW + Duration::hours(1));
}

#[test]
fn assessments_advance_the_last_assessment_date() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let vendor = store.create_vendor(&new_vendor("Acme"), NOW).unwrap();

    let recent = store
        .create_vendor_assessment(&vendor.id, &admin(), &assessment(12, date!(2025 - 03 - 01)), NOW)
        .unwrap();
    assert_eq!(recent.assessor_id, admin());
    store
        .create_vendor_assessment(&vendor.id, &admin(), &assessment(20, date!(2024 - 11 - 15)), NOW)
        .unwrap();

    let stored = store.get_vendor(&vendor.id).unwrap();
    assert_eq!(stored.last_assessment_date, Some(date!(2025 - 03 - 01)));
    let dates: Vec<time::Date> = store
        .list_vendor_assessments(&vendor.id)
        .unwrap()
        .into_iter()
        .map(|a| a.assessment_date)
        .collect();
    assert_eq!(dates, vec![date!(2025 - 03 - 01), date!(2024 - 11 - 15)]);
}

#[test]
fn assessments_default_to_today_and_reject_bad_scores() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let vendor = store.create_vendor(&new_vendor("Acme"), NOW).unwrap();

    let request = NewVendorAssessment {
        overall_risk_score: 8,
        ..NewVendorAssessment::default()
    };
    let recorded = store.create_vendor_assessment(&vendor.id, &user(), &request, NOW).unwrap();
    assert_eq!(recorded.assessment_date, NOW.date());
    assert_eq!(recorded.assessor_id, user());

    let err = store
        .create_vendor_assessment(&vendor.id, &user(), &assessment(30, NOW.date()), NOW)
        .unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
    assert_eq!(store.list_vendor_assessments(&vendor.id).unwrap().len(), 1);
}

#[test]
fn deleting_a_vendor_removes_assessments_and_mappings() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let vendor = store.create_vendor(&new_vendor("Acme"), NOW).unwrap();
    let control = store
        .activate_control(&ControlLibraryId::new("CIS-1.1"), &admin(), 30, NOW)
        .unwrap();
    store
        .create_vendor_assessment(&vendor.id, &admin(), &assessment(5, NOW.date()), NOW)
        .unwrap();
    store.map_vendor_control(&vendor.id, &control.id, NOW).unwrap();
    store.map_vendor_control(&vendor.id, &control.id, NOW).unwrap();
    assert_eq!(store.list_vendor_controls(&vendor.id).unwrap().len(), 1);

    store.delete_vendor(&vendor.id).unwrap();
    assert!(matches!(store.get_vendor(&vendor.id), Err(SqliteStoreError::NotFound(_))));
    assert!(matches!(
        store.list_vendor_assessments(&vendor.id),
        Err(SqliteStoreError::NotFound(_))
    ));
    let err = store.unmap_vendor_control(&vendor.id, &control.id).unwrap_err();
    assert!(matches!(err, SqliteStoreError::NotFound(_)));
    assert!(matches!(store.delete_vendor(&vendor.id), Err(SqliteStoreError::NotFound(_))));
}

// ============================================================================
// SECTION: Processing Register
// ============================================================================

#[test]
fn archived_activities_leave_the_register_but_stay_counted() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let payroll = store.create_ropa(&new_activity("Payroll"), NOW).unwrap();
    let marketing = store
        .create_ropa(
            &NewProcessingActivity {
                status: Some(RopaStatus::Active),
                ..new_activity("Marketing")
            },
            NOW + Duration::minutes(1),
        )
        .unwrap();
    store.create_ropa(&new_activity("Recruiting"), NOW + Duration::minutes(2)).unwrap();
    assert_eq!(payroll.status, RopaStatus::Draft);

    store.archive_ropa(&payroll.id, NOW).unwrap();
    let names: Vec<String> =
        store.list_ropa().unwrap().into_iter().map(|entry| entry.activity_name).collect();
    assert_eq!(names, vec!["Recruiting".to_string(), "Marketing".to_string()]);
    assert_eq!(store.get_ropa(&payroll.id).unwrap().status, RopaStatus::Archived);

    let metrics = store.ropa_metrics().unwrap();
    assert_eq!(metrics.total_processing_activities, 3);
    assert_eq!(metrics.active, 1);
    assert_eq!(metrics.draft, 1);
    assert_eq!(metrics.archived, 1);
    assert_eq!(marketing.status, RopaStatus::Active);
}

#[test]
fn activity_updates_keep_untouched_fields() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let created = store.create_ropa(&new_activity("Payroll"), NOW).unwrap();
    let update = ProcessingActivityUpdate {
        retention_period: Some("7 years after employment".to_string()),
        ..ProcessingActivityUpdate::default()
    };
    let updated = store.update_ropa(&created.id, &update, NOW + Duration::days(2)).unwrap();
    assert_eq!(updated.data_categories, "contact details");
    assert_eq!(updated.retention_period.as_deref(), Some("7 years after employment"));
    assert_eq!(store.get_ropa(&created.id).unwrap().updated_at, NOW + Duration::days(2));

    let blank = ProcessingActivityUpdate {
        activity_name: Some(" ".to_string()),
        ..ProcessingActivityUpdate::default()
    };
    assert!(matches!(
        store.update_ropa(&created.id, &blank, NOW),
        Err(SqliteStoreError::Invalid(_))
    ));
}
