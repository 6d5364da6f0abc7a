// crates/grc-core/src/lib.rs
// ============================================================================
// Module: GRC Core Library
// Description: Public API surface for the GRC domain model.
// Purpose: Expose identifiers, domain records, errors, and review arithmetic.
// Dependencies: crate::{identifiers, error, dates, controls, ...}
// ============================================================================

//! ## Overview
//! GRC core holds the storage-agnostic vocabulary of the compliance back
//! office: controls and their evidence, tickets, notifications, audit events,
//! assets, risks, policy documents, vendors, GDPR data-subject requests, and
//! the record of processing activities. It also owns the small
//! amount of arithmetic the system depends on (review due dates, overdue
//! windows, risk scores, compliance rates) so the store and the request layer
//! share one definition.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assets;
pub mod audit;
pub mod controls;
pub mod dashboard;
pub mod dates;
pub mod documents;
pub mod dsr;
pub mod error;
pub mod identifiers;
pub mod notifications;
pub mod risks;
pub mod ropa;
pub mod tickets;
pub mod users;
pub mod vendors;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assets::Asset;
pub use assets::AssetBreakdown;
pub use assets::AssetControlLink;
pub use assets::AssetControlView;
pub use assets::AssetStatus;
pub use assets::AssetUpdate;
pub use assets::CountBucket;
pub use assets::NewAsset;
pub use audit::AuditAction;
pub use audit::AuditLogEntry;
pub use audit::AuditQuery;
pub use audit::EntityType;
pub use audit::NewAuditEntry;
pub use controls::ActivateControlRequest;
pub use controls::ActivatedControl;
pub use controls::ActiveControlView;
pub use controls::ComplianceStatus;
pub use controls::ControlDetail;
pub use controls::ControlLibraryItem;
pub use controls::ControlScanHit;
pub use controls::ControlStatus;
pub use controls::EvidenceRecord;
pub use controls::EvidenceSubmission;
pub use controls::ImportSummary;
pub use controls::LibraryExport;
pub use controls::LibraryImportRequest;
pub use controls::LibraryItemFields;
pub use dashboard::AssetStats;
pub use dashboard::ControlStats;
pub use dashboard::DashboardSummary;
pub use dashboard::TicketStats;
pub use dashboard::WeeklyStats;
pub use documents::Document;
pub use documents::DocumentControlLink;
pub use documents::DocumentControlView;
pub use documents::DocumentDetail;
pub use documents::DocumentVersion;
pub use documents::DocumentVersionStatus;
pub use documents::NewDocument;
pub use documents::NewDocumentVersion;
pub use dsr::DataSubjectRequest;
pub use dsr::DsrCompletion;
pub use dsr::DsrMetrics;
pub use dsr::DsrPriority;
pub use dsr::DsrRequestType;
pub use dsr::DsrStatus;
pub use dsr::DsrUpdate;
pub use dsr::NewDsr;
pub use error::ErrorKind;
pub use error::GrcError;
pub use error::GrcResult;
pub use identifiers::ActivatedControlId;
pub use identifiers::AssetId;
pub use identifiers::CommentId;
pub use identifiers::ControlLibraryId;
pub use identifiers::DocumentId;
pub use identifiers::DocumentVersionId;
pub use identifiers::DsrId;
pub use identifiers::EvidenceId;
pub use identifiers::NotificationId;
pub use identifiers::RiskId;
pub use identifiers::RopaId;
pub use identifiers::TicketId;
pub use identifiers::UserId;
pub use identifiers::VendorAssessmentId;
pub use identifiers::VendorId;
pub use notifications::NewNotification;
pub use notifications::Notification;
pub use risks::NewRisk;
pub use risks::Risk;
pub use risks::RiskControlLink;
pub use risks::RiskControlView;
pub use risks::RiskStatus;
pub use risks::RiskUpdate;
pub use risks::Severity;
pub use risks::SeverityCount;
pub use ropa::NewProcessingActivity;
pub use ropa::ProcessingActivity;
pub use ropa::ProcessingActivityUpdate;
pub use ropa::RopaMetrics;
pub use ropa::RopaStatus;
pub use tickets::NewComment;
pub use tickets::NewExternalTicket;
pub use tickets::NewInternalTicket;
pub use tickets::Ticket;
pub use tickets::TicketComment;
pub use tickets::TicketDetail;
pub use tickets::TicketStatus;
pub use tickets::TicketType;
pub use tickets::TicketUpdate;
pub use users::LoginRequest;
pub use users::Role;
pub use users::User;
pub use vendors::AssessmentScores;
pub use vendors::AssessmentStatus;
pub use vendors::NewVendor;
pub use vendors::NewVendorAssessment;
pub use vendors::RiskTier;
pub use vendors::Vendor;
pub use vendors::VendorAssessment;
pub use vendors::VendorControlLink;
pub use vendors::VendorControlView;
pub use vendors::VendorStatus;
pub use vendors::VendorUpdate;
