// crates/grc-server/src/handlers.rs
// ============================================================================
// Module: HTTP Handlers
// Description: axum handlers translating HTTP requests into service calls.
// Purpose: Decode requests, build request contexts, and encode responses.
// Dependencies: axum, grc-core, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Handlers are thin: they authenticate the `Authorization` header, decode the
//! path, query, and JSON body, run the synchronous service operation off the
//! async executor, and map the outcome to a status code. Every failure is
//! rendered as `{"error": message}` by [`ApiError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use grc_core::ActivateControlRequest;
use grc_core::ActivatedControl;
use grc_core::ActivatedControlId;
use grc_core::ActiveControlView;
use grc_core::Asset;
use grc_core::AssetBreakdown;
use grc_core::AssetControlLink;
use grc_core::AssetControlView;
use grc_core::AssetId;
use grc_core::AssetUpdate;
use grc_core::AuditLogEntry;
use grc_core::AuditQuery;
use grc_core::ControlDetail;
use grc_core::ControlLibraryId;
use grc_core::ControlLibraryItem;
use grc_core::DashboardSummary;
use grc_core::DataSubjectRequest;
use grc_core::Document;
use grc_core::DocumentControlLink;
use grc_core::DocumentControlView;
use grc_core::DocumentDetail;
use grc_core::DocumentId;
use grc_core::DocumentVersion;
use grc_core::DocumentVersionId;
use grc_core::DsrCompletion;
use grc_core::DsrId;
use grc_core::DsrMetrics;
use grc_core::DsrUpdate;
use grc_core::ErrorKind;
use grc_core::EvidenceRecord;
use grc_core::EvidenceSubmission;
use grc_core::GrcError;
use grc_core::ImportSummary;
use grc_core::LibraryExport;
use grc_core::LibraryImportRequest;
use grc_core::LibraryItemFields;
use grc_core::LoginRequest;
use grc_core::NewAsset;
use grc_core::NewComment;
use grc_core::NewDocument;
use grc_core::NewDocumentVersion;
use grc_core::NewDsr;
use grc_core::NewExternalTicket;
use grc_core::NewInternalTicket;
use grc_core::NewProcessingActivity;
use grc_core::NewRisk;
use grc_core::NewVendor;
use grc_core::NewVendorAssessment;
use grc_core::Notification;
use grc_core::NotificationId;
use grc_core::ProcessingActivity;
use grc_core::ProcessingActivityUpdate;
use grc_core::Risk;
use grc_core::RiskControlLink;
use grc_core::RiskControlView;
use grc_core::RiskId;
use grc_core::RiskUpdate;
use grc_core::RopaId;
use grc_core::RopaMetrics;
use grc_core::SeverityCount;
use grc_core::Ticket;
use grc_core::TicketComment;
use grc_core::TicketDetail;
use grc_core::TicketId;
use grc_core::TicketUpdate;
use grc_core::Vendor;
use grc_core::VendorAssessment;
use grc_core::VendorControlLink;
use grc_core::VendorControlView;
use grc_core::VendorId;
use grc_core::VendorUpdate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::runtime::RuntimeFlavor;
use tracing::error;

use crate::auth::RequestContext;
use crate::service::GrcService;
use crate::service::LoginResponse;
use crate::service::StatusResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the partner API key.
pub const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP rendering of a [`GrcError`].
#[derive(Debug)]
pub struct ApiError(GrcError);

impl From<GrcError> for ApiError {
    fn from(error: GrcError) -> Self {
        Self(error)
    }
}

/// Maps an error kind to its HTTP status.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let message = if kind == ErrorKind::Internal {
            error!(error = %self.0.message(), "internal error");
            "internal error".to_string()
        } else {
            self.0.message().to_string()
        };
        (status_for(kind), Json(json!({ "error": message }))).into_response()
    }
}

/// Handler result carrying a status code and JSON body.
type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Wraps a value in a 200 response.
fn ok<T>(value: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(value)))
}

/// Wraps a value in a 201 response.
fn created<T>(value: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(value)))
}

// ============================================================================
// SECTION: Request Helpers
// ============================================================================

/// Shared handler state.
pub type AppState = Arc<GrcService>;

/// Runs a blocking store operation without stalling the async executor.
fn blocking<T>(operation: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(operation)
        }
        _ => operation(),
    }
}

/// Builds the request context from the peer and the `Authorization` header.
fn request_context(
    service: &GrcService,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Result<RequestContext, ApiError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| GrcError::unauthorized("invalid authorization header")))
        .transpose()?;
    let user = service.authenticate(authorization)?;
    Ok(RequestContext {
        user,
        ip_address: Some(peer.ip().to_string()),
        now: OffsetDateTime::now_utc(),
    })
}

/// Builds an unauthenticated context for public endpoints.
fn public_context(peer: SocketAddr) -> RequestContext {
    RequestContext::anonymous(OffsetDateTime::now_utc()).with_ip(peer.ip().to_string())
}

/// Returns the partner API key header, if present and readable.
fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok())
}

/// Decodes a JSON request body.
fn parse_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GrcError::validation("request body too large")
        } else {
            GrcError::validation("invalid request body")
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|_| ApiError(GrcError::validation("invalid request body")))
}

/// Unwraps a query string, rejecting malformed parameters.
fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|_| ApiError(GrcError::validation("invalid query parameters")))
}

// ============================================================================
// SECTION: Health and Session
// ============================================================================

/// Liveness check that also reads the store.
pub async fn health(State(service): State<AppState>) -> ApiResult<StatusResponse> {
    blocking(|| service.store().ping()).map_err(|err| ApiError(err.into()))?;
    ok(StatusResponse::new("ok"))
}

/// `POST /auth/login`
pub async fn login(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<LoginResponse> {
    let ctx = public_context(peer);
    let request: LoginRequest = parse_body(body)?;
    ok(blocking(|| service.login(&ctx, &request))?)
}

// ============================================================================
// SECTION: Dashboard, Notifications, Audit
// ============================================================================

/// Query string of the notification list.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// Only return unread notifications.
    #[serde(default)]
    pub unread: bool,
}

/// `GET /dashboard/summary`
pub async fn dashboard_summary(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<DashboardSummary> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.dashboard_summary(&ctx))?)
}

/// `GET /notifications`
pub async fn list_notifications(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Vec<Notification>> {
    let ctx = request_context(&service, peer, &headers)?;
    let query = parse_query(query)?;
    ok(blocking(|| service.list_notifications(&ctx, query.unread))?)
}

/// `POST /notifications/{id}/read`
pub async fn mark_notification_read(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.mark_notification_read(&ctx, &NotificationId::new(id)))?)
}

/// `GET /audit/logs`
pub async fn audit_log(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let ctx = request_context(&service, peer, &headers)?;
    let query = parse_query(query)?;
    ok(blocking(|| service.audit_log(&ctx, &query))?)
}

// ============================================================================
// SECTION: Control Library
// ============================================================================

/// `GET /controls/library`
pub async fn list_library(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<ControlLibraryItem>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_library(&ctx))?)
}

/// `POST /controls/library`
pub async fn create_library_item(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ControlLibraryItem> {
    let ctx = request_context(&service, peer, &headers)?;
    let item: ControlLibraryItem = parse_body(body)?;
    created(blocking(|| service.create_library_item(&ctx, item))?)
}

/// `GET /controls/library/{id}`
pub async fn get_library_item(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ControlLibraryItem> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_library_item(&ctx, &ControlLibraryId::new(id)))?)
}

/// `PUT /controls/library/{id}`
pub async fn update_library_item(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ControlLibraryItem> {
    let ctx = request_context(&service, peer, &headers)?;
    let fields: LibraryItemFields = parse_body(body)?;
    ok(blocking(|| service.update_library_item(&ctx, ControlLibraryId::new(id), fields))?)
}

/// `DELETE /controls/library/{id}`
pub async fn delete_library_item(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.delete_library_item(&ctx, &ControlLibraryId::new(id)))?)
}

/// `POST /controls/library/import`
pub async fn import_library(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ImportSummary> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: LibraryImportRequest = parse_body(body)?;
    ok(blocking(|| service.import_library(&ctx, &request))?)
}

/// `GET /controls/library/export`
pub async fn export_library(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<LibraryExport> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.export_library(&ctx))?)
}

// ============================================================================
// SECTION: Activated Controls
// ============================================================================

/// `GET /controls/activated`
pub async fn list_active_controls(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<ActiveControlView>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_active_controls(&ctx))?)
}

/// `POST /controls/activated`
pub async fn activate_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ActivatedControl> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: ActivateControlRequest = parse_body(body)?;
    created(blocking(|| service.activate_control(&ctx, &request))?)
}

/// `GET /controls/activated/{id}`
pub async fn get_control_detail(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ControlDetail> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_control_detail(&ctx, &ActivatedControlId::new(id)))?)
}

/// `DELETE /controls/activated/{id}`
pub async fn retire_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.retire_control(&ctx, &ActivatedControlId::new(id)))?)
}

/// `POST /controls/activated/{id}/evidence`
pub async fn submit_evidence(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<EvidenceRecord> {
    let ctx = request_context(&service, peer, &headers)?;
    let submission: EvidenceSubmission = parse_body(body)?;
    created(blocking(|| service.submit_evidence(&ctx, &ActivatedControlId::new(id), &submission))?)
}

// ============================================================================
// SECTION: Tickets
// ============================================================================

/// Query string of the ticket list.
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    /// Optional `internal` or `external` filter.
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
}

/// `POST /tickets/external`
pub async fn create_external_ticket(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Ticket> {
    let ctx = public_context(peer);
    let key = api_key(&headers);
    let request: NewExternalTicket = parse_body(body)?;
    created(blocking(|| service.create_external_ticket(&ctx, key, &request))?)
}

/// `GET /tickets/external/{customer_ref}`
pub async fn list_customer_tickets(
    State(service): State<AppState>,
    headers: HeaderMap,
    Path(customer_ref): Path<String>,
) -> ApiResult<Vec<Ticket>> {
    let key = api_key(&headers);
    ok(blocking(|| service.list_customer_tickets(key, &customer_ref))?)
}

/// `GET /tickets`
pub async fn list_tickets(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<TicketQuery>, QueryRejection>,
) -> ApiResult<Vec<Ticket>> {
    let ctx = request_context(&service, peer, &headers)?;
    let query = parse_query(query)?;
    ok(blocking(|| service.list_tickets(&ctx, query.ticket_type.as_deref()))?)
}

/// `POST /tickets/internal`
pub async fn create_internal_ticket(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Ticket> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewInternalTicket = parse_body(body)?;
    created(blocking(|| service.create_internal_ticket(&ctx, &request))?)
}

/// `GET /tickets/{id}`
pub async fn get_ticket(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<TicketDetail> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_ticket(&ctx, &TicketId::new(id)))?)
}

/// `PUT /tickets/{id}`
pub async fn update_ticket(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Ticket> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: TicketUpdate = parse_body(body)?;
    ok(blocking(|| service.update_ticket(&ctx, &TicketId::new(id), &update))?)
}

/// `POST /tickets/{id}/comments`
pub async fn add_comment(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<TicketComment> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewComment = parse_body(body)?;
    created(blocking(|| service.add_comment(&ctx, &TicketId::new(id), &request))?)
}

// ============================================================================
// SECTION: Assets
// ============================================================================

/// `GET /assets`
pub async fn list_assets(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<Asset>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_assets(&ctx))?)
}

/// `POST /assets`
pub async fn create_asset(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Asset> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewAsset = parse_body(body)?;
    created(blocking(|| service.create_asset(&ctx, &request))?)
}

/// `GET /assets/{id}`
pub async fn get_asset(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Asset> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_asset(&ctx, &AssetId::new(id)))?)
}

/// `PUT /assets/{id}`
pub async fn update_asset(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Asset> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: AssetUpdate = parse_body(body)?;
    ok(blocking(|| service.update_asset(&ctx, &AssetId::new(id), &update))?)
}

/// `DELETE /assets/{id}`
pub async fn delete_asset(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.delete_asset(&ctx, &AssetId::new(id)))?)
}

/// `GET /assets/{id}/controls`
pub async fn list_asset_controls(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<AssetControlView>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_asset_controls(&ctx, &AssetId::new(id)))?)
}

/// `POST /mappings/asset-to-control`
pub async fn map_asset_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: AssetControlLink = parse_body(body)?;
    created(blocking(|| service.map_asset_control(&ctx, &link))?)
}

/// `DELETE /mappings/asset-to-control`
pub async fn unmap_asset_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: AssetControlLink = parse_body(body)?;
    ok(blocking(|| service.unmap_asset_control(&ctx, &link))?)
}

// ============================================================================
// SECTION: Risks
// ============================================================================

/// `GET /risks`
pub async fn list_risks(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<Risk>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_risks(&ctx))?)
}

/// `POST /risks`
pub async fn create_risk(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Risk> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewRisk = parse_body(body)?;
    created(blocking(|| service.create_risk(&ctx, &request))?)
}

/// `GET /risks/{id}`
pub async fn get_risk(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Risk> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_risk(&ctx, &RiskId::new(id)))?)
}

/// `PUT /risks/{id}`
pub async fn update_risk(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Risk> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: RiskUpdate = parse_body(body)?;
    ok(blocking(|| service.update_risk(&ctx, &RiskId::new(id), &update))?)
}

/// `DELETE /risks/{id}`
pub async fn delete_risk(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.delete_risk(&ctx, &RiskId::new(id)))?)
}

/// `GET /risks/{id}/controls`
pub async fn list_risk_controls(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<RiskControlView>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_risk_controls(&ctx, &RiskId::new(id)))?)
}

/// `POST /mappings/risk-to-control`
pub async fn map_risk_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: RiskControlLink = parse_body(body)?;
    created(blocking(|| service.map_risk_control(&ctx, &link))?)
}

/// `DELETE /mappings/risk-to-control`
pub async fn unmap_risk_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: RiskControlLink = parse_body(body)?;
    ok(blocking(|| service.unmap_risk_control(&ctx, &link))?)
}

// ============================================================================
// SECTION: Data-Subject Requests
// ============================================================================

/// `POST /gdpr/dsr/public`
pub async fn submit_public_dsr(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DataSubjectRequest> {
    let ctx = public_context(peer);
    let request: NewDsr = parse_body(body)?;
    created(blocking(|| service.submit_public_dsr(&ctx, &request))?)
}

/// `GET /gdpr/dsr`
pub async fn list_dsrs(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<DataSubjectRequest>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_dsrs(&ctx))?)
}

/// `POST /gdpr/dsr`
pub async fn create_dsr(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DataSubjectRequest> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewDsr = parse_body(body)?;
    created(blocking(|| service.create_dsr(&ctx, &request))?)
}

/// `GET /gdpr/dsr/{id}`
pub async fn get_dsr(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DataSubjectRequest> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_dsr(&ctx, &DsrId::new(id)))?)
}

/// `PUT /gdpr/dsr/{id}`
pub async fn update_dsr(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DataSubjectRequest> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: DsrUpdate = parse_body(body)?;
    ok(blocking(|| service.update_dsr(&ctx, &DsrId::new(id), &update))?)
}

/// `PUT /gdpr/dsr/{id}/complete`
pub async fn complete_dsr(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DataSubjectRequest> {
    let ctx = request_context(&service, peer, &headers)?;
    let completion: DsrCompletion = parse_body(body)?;
    ok(blocking(|| service.complete_dsr(&ctx, &DsrId::new(id), &completion))?)
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// `GET /documents`
pub async fn list_documents(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<Document>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_documents(&ctx))?)
}

/// `POST /documents`
pub async fn create_document(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Document> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewDocument = parse_body(body)?;
    created(blocking(|| service.create_document(&ctx, &request))?)
}

/// `GET /documents/{id}`
pub async fn get_document(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DocumentDetail> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_document(&ctx, &DocumentId::new(id)))?)
}

/// `POST /documents/{id}/versions`
pub async fn create_document_version(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DocumentVersion> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewDocumentVersion = parse_body(body)?;
    let document_id = DocumentId::new(id);
    created(blocking(|| service.create_document_version(&ctx, &document_id, &request))?)
}

/// `PUT /documents/{id}/versions/{version_id}/publish`
pub async fn publish_document_version(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let document_id = DocumentId::new(id);
    let version_id = DocumentVersionId::new(version_id);
    ok(blocking(|| service.publish_document_version(&ctx, &document_id, &version_id))?)
}

/// `POST /versions/{id}/acknowledge`
pub async fn acknowledge_document_version(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.acknowledge_document_version(&ctx, &DocumentVersionId::new(id)))?)
}

/// `GET /documents/{id}/controls`
pub async fn list_document_controls(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<DocumentControlView>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_document_controls(&ctx, &DocumentId::new(id)))?)
}

/// `POST /mappings/document-to-control`
pub async fn map_document_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: DocumentControlLink = parse_body(body)?;
    created(blocking(|| service.map_document_control(&ctx, &link))?)
}

/// `DELETE /mappings/document-to-control`
pub async fn unmap_document_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: DocumentControlLink = parse_body(body)?;
    ok(blocking(|| service.unmap_document_control(&ctx, &link))?)
}

// ============================================================================
// SECTION: Vendors
// ============================================================================

/// `GET /vendors`
pub async fn list_vendors(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<Vendor>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_vendors(&ctx))?)
}

/// `POST /vendors`
pub async fn create_vendor(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Vendor> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewVendor = parse_body(body)?;
    created(blocking(|| service.create_vendor(&ctx, &request))?)
}

/// `GET /vendors/{id}`
pub async fn get_vendor(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vendor> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_vendor(&ctx, &VendorId::new(id)))?)
}

/// `PUT /vendors/{id}`
pub async fn update_vendor(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: VendorUpdate = parse_body(body)?;
    ok(blocking(|| service.update_vendor(&ctx, &VendorId::new(id), &update))?)
}

/// `DELETE /vendors/{id}`
pub async fn delete_vendor(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.delete_vendor(&ctx, &VendorId::new(id)))?)
}

/// `GET /vendors/{id}/assessments`
pub async fn list_vendor_assessments(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<VendorAssessment>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_vendor_assessments(&ctx, &VendorId::new(id)))?)
}

/// `POST /vendors/{id}/assessments`
pub async fn create_vendor_assessment(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<VendorAssessment> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewVendorAssessment = parse_body(body)?;
    let vendor_id = VendorId::new(id);
    created(blocking(|| service.create_vendor_assessment(&ctx, &vendor_id, &request))?)
}

/// `GET /vendors/{id}/controls`
pub async fn list_vendor_controls(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<VendorControlView>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_vendor_controls(&ctx, &VendorId::new(id)))?)
}

/// `POST /mappings/vendor-to-control`
pub async fn map_vendor_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: VendorControlLink = parse_body(body)?;
    created(blocking(|| service.map_vendor_control(&ctx, &link))?)
}

/// `DELETE /mappings/vendor-to-control`
pub async fn unmap_vendor_control(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    let link: VendorControlLink = parse_body(body)?;
    ok(blocking(|| service.unmap_vendor_control(&ctx, &link))?)
}

// ============================================================================
// SECTION: Processing Register
// ============================================================================

/// `GET /gdpr/ropa`
pub async fn list_ropa(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<ProcessingActivity>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.list_ropa(&ctx))?)
}

/// `POST /gdpr/ropa`
pub async fn create_ropa(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ProcessingActivity> {
    let ctx = request_context(&service, peer, &headers)?;
    let request: NewProcessingActivity = parse_body(body)?;
    created(blocking(|| service.create_ropa(&ctx, &request))?)
}

/// `GET /gdpr/ropa/{id}`
pub async fn get_ropa(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ProcessingActivity> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.get_ropa(&ctx, &RopaId::new(id)))?)
}

/// `PUT /gdpr/ropa/{id}`
pub async fn update_ropa(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ProcessingActivity> {
    let ctx = request_context(&service, peer, &headers)?;
    let update: ProcessingActivityUpdate = parse_body(body)?;
    ok(blocking(|| service.update_ropa(&ctx, &RopaId::new(id), &update))?)
}

/// `DELETE /gdpr/ropa/{id}`
pub async fn archive_ropa(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.archive_ropa(&ctx, &RopaId::new(id)))?)
}

// ============================================================================
// SECTION: Analytics
// ============================================================================

/// `GET /analytics/risk-distribution`
pub async fn risk_distribution(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Vec<SeverityCount>> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.risk_distribution(&ctx))?)
}

/// `GET /analytics/dsr-metrics`
pub async fn dsr_metrics(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<DsrMetrics> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.dsr_metrics(&ctx))?)
}

/// `GET /analytics/ropa-metrics`
pub async fn ropa_metrics(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<RopaMetrics> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.ropa_metrics(&ctx))?)
}

/// `GET /analytics/asset-breakdown`
pub async fn asset_breakdown(
    State(service): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<AssetBreakdown> {
    let ctx = request_context(&service, peer, &headers)?;
    ok(blocking(|| service.asset_breakdown(&ctx))?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
