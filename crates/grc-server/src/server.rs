// crates/grc-server/src/server.rs
// ============================================================================
// Module: GRC Server
// Description: HTTP router assembly and process startup.
// Purpose: Wire configuration, store, service, scheduler, and axum together.
// Dependencies: axum, grc-config, grc-store-sqlite, tokio, tower-http, tracing
// ============================================================================

//! ## Overview
//! [`GrcServer::from_config`] validates configuration, opens the store, seeds
//! it when asked, and builds the [`GrcService`]. [`GrcServer::serve`] starts
//! the background jobs and serves the JSON API under `/api/v1` until the
//! listener fails. [`build_router`] is exposed so tests can serve the same
//! routes on an ephemeral port.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::http::Method;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use grc_config::GrcConfig;
use grc_store_sqlite::SqliteGrcStore;
use grc_store_sqlite::seed::seed;
use thiserror::Error;
use time::OffsetDateTime;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::SessionKeys;
use crate::email::EmailDispatcher;
use crate::handlers;
use crate::handlers::API_KEY_HEADER;
use crate::scheduler::Scheduler;
use crate::service::GrcService;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the API router over `service`.
///
/// The router expects peer addresses, so serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(service: Arc<GrcService>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/dashboard/summary", get(handlers::dashboard_summary))
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/{id}/read", post(handlers::mark_notification_read))
        .route("/audit/logs", get(handlers::audit_log))
        .route(
            "/controls/library",
            get(handlers::list_library).post(handlers::create_library_item),
        )
        .route("/controls/library/export", get(handlers::export_library))
        .route("/controls/library/import", post(handlers::import_library))
        .route(
            "/controls/library/{id}",
            get(handlers::get_library_item)
                .put(handlers::update_library_item)
                .delete(handlers::delete_library_item),
        )
        .route(
            "/controls/activated",
            get(handlers::list_active_controls).post(handlers::activate_control),
        )
        .route(
            "/controls/activated/{id}",
            get(handlers::get_control_detail).delete(handlers::retire_control),
        )
        .route("/controls/activated/{id}/evidence", post(handlers::submit_evidence))
        .route("/tickets", get(handlers::list_tickets))
        .route("/tickets/internal", post(handlers::create_internal_ticket))
        .route("/tickets/external", post(handlers::create_external_ticket))
        .route("/tickets/external/{customer_ref}", get(handlers::list_customer_tickets))
        .route("/tickets/{id}", get(handlers::get_ticket).put(handlers::update_ticket))
        .route("/tickets/{id}/comments", post(handlers::add_comment))
        .route("/assets", get(handlers::list_assets).post(handlers::create_asset))
        .route(
            "/assets/{id}",
            get(handlers::get_asset).put(handlers::update_asset).delete(handlers::delete_asset),
        )
        .route("/assets/{id}/controls", get(handlers::list_asset_controls))
        .route(
            "/mappings/asset-to-control",
            post(handlers::map_asset_control).delete(handlers::unmap_asset_control),
        )
        .route("/risks", get(handlers::list_risks).post(handlers::create_risk))
        .route(
            "/risks/{id}",
            get(handlers::get_risk).put(handlers::update_risk).delete(handlers::delete_risk),
        )
        .route("/risks/{id}/controls", get(handlers::list_risk_controls))
        .route(
            "/mappings/risk-to-control",
            post(handlers::map_risk_control).delete(handlers::unmap_risk_control),
        )
        .route("/documents", get(handlers::list_documents).post(handlers::create_document))
        .route("/documents/{id}", get(handlers::get_document))
        .route("/documents/{id}/versions", post(handlers::create_document_version))
        .route(
            "/documents/{id}/versions/{version_id}/publish",
            put(handlers::publish_document_version),
        )
        .route("/documents/{id}/controls", get(handlers::list_document_controls))
        .route("/versions/{id}/acknowledge", post(handlers::acknowledge_document_version))
        .route(
            "/mappings/document-to-control",
            post(handlers::map_document_control).delete(handlers::unmap_document_control),
        )
        .route("/vendors", get(handlers::list_vendors).post(handlers::create_vendor))
        .route(
            "/vendors/{id}",
            get(handlers::get_vendor).put(handlers::update_vendor).delete(handlers::delete_vendor),
        )
        .route(
            "/vendors/{id}/assessments",
            get(handlers::list_vendor_assessments).post(handlers::create_vendor_assessment),
        )
        .route("/vendors/{id}/controls", get(handlers::list_vendor_controls))
        .route(
            "/mappings/vendor-to-control",
            post(handlers::map_vendor_control).delete(handlers::unmap_vendor_control),
        )
        .route("/gdpr/dsr", get(handlers::list_dsrs).post(handlers::create_dsr))
        .route("/gdpr/dsr/public", post(handlers::submit_public_dsr))
        .route("/gdpr/dsr/{id}", get(handlers::get_dsr).put(handlers::update_dsr))
        .route("/gdpr/dsr/{id}/complete", put(handlers::complete_dsr))
        .route("/gdpr/ropa", get(handlers::list_ropa).post(handlers::create_ropa))
        .route(
            "/gdpr/ropa/{id}",
            get(handlers::get_ropa).put(handlers::update_ropa).delete(handlers::archive_ropa),
        )
        .route("/analytics/risk-distribution", get(handlers::risk_distribution))
        .route("/analytics/dsr-metrics", get(handlers::dsr_metrics))
        .route("/analytics/ropa-metrics", get(handlers::ropa_metrics))
        .route("/analytics/asset-breakdown", get(handlers::asset_breakdown));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static(API_KEY_HEADER)]);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured GRC API process.
pub struct GrcServer {
    /// Validated configuration.
    config: GrcConfig,
    /// Shared service.
    service: Arc<GrcService>,
}

impl GrcServer {
    /// Opens the store and builds the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GrcServerError`] when configuration is invalid or the store,
    /// seed data, or email transport cannot be initialized.
    pub fn from_config(config: GrcConfig) -> Result<Self, GrcServerError> {
        config.validate().map_err(|err| GrcServerError::Config(err.to_string()))?;
        let store = open_store(&config)?;
        if config.seed.on_startup {
            let report =
                seed(&store, OffsetDateTime::now_utc()).map_err(|err| GrcServerError::Init(err.to_string()))?;
            info!(
                users = report.users_inserted,
                controls = report.controls_inserted,
                "seed data applied"
            );
        }
        let keys = SessionKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_days);
        let email =
            EmailDispatcher::from_config(&config.email).map_err(|err| GrcServerError::Init(err.to_string()))?;
        let service = GrcService::new(store, keys, config.auth.external_api_key.clone(), email);
        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }

    /// Returns the shared service.
    #[must_use]
    pub fn service(&self) -> Arc<GrcService> {
        Arc::clone(&self.service)
    }

    /// Starts the scheduler and serves HTTP until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`GrcServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), GrcServerError> {
        let addr = self.config.server.bind_addr().map_err(|err| GrcServerError::Config(err.to_string()))?;
        let _jobs = if self.config.scheduler.enabled {
            Scheduler::new(Arc::clone(&self.service)).spawn()
        } else {
            info!("scheduler disabled");
            Vec::new()
        };
        let app = build_router(Arc::clone(&self.service), self.config.server.max_body_bytes);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| GrcServerError::Transport(format!("http bind failed: {err}")))?;
        info!(%addr, "grc api listening");
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| GrcServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Opens the configured store.
///
/// # Errors
///
/// Returns [`GrcServerError::Init`] when the database cannot be opened.
pub fn open_store(config: &GrcConfig) -> Result<SqliteGrcStore, GrcServerError> {
    SqliteGrcStore::new(&config.store.to_sqlite_config()).map_err(|err| GrcServerError::Init(err.to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, Error)]
pub enum GrcServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
