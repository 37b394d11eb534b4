pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use service_core::axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, patch, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, RequestId},
};
use service_core::retry::RetryConfig;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MemberConfig;
use crate::middleware::SUBJECT_HEADER;
use crate::services::{
    AccessGate, AdminPromotionWorkflow, AuditTrail, BootstrapConfig, IdentityBootstrapper,
    ProfileService, ProfileStore, SeatAllocator,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: MemberConfig,
    pub store: Arc<dyn ProfileStore>,
    pub bootstrapper: IdentityBootstrapper,
    pub seats: SeatAllocator,
    pub gate: Arc<AccessGate>,
    pub promotions: AdminPromotionWorkflow,
    pub profiles: ProfileService,
}

impl AppState {
    /// Wire the engine over the given stores.
    pub fn new(
        config: MemberConfig,
        store: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditTrail>,
    ) -> Self {
        let bootstrapper = IdentityBootstrapper::new(
            store.clone(),
            BootstrapConfig {
                timeout: config.bootstrap.timeout(),
                retry: RetryConfig::quick(config.bootstrap.max_retries),
            },
        );
        let seats = SeatAllocator::new(store.clone(), config.seats.cohort_total);
        let promotions = AdminPromotionWorkflow::new(store.clone(), audit.clone(), seats.clone());
        let profiles = ProfileService::new(store.clone(), audit);

        Self {
            config,
            store,
            bootstrapper,
            seats,
            gate: Arc::new(AccessGate::default()),
            promotions,
            profiles,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/members/:id/promote",
            post(handlers::admin::promote),
        )
        .route("/admin/members/:id/demote", post(handlers::admin::demote))
        .route(
            "/admin/members/:id/remove-access",
            post(handlers::admin::remove_access),
        );

    let member_routes = Router::new()
        .route(
            "/members/me",
            patch(handlers::members::update_me).delete(handlers::members::close_account),
        )
        .route(
            "/members/me/onboarding",
            post(handlers::members::complete_onboarding),
        );

    let origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/session", get(handlers::session::get_session))
        .route("/gate/classify", post(handlers::gate::classify))
        .route("/seats", get(handlers::seats::get_seats))
        .merge(admin_routes)
        .merge(member_routes)
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outside the trace layer so the span sees the assigned request id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    HeaderName::from_static(SUBJECT_HEADER),
                ]),
        )
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up"
        }
    })))
}
