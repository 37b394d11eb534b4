//! Test helpers for member-service integration tests.
//!
//! Builds the full router over an in-memory store and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use member_service::{
    build_router,
    config::{BootstrapSettings, DatabaseConfig, Environment, MemberConfig, SeatConfig, SecurityConfig},
    models::{ProfileRecord, Role},
    services::MemoryStore,
    AppState,
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub fn test_config(cohort_total: u32) -> MemberConfig {
    MemberConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "member-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        seats: SeatConfig { cohort_total },
        bootstrap: BootstrapSettings {
            timeout_ms: 1000,
            max_retries: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cohort(50)
    }

    pub fn with_cohort(cohort_total: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(cohort_total), store.clone(), store.clone());
        Self {
            store,
            router: build_router(state),
        }
    }

    pub async fn seed(&self, role: Role) -> ProfileRecord {
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.role = role;
        profile.access_released = role.consumes_seat();
        self.store.seed(profile.clone()).await;
        profile
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        subject: Option<Uuid>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder
                .header(header::AUTHORIZATION, "Bearer test-session-token")
                .header("x-subject-id", subject.to_string());
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, subject: Option<Uuid>) -> (StatusCode, serde_json::Value) {
        self.send(Method::GET, uri, subject, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        subject: Option<Uuid>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(Method::POST, uri, subject, Some(body)).await
    }
}
