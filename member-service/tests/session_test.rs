mod common;

use axum::http::StatusCode;
use common::TestApp;
use member_service::models::Role;
use uuid::Uuid;

#[tokio::test]
async fn anonymous_session_touches_no_store() {
    let app = TestApp::new();

    let (status, body) = app.get("/session", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unauthenticated");
    assert!(body.get("profile").is_none());
    assert_eq!(app.store.store_calls(), 0);
}

#[tokio::test]
async fn first_session_provisions_exactly_one_profile() {
    let app = TestApp::new();
    let subject = Uuid::new_v4();

    let (status, body) = app.get("/session", Some(subject)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["profile"]["role"], "awaiting_approval");
    assert_eq!(body["access"]["is_awaiting_approval"], true);
    assert_eq!(body["access"]["may_use_app"], false);

    let (_, again) = app.get("/session", Some(subject)).await;
    assert_eq!(again["profile"]["id"], subject.to_string());
    assert_eq!(app.store.profile_count().await, 1);
}

#[tokio::test]
async fn existing_member_gets_access_summary() {
    let app = TestApp::new();
    let founder = app.seed(Role::Founder).await;

    let (_, body) = app.get("/session", Some(founder.id)).await;

    assert_eq!(body["profile"]["role"], "founder");
    assert_eq!(body["access"]["may_use_app"], true);
    assert_eq!(body["access"]["may_moderate"], true);
    assert_eq!(body["access"]["is_top_admin"], false);
    assert_eq!(body["access"]["must_complete_leadership_onboarding"], true);
}

#[tokio::test]
async fn outage_reports_unresolved_not_an_error() {
    let app = TestApp::new();
    app.store.fail_next_fetches(10);

    let (status, body) = app.get("/session", Some(Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unresolved");
}

#[tokio::test]
async fn token_without_subject_is_unauthorized() {
    use axum::{body::Body, http::Request};
    use tower::util::ServiceExt;

    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/session")
                .header("authorization", "Bearer orphan-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
