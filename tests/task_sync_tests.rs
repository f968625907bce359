mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{USER, spawn_app, spawn_app_with, token_body, user_request};
use serde_json::json;
use std::time::Duration as StdDuration;
use wiremock::matchers::{any, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn task_body(sync: bool) -> serde_json::Value {
    json!({
        "text": "Call the plumber",
        "date": "2024-06-03",
        "important": true,
        "sync_to_calendar": sync,
    })
}

#[tokio::test]
async fn expired_credential_is_refreshed_before_the_event_is_created() {
    let app = spawn_app().await;
    let before = app
        .seed_credential("A1", Some("R1"), Utc::now() - Duration::hours(1))
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .and(body_string_contains("client_secret=client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", None, 3600)))
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer A2"))
        .and(body_string_contains(r#""start":{"date":"2024-06-03"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
        .expect(1)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "synced");
    assert_eq!(body["calendar_sync"]["remote_event_id"], "evt-1");
    assert_eq!(body["task"]["remote_event_id"], "evt-1");

    let after = app
        .credentials
        .get(USER)
        .await
        .expect("get credential")
        .expect("credential kept");
    assert_eq!(after.access_token, "A2");
    // provider did not re-issue one, so the old refresh token stays
    assert_eq!(after.refresh_token.as_deref(), Some("R1"));
    assert!(after.expires_at > Utc::now());
    assert!(after.expires_at > before.expires_at);
}

#[tokio::test]
async fn not_connected_user_saves_without_any_provider_call() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "not_connected");
    assert!(body["task"]["remote_event_id"].is_null());
    assert_eq!(body["task"]["text"], "Call the plumber");
}

#[tokio::test]
async fn revoked_refresh_token_aborts_sync_but_keeps_task_and_credential() {
    let app = spawn_app().await;
    let before = app
        .seed_credential("A1", Some("revoked"), Utc::now() - Duration::minutes(5))
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "never"})))
        .expect(0)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "failed");
    assert_eq!(body["calendar_sync"]["stage"], "refresh");
    assert!(
        body["calendar_sync"]["warning"]
            .as_str()
            .expect("warning")
            .contains("not added to your calendar")
    );
    assert!(body["task"]["remote_event_id"].is_null());

    let after = app.credentials.get(USER).await.expect("get credential");
    assert_eq!(after, Some(before));
}

#[tokio::test]
async fn timed_out_refresh_is_attempted_once() {
    let app = spawn_app_with(|cfg| cfg.sync.request_timeout_secs = 1).await;
    let before = app
        .seed_credential("A1", Some("R1"), Utc::now() - Duration::hours(1))
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("A2", None, 3600))
                .set_delay(StdDuration::from_secs(3)),
        )
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "never"})))
        .expect(0)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "failed");
    assert_eq!(body["calendar_sync"]["stage"], "refresh");
    assert!(body["task"]["remote_event_id"].is_null());
    assert_eq!(app.credentials.get(USER).await.expect("get"), Some(before));
}

#[tokio::test]
async fn expired_credential_without_refresh_token_is_left_alone() {
    let app = spawn_app().await;
    let before = app
        .seed_credential("A1", None, Utc::now() - Duration::seconds(1))
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["stage"], "refresh");
    assert_eq!(app.credentials.get(USER).await.expect("get"), Some(before));
}

#[tokio::test]
async fn fresh_token_is_used_as_is() {
    let app = spawn_app().await;
    app.seed_credential("A1", Some("R1"), Utc::now() + Duration::hours(1))
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", None, 3600)))
        .expect(0)
        .mount(&app.provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-9"})))
        .expect(1)
        .mount(&app.provider)
        .await;

    let (_, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(body["task"]["remote_event_id"], "evt-9");
}

#[tokio::test]
async fn failed_event_creation_leaves_the_task_as_saved() {
    let app = spawn_app().await;
    app.seed_credential("A1", Some("R1"), Utc::now() + Duration::hours(1))
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .expect(1)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(true))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "failed");
    assert_eq!(body["calendar_sync"]["stage"], "event");

    let id = body["task"]["id"].as_i64().expect("task id");
    let (status, stored) = app
        .send(user_request("GET", &format!("/tasks/{id}"), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, body["task"]);
    assert!(stored["remote_event_id"].is_null());
    assert_eq!(stored["important"], true);
    assert_eq!(stored["date"], "2024-06-03");
}

#[tokio::test]
async fn sync_is_skipped_when_not_requested() {
    let app = spawn_app().await;
    app.seed_credential("A1", Some("R1"), Utc::now() + Duration::hours(1))
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.provider)
        .await;

    let (status, body) = app
        .send(user_request("POST", "/tasks", Some(task_body(false))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["calendar_sync"]["status"], "not_requested");

    let (_, list) = app.send(user_request("GET", "/tasks", None)).await;
    assert_eq!(list.as_array().expect("task list").len(), 1);
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let app = spawn_app().await;
    let (status, body) = app.send(user_request("GET", "/tasks/42", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

