//! HTTP contract tests for the scheduler client against a mock backend.

use chrono::{FixedOffset, TimeZone};
use reqwest::{StatusCode, Url};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use push_reminder::api::{ApiError, SchedulerClient};
use push_reminder::datetime::resolve;
use push_reminder::schedule::{DeviceToken, ScheduleRequestBuilder};

fn client(server: &MockServer) -> SchedulerClient {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    SchedulerClient::new(base).unwrap()
}

#[tokio::test]
async fn register_token_posts_token_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/save-fcm-token/"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "token": "tok-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "FCM token saved successfully",
            "created": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = DeviceToken::new("tok-123").unwrap();
    let res = client(&server).register_token(&token).await.unwrap();
    assert!(res.success);
    assert_eq!(res.created, Some(true));
}

#[tokio::test]
async fn schedule_posts_canonical_request() {
    let server = MockServer::start().await;
    let now = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .unwrap();
    let resolved = resolve("2025-01-15", "14:30", &now).unwrap();
    let token = DeviceToken::new("tok-123").unwrap();
    let request = ScheduleRequestBuilder::default().build(&resolved, &token);

    Mock::given(method("POST"))
        .and(path("/api/schedule-notification/"))
        .and(body_json(json!({
            "title": "🔔 Scheduled Reminder",
            "body": "Your scheduled notification for 1/15/2025, 2:30:00 PM",
            "fcm_token": "tok-123",
            "scheduled_at": "2025-01-15T14:30:00.000Z",
            "priority": "high"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Notification scheduled successfully",
            "notification_id": 42,
            "scheduled_at": "2025-01-15T14:30:00+00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let res = client(&server).schedule(&request).await.unwrap();
    assert_eq!(res.notification_id, Some(42));
}

#[tokio::test]
async fn rejection_carries_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/save-fcm-token/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "FCM token is required"
        })))
        .mount(&server)
        .await;

    let token = DeviceToken::new("tok").unwrap();
    let err = client(&server).register_token(&token).await.unwrap_err();
    match err {
        ApiError::Rejected { status, error } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error.as_deref(), Some("FCM token is required"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn success_false_with_200_is_still_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/save-fcm-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let token = DeviceToken::new("tok").unwrap();
    let err = client(&server).register_token(&token).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { error: None, .. }));
    assert!(err.server_error().is_none());
}

#[tokio::test]
async fn non_json_response_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/save-fcm-token/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let token = DeviceToken::new("tok").unwrap();
    let err = client(&server).register_token(&token).await.unwrap_err();
    match err {
        ApiError::InvalidResponse { status, body } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert!(body.contains("Bad Gateway"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    drop(server);

    let token = DeviceToken::new("tok").unwrap();
    let err = SchedulerClient::new(base)
        .unwrap()
        .register_token(&token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn status_reads_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notification-status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "total_tokens": 3,
                "total_scheduled": 10,
                "pending": 4,
                "sent": 5,
                "failed": 1
            }
        })))
        .mount(&server)
        .await;

    let stats = client(&server).status().await.unwrap();
    assert_eq!(stats.total_scheduled, 10);
    assert_eq!(stats.pending, 4);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn timezone_info_reads_server_clock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timezone-info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "server_time": "2025-01-15 08:00:00 PM",
                "utc_time": "2025-01-15 02:30:00 PM",
                "timezone": "Asia/Kolkata",
                "offset_hours": 5,
                "is_dst": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client(&server).timezone_info().await.unwrap();
    assert_eq!(info.timezone, "Asia/Kolkata");
    assert_eq!(info.offset_hours, 5);
    assert!(!info.is_dst);
}

#[tokio::test]
async fn timezone_info_failure_carries_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timezone-info/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "zoneinfo unavailable"
        })))
        .mount(&server)
        .await;

    let err = client(&server).timezone_info().await.unwrap_err();
    assert_eq!(err.server_error(), Some("zoneinfo unavailable"));
}
