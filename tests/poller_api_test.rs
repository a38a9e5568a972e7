//! Integration tests for the REST client and fallback poll cycle
//! against a mock server.

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use console_notify::api::ApiClient;
use console_notify::config::Config;
use console_notify::connection::SharedConnectionState;
use console_notify::dispatch::Dispatcher;
use console_notify::floating::FloatingQueue;
use console_notify::poller::FallbackPoller;
use console_notify::store::NotificationStore;

fn notification_json(id: &str, notification_type: &str, read: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": notification_type,
        "title": "Booking update",
        "message": "Booking #77 changed",
        "created_at": "2026-08-01T10:00:00Z",
        "read": read
    })
}

async fn poller_for(server: &MockServer) -> (FallbackPoller, Arc<NotificationStore>) {
    let config = Config {
        server_url: server.uri(),
        ..Config::default()
    };
    let store = Arc::new(NotificationStore::new());
    let floating = Arc::new(FloatingQueue::new());
    let (dispatcher, _rx) = Dispatcher::new(Arc::clone(&store), floating, false);
    let api = ApiClient::new(server.uri(), "test-token");
    let poller = FallbackPoller::new(
        &config,
        api,
        Arc::clone(&store),
        dispatcher,
        SharedConnectionState::new(),
    );
    (poller, store)
}

#[tokio::test]
async fn test_recent_notifications_parses_and_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(query_param("limit", "20"))
        .and(wiremock::matchers::header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            notification_json("n2", "booking_approved", false),
            notification_json("n1", "booking_pending", true),
        ])))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), "test-token");
    let batch = api.recent_notifications(20).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].id, "n2");
    assert!(batch[1].read);
}

#[tokio::test]
async fn test_unread_count_parses_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 3})))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), "test-token");
    assert_eq!(api.unread_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/notifications/n1/read"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), "test-token");
    assert!(api.mark_read("n1").await.is_err());
}

#[tokio::test]
async fn test_trigger_test_returns_created_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifications/test"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(notification_json("test-1", "test_notification", false)),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), "test-token");
    let n = api.trigger_test().await.unwrap();
    assert_eq!(n.id, "test-1");
}

#[tokio::test]
async fn test_pe_status_parses_roster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/pe-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "online": true,
            "message": "1 engineer online",
            "online_users": [
                {"id": "u1", "name": "Amr", "role_name": "planning_engineer"}
            ]
        })))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), "test-token");
    let status = api.pe_status().await.unwrap();
    assert!(status.online);
    assert_eq!(status.online_users[0].name, "Amr");
}

#[tokio::test]
async fn test_poll_cycle_absorbs_batch_and_reconciles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            notification_json("n2", "booking_approved", false),
            notification_json("n1", "booking_pending", false),
        ])))
        .mount(&server)
        .await;
    // Server says only one unread: an older record was read elsewhere.
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 1})))
        .mount(&server)
        .await;

    let (poller, store) = poller_for(&server).await;
    poller.run_cycle().await;

    assert_eq!(store.len(), 2);
    assert_eq!(store.unread_count(), 1);
    // The oldest unread converged to read; the newest stays unread.
    let items = store.list();
    assert_eq!(items[0].id, "n2");
    assert!(!items[0].read);
    assert!(items[1].read);
}

#[tokio::test]
async fn test_poll_cycle_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            notification_json("n1", "booking_pending", false),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 1})))
        .mount(&server)
        .await;

    let (poller, store) = poller_for(&server).await;
    poller.run_cycle().await;
    poller.run_cycle().await;

    assert_eq!(store.len(), 1);
    assert_eq!(store.unread_count(), 1);
}

#[tokio::test]
async fn test_poll_cycle_keeps_state_when_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (poller, store) = poller_for(&server).await;
    poller.run_cycle().await;
    assert!(store.is_empty());
}
