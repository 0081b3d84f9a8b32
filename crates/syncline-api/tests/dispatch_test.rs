#![allow(clippy::unwrap_used)]
// Integration tests for `HttpDispatcher` using wiremock.

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use syncline_api::{Dispatch, Error, HttpDispatcher, endpoint};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpDispatcher) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let dispatcher = HttpDispatcher::with_client(reqwest::Client::new(), base_url);
    (server, dispatcher)
}

// ── Success ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_success_carries_body() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/server/autoqueue/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"pattern":"*.mkv"}]"#))
        .mount(&server)
        .await;

    let reaction = dispatcher.send("/server/autoqueue/get").await;

    assert!(reaction.success);
    assert_eq!(reaction.data.as_deref(), Some(r#"[{"pattern":"*.mkv"}]"#));
    assert!(reaction.message.is_none());
}

#[tokio::test]
async fn test_send_double_encodes_parameter_on_the_wire() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/server/autoqueue/add/*.mkv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("added"))
        .expect(1)
        .mount(&server)
        .await;

    let reaction = dispatcher
        .send(&endpoint("/server/autoqueue/add/{}", "*.mkv"))
        .await;

    assert!(reaction.success, "unexpected rejection: {reaction:?}");
}

// ── Rejections ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_rejection_uses_body_as_message() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/server/autoqueue/remove/x"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Pattern 'x' not found"))
        .mount(&server)
        .await;

    let reaction = dispatcher.send("/server/autoqueue/remove/x").await;

    assert!(!reaction.success);
    assert_eq!(reaction.message(), "Pattern 'x' not found");
    assert!(reaction.data.is_none());
}

#[tokio::test]
async fn test_send_rejection_without_body_reports_status() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let reaction = dispatcher.send("/server/autoqueue/get").await;

    assert!(!reaction.success);
    assert_eq!(reaction.message(), "HTTP 500");
}

#[tokio::test]
async fn test_get_text_surfaces_status_error() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let result = dispatcher.get_text("/missing").await;

    let err = result.unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "nope");
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_unreachable_server_is_rejection_not_panic() {
    // Bind then drop a server so the port is very likely closed.
    let (server, dispatcher) = setup().await;
    drop(server);

    let reaction = dispatcher.send("/server/autoqueue/get").await;

    assert!(!reaction.success);
    assert!(!reaction.message().is_empty());
}
