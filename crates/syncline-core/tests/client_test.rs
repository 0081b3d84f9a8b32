#![allow(clippy::unwrap_used)]
// End-to-end wiring of `SyncClient` against a wiremock server.
//
// wiremock bodies are finite, so each stream delivers its scripted events
// and then ends. With a long retry interval the client settles in the
// "server lost" state, which is what most of these tests assert on.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use syncline_core::{ClientConfig, SyncClient, ViewFileStatus};

fn sse(events: &[(&str, &str)]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|(tag, data)| format!("event: {tag}\ndata: {data}\n\n"))
        .collect();
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/status-stream"))
        .respond_with(sse(&[("status", r#"{"up": true, "error_msg": null}"#)]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/stream"))
        .respond_with(sse(&[(
            "model-init",
            r#"[{"name":"a.mkv","state":"queued"},{"name":"b.mkv","state":"downloaded"}]"#,
        )]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"pattern":"*.mkv"}]"#))
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> SyncClient {
    let mut config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    config.stream_retry_interval = Duration::from_secs(60);
    SyncClient::new(config).unwrap()
}

async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn test_streams_feed_collections_then_reset_when_server_goes_away() {
    let server = server().await;
    let client = client(&server);

    let file_counts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&file_counts);
    let _files = client
        .files()
        .listen(move |files| sink.lock().unwrap().push(files.len()));

    let queued_enabled = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&queued_enabled);
    let _view = client.status_filter().listen(move |view| {
        if view.is_enabled(Some(ViewFileStatus::Queued)) {
            *flag.lock().unwrap() = true;
        }
    });

    client.connect().await.unwrap();
    assert!(client.is_started().await);

    // Both bodies end, so the gate reports the loss and everything resets.
    eventually("disconnect", || !client.connectivity().is_connected()).await;
    eventually("files cleared", || client.files().snapshot().is_empty()).await;
    assert!(client.patterns().is_empty());

    assert!(file_counts.lock().unwrap().contains(&2));
    assert!(*queued_enabled.lock().unwrap());
    assert_eq!(
        client.connectivity().current().error_message.as_deref(),
        Some("Lost connection to the server.")
    );

    let fetches = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/server/autoqueue/get")
        .count();
    assert!(fetches >= 1, "optimistic start should fetch patterns");

    tokio::time::timeout(Duration::from_secs(5), client.disconnect())
        .await
        .expect("disconnect must not wait for the pending retry");
    assert!(!client.is_started().await);
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = server().await;
    let client = client(&server);

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    eventually("disconnect", || !client.connectivity().is_connected()).await;
    client.disconnect().await;

    let status_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/server/status-stream")
        .count();
    assert_eq!(status_requests, 1);
}

#[tokio::test]
async fn test_pattern_shortcuts_go_through_the_store() {
    let server = server().await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/add/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&server);

    // Not connected: the store is empty and the gate is optimistic.
    client.patterns().refresh().await;
    assert!(client.patterns().contains("*.mkv"));

    assert!(!client.add_pattern("*.mkv").await.success);
    assert!(client.add_pattern("new").await.success);
    assert!(!client.remove_pattern("missing").await.success);
    assert_eq!(client.patterns().len(), 2);
}
