//! Integration tests for the `syncline` CLI binary.
//!
//! Argument parsing, help output, and completions run without a server;
//! the server-facing commands run against a wiremock instance.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `syncline` binary with env isolation.
///
/// Clears all `SYNCLINE_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn syncline_cmd_in(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("syncline");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("SYNCLINE_PROFILE")
        .env_remove("SYNCLINE_SERVER")
        .env_remove("SYNCLINE_OUTPUT")
        .env_remove("SYNCLINE_INSECURE")
        .env_remove("SYNCLINE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn syncline_cmd() -> assert_cmd::Command {
    syncline_cmd_in(std::path::Path::new("/tmp/syncline-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async test thread so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Every payload line gets its own `data:` field.
fn sse(events: &[(&str, &str)]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|(tag, data)| {
            let data: String = data.lines().map(|l| format!("data: {l}\n")).collect();
            format!("event: {tag}\n{data}\n")
        })
        .collect();
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn autoqueue_server(patterns: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string(patterns))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = syncline_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    syncline_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("patterns")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("files")),
    );
}

#[test]
fn test_version_flag() {
    syncline_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("syncline"));
}

#[test]
fn test_completions_zsh() {
    syncline_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    syncline_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = syncline_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_status_filter() {
    let output = syncline_cmd()
        .args(["files", "list", "--status", "bogus"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unknown_profile_fails() {
    syncline_cmd()
        .args(["--profile", "nope", "patterns", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_unreachable_server_exits_with_connection_code() {
    syncline_cmd()
        .args(["--server", "http://127.0.0.1:1", "patterns", "list"])
        .assert()
        .code(7);
}

#[test]
fn test_non_http_server_is_rejected() {
    syncline_cmd()
        .args(["--server", "ftp://example.com", "patterns", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported scheme"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_add_then_use() {
    let home = tempfile::tempdir().unwrap();

    syncline_cmd_in(home.path())
        .args(["config", "add", "seedbox", "--server", "https://seedbox.example:8800"])
        .assert()
        .success();
    syncline_cmd_in(home.path())
        .args(["config", "use", "seedbox"])
        .assert()
        .success();
    syncline_cmd_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seedbox *"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    syncline_cmd_in(home.path())
        .args(["config", "use", "ghost"])
        .assert()
        .code(4);
}

#[test]
fn test_config_show_without_file() {
    syncline_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

// ── Patterns ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_patterns_list_plain() {
    let server = autoqueue_server(r#"[{"pattern":"*.mkv"},{"pattern":"Show.S01*"}]"#).await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "-o", "plain", "patterns", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "*.mkv\nShow.S01*\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_patterns_add_sends_encoded_request() {
    let server = autoqueue_server("[]").await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/add/*.mkv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "patterns", "add", "*.mkv"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("added"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_patterns_add_duplicate_is_rejected_locally() {
    let server = autoqueue_server(r#"[{"pattern":"*.mkv"}]"#).await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "patterns", "add", "*.mkv"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("Pattern '*.mkv' already exists."));
    let adds = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().starts_with("/server/autoqueue/add"))
        .count();
    assert_eq!(adds, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_patterns_remove_surfaces_server_rejection() {
    let server = autoqueue_server(r#"[{"pattern":"a"}]"#).await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/remove/a"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Pattern 'a' is locked"))
        .mount(&server)
        .await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "patterns", "rm", "a"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("Pattern 'a' is locked"));
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_show_reports_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/status-stream"))
        .respond_with(sse(&[("status", r#"{"up": true, "error_msg": null}"#)]))
        .mount(&server)
        .await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "-o", "plain", "status", "show"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "up");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_show_reports_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/status-stream"))
        .respond_with(sse(&[(
            "status",
            r#"{"up": false, "error_msg": "Remote scan failed"}"#,
        )]))
        .mount(&server)
        .await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "status", "show"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("Remote scan failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_watch_prints_loss_when_stream_ends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/status-stream"))
        .respond_with(sse(&[("status", r#"{"up": true, "error_msg": null}"#)]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/stream"))
        .respond_with(sse(&[("model-init", "[]")]).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let mut cmd = syncline_cmd();
    cmd.args([
        "--server",
        &server.uri(),
        "status",
        "watch",
        "--count",
        "1",
        "--retry-ms",
        "60000",
    ])
    .timeout(Duration::from_secs(20));
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("down"), "{stdout}");
    assert!(stdout.contains("Lost connection to the server."), "{stdout}");
}

// ── Files ───────────────────────────────────────────────────────────

async fn files_server() -> MockServer {
    let server = MockServer::start().await;
    // Keep the status stream pending so the gate stays optimistic.
    Mock::given(method("GET"))
        .and(path("/server/status-stream"))
        .respond_with(
            sse(&[("status", r#"{"up": true, "error_msg": null}"#)])
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/stream"))
        .respond_with(sse(&[(
            "model-init",
            r#"[{"name":"a.mkv","state":"queued","remote_size":10},
                {"name":"b.mkv","state":"downloaded"},
                {"name":"c","is_dir":true,"state":"downloaded"}]"#,
        )]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server/autoqueue/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_files_list_filters_by_status() {
    let server = files_server().await;

    let mut cmd = syncline_cmd();
    cmd.args([
        "--server",
        &server.uri(),
        "-o",
        "plain",
        "files",
        "list",
        "--status",
        "downloaded",
    ])
    .timeout(Duration::from_secs(20));
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "b.mkv\nc\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_files_filters_marks_available_statuses() {
    let server = files_server().await;

    let mut cmd = syncline_cmd();
    cmd.args(["--server", &server.uri(), "-o", "json-compact", "files", "filters"])
        .timeout(Duration::from_secs(20));
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let enabled: Vec<_> = rows
        .iter()
        .filter(|r| r["enabled"] == true)
        .map(|r| r["category"].clone())
        .collect();
    assert_eq!(
        enabled,
        vec![
            serde_json::Value::Null,
            serde_json::json!("queued"),
            serde_json::json!("downloaded"),
        ]
    );
}
