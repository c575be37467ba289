//! `GitHubClient` against a canned local HTTP responder.

use std::sync::Arc;

use folio_core::CommitHash;
use folio_deploy::{
    classify, fetch_status, DeployError, DeployMonitor, DeployStatus, ErrorClass, GitHubClient,
    MonitorConfig, PollPhase, RepoCoordinates, RunsApi,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn acme() -> RepoCoordinates {
    RepoCoordinates {
        owner: "acme".into(),
        repo: "site".into(),
    }
}

/// Serve exactly one response; resolves to the raw request head.
async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let response = format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write");
        let _ = socket.shutdown().await;
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
    });

    (base, rx)
}

#[tokio::test]
async fn successful_run_list_is_decoded() {
    let (base, request) = serve_once(
        "200 OK",
        r#"{"total_count":2,"workflow_runs":[
            {"status":"completed","conclusion":"skipped"},
            {"status":"completed","conclusion":"success"}]}"#,
    )
    .await;
    let client = GitHubClient::new(base, Some("t0k3n".into())).expect("client");

    let status = fetch_status(&client, &acme(), "abc1234").await.expect("status");
    assert_eq!(status, DeployStatus::Success);

    let head = request.await.expect("request captured").to_ascii_lowercase();
    assert!(head.starts_with(
        "get /repos/acme/site/actions/runs?head_sha=abc1234&per_page=5 http/1.1"
    ));
    assert!(head.contains("authorization: bearer t0k3n"));
    assert!(head.contains("accept: application/vnd.github+json"));
}

#[tokio::test]
async fn unauthenticated_request_has_no_authorization_header() {
    let (base, request) = serve_once("200 OK", r#"{"workflow_runs":[]}"#).await;
    let client = GitHubClient::new(base, None).expect("client");

    let runs = client.list_runs(&acme(), "abc1234").await.expect("runs");
    assert!(runs.is_empty());

    let head = request.await.expect("request captured").to_ascii_lowercase();
    assert!(!head.contains("authorization"));
}

#[tokio::test]
async fn non_2xx_is_an_api_error_and_aborts() {
    let (base, _request) = serve_once("404 Not Found", r#"{"message":"Not Found"}"#).await;
    let client = GitHubClient::new(base, None).expect("client");

    let err = client.list_runs(&acme(), "abc1234").await.unwrap_err();
    match &err {
        DeployError::Api { status, body } => {
            assert_eq!(*status, 404);
            assert!(body.contains("Not Found"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(classify(&err), ErrorClass::Abort);
}

#[tokio::test]
async fn garbage_body_is_a_retryable_decode_error() {
    let (base, _request) = serve_once("200 OK", "<html>maintenance</html>").await;
    let client = GitHubClient::new(base, None).expect("client");

    let err = client.list_runs(&acme(), "abc1234").await.unwrap_err();
    assert!(matches!(err, DeployError::Decode(_)), "got: {err}");
    assert_eq!(classify(&err), ErrorClass::Retry);
}

#[tokio::test]
async fn connection_refused_is_a_retryable_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let client = GitHubClient::new(base, None).expect("client");
    let err = client.list_runs(&acme(), "abc1234").await.unwrap_err();
    assert!(matches!(err, DeployError::Transport(_)), "got: {err}");
    assert_eq!(classify(&err), ErrorClass::Retry);
}

#[tokio::test]
async fn monitor_reaches_api_error_through_real_client() {
    let (base, _request) = serve_once("401 Unauthorized", r#"{"message":"Bad credentials"}"#).await;
    let client = GitHubClient::new(base, Some("expired".into())).expect("client");

    let monitor = DeployMonitor::new(Arc::new(client), MonitorConfig::default());
    let handle = monitor.start(acme(), CommitHash::from("abc1234"));
    let done = handle.wait().await;

    assert_eq!(done.phase, PollPhase::ApiError);
    assert!(done.last_error.unwrap_or_default().contains("401"));
}
