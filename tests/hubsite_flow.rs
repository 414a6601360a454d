//! Integration tests for `spo hubsite data get` using wiremock.
//!
//! The mock server stands in for the SharePoint site. `SpoClient::with_base_url`
//! keeps the site path (`/sites/test`) and swaps scheme and host, so the
//! mocks match on the same REST path the real site would see.

use std::io::{Read, Write};

use spo_cli::auth::TokenProvider;
use spo_cli::client::SpoClient;
use spo_cli::command::{Context, Outcome, execute};
use spo_cli::confirm::Confirm;
use spo_cli::console::{Console, SharedBuffer};
use spo_cli::error::SpoError;
use spo_cli::hubsite::{HubSiteDataGet, HubSiteDataGetArgs};
use spo_cli::session::Session;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEB_URL: &str = "https://contoso.sharepoint.com/sites/test";

/// Read commands never prompt; reaching this is a bug.
struct NeverAsked;

impl Confirm for NeverAsked {
    fn confirm(&mut self, _console: &mut Console, message: &str) -> std::io::Result<bool> {
        panic!("read command prompted: {message}");
    }
}

fn mock_client(server: &MockServer) -> SpoClient {
    SpoClient::with_base_url(TokenProvider::with_token("mock-token"), &server.uri())
}

fn args(force_refresh: bool) -> HubSiteDataGetArgs {
    HubSiteDataGetArgs {
        web_url: WEB_URL.to_string(),
        force_refresh,
    }
}

async fn run(
    server: &MockServer,
    args: &HubSiteDataGetArgs,
    verbose: bool,
) -> (Result<Outcome, SpoError>, SharedBuffer, SharedBuffer) {
    let client = mock_client(server);
    let session = Session::default();
    let (mut console, out, err) = Console::captured(verbose);
    let mut confirmer = NeverAsked;
    let mut ctx = Context {
        client: &client,
        session: &session,
        console: &mut console,
        confirmer: &mut confirmer,
    };
    let result = execute(&HubSiteDataGet, args, &mut ctx).await;
    (result, out, err)
}

#[tokio::test]
async fn hub_site_data_is_printed_as_parsed_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .and(header("accept", "application/json;odata=nometadata"))
        .and(header("authorization", "Bearer mock-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "{\"foo\":1}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (result, out, err) = run(&server, &args(false), false).await;

    assert_eq!(result.unwrap(), Outcome::Success);
    let printed: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
    assert_eq!(printed, serde_json::json!({"foo": 1}));
    assert!(err.contents().is_empty(), "nothing on stderr without --verbose");
}

#[tokio::test]
async fn force_refresh_is_embedded_in_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(true)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "{\"Name\":\"Marketing\",\"RequiresJoinApproval\":false}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (result, out, _err) = run(&server, &args(true), false).await;

    assert_eq!(result.unwrap(), Outcome::Success);
    assert!(out.contents().contains("\"Name\": \"Marketing\""));
}

#[tokio::test]
async fn odata_null_prints_only_verbose_diagnostic() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "odata.null": true
        })))
        .mount(&server)
        .await;

    let (result, out, err) = run(&server, &args(false), true).await;

    assert_eq!(result.unwrap(), Outcome::NoOp);
    assert!(out.contents().is_empty(), "no result output for a null response");
    let stderr = err.contents();
    assert!(stderr.contains(
        "https://contoso.sharepoint.com/sites/test is not connected to a hub site and is not a hub site itself"
    ));
    assert!(!stderr.contains("DONE"), "no success indicator for a no-op");
}

#[tokio::test]
async fn odata_null_is_silent_without_verbose() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "odata.null": true
        })))
        .mount(&server)
        .await;

    let (result, out, err) = run(&server, &args(false), false).await;

    assert_eq!(result.unwrap(), Outcome::NoOp);
    assert!(out.contents().is_empty());
    assert!(err.contents().is_empty());
}

#[tokio::test]
async fn verbose_success_reports_progress_and_done() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "{\"foo\":1}"
        })))
        .mount(&server)
        .await;

    let (result, _out, err) = run(&server, &args(false), true).await;

    assert_eq!(result.unwrap(), Outcome::Success);
    let stderr = err.contents();
    let progress = stderr
        .find("Retrieving hub site data...")
        .expect("progress line");
    let token = stderr
        .find("Retrieving access token for https://contoso.sharepoint.com...")
        .expect("token line");
    assert!(progress < token, "hub site progress comes first: {stderr}");
    assert!(stderr.contains("Executing web request..."));
    assert!(stderr.contains("/sites/test/_api/web/HubSiteData(false)"));
    assert!(stderr.contains("200 OK"));
    assert!(!stderr.contains("mock-token"), "bearer token must not be echoed");
    assert!(stderr.trim_end().ends_with("DONE"));
}

#[tokio::test]
async fn invalid_url_fails_before_any_request() {
    let server = MockServer::start().await;
    let bad = HubSiteDataGetArgs {
        web_url: "contoso.sharepoint.com/sites/test".to_string(),
        force_refresh: false,
    };

    let (result, _out, _err) = run(&server, &bad, false).await;

    let err = result.unwrap_err();
    assert!(matches!(err, SpoError::Validation(_)));
    assert_eq!(err.exit_code(), 2);
    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty(), "validation must not touch the network");
}

#[tokio::test]
async fn http_error_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"odata.error":{"code":"-2147024894, System.IO.FileNotFoundException","message":{"lang":"en-US","value":"File Not Found."}}}"#,
        ))
        .mount(&server)
        .await;

    let (result, out, _err) = run(&server, &args(false), false).await;

    let err = result.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("404"), "got: {msg}");
    assert!(msg.contains("File Not Found."), "got: {msg}");
    assert_eq!(err.exit_code(), 1);
    assert!(out.contents().is_empty());
}

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>sign in</html>"))
        .mount(&server)
        .await;

    let (result, _out, err) = run(&server, &args(false), false).await;

    assert!(matches!(result.unwrap_err(), SpoError::Parse(_)));
    assert!(err.contents().is_empty(), "raw body only shown with --verbose");
}

#[tokio::test]
async fn verbose_parse_failure_shows_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/test/_api/web/HubSiteData(false)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>sign in page</html>"))
        .mount(&server)
        .await;

    let (result, out, err) = run(&server, &args(false), true).await;

    assert!(matches!(result.unwrap_err(), SpoError::Parse(_)));
    assert!(out.contents().is_empty());
    let stderr = err.contents();
    assert!(stderr.contains("Response:"), "got: {stderr}");
    assert!(stderr.contains("<html>sign in page</html>"), "got: {stderr}");
}

#[tokio::test]
async fn truncated_body_is_network_error() {
    // Declares more bytes than it sends, then hangs up.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"value\"")
            .unwrap();
    });

    let client = SpoClient::with_base_url(
        TokenProvider::with_token("mock-token"),
        &format!("http://{addr}"),
    );
    let session = Session::default();
    let (mut console, _out, _err) = Console::captured(false);
    let mut confirmer = NeverAsked;
    let mut ctx = Context {
        client: &client,
        session: &session,
        console: &mut console,
        confirmer: &mut confirmer,
    };
    let result = execute(&HubSiteDataGet, &args(false), &mut ctx).await;
    server.join().unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, SpoError::Network(_)), "got: {err:?}");
    assert_eq!(err.exit_code(), 1);
}
