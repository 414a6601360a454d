//! Integration tests for token acquisition through the executor.
//!
//! One mock server plays both Azure AD (via `TokenProvider::with_authority`)
//! and the SharePoint site (via `SpoClient::with_base_url`).

use spo_cli::auth::TokenProvider;
use spo_cli::client::SpoClient;
use spo_cli::command::{Context, Outcome, execute};
use spo_cli::confirm::Confirm;
use spo_cli::console::Console;
use spo_cli::error::SpoError;
use spo_cli::hubsite::{HubSiteDataGet, HubSiteDataGetArgs};
use spo_cli::session::Session;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AAD_TENANT: &str = "contoso.onmicrosoft.com";
const TOKEN_PATH: &str = "/contoso.onmicrosoft.com/oauth2/v2.0/token";
const HUB_PATH: &str = "/sites/test/_api/web/HubSiteData(false)";

struct NeverAsked;

impl Confirm for NeverAsked {
    fn confirm(&mut self, _console: &mut Console, message: &str) -> std::io::Result<bool> {
        panic!("read command prompted: {message}");
    }
}

fn credentials_client(server: &MockServer) -> SpoClient {
    let auth = TokenProvider::new(AAD_TENANT, "test-client", "test-secret")
        .with_authority(&server.uri());
    SpoClient::with_base_url(auth, &server.uri())
}

fn hub_args() -> HubSiteDataGetArgs {
    HubSiteDataGetArgs {
        web_url: "https://contoso.sharepoint.com/sites/test".to_string(),
        force_refresh: false,
    }
}

async fn run_hub(client: &SpoClient) -> Result<Outcome, SpoError> {
    let session = Session::default();
    let (mut console, _out, _err) = Console::captured(false);
    let mut confirmer = NeverAsked;
    let mut ctx = Context {
        client,
        session: &session,
        console: &mut console,
        confirmer: &mut confirmer,
    };
    execute(&HubSiteDataGet, &hub_args(), &mut ctx).await
}

async fn mount_hub_site(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(HUB_PATH))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "{\"Title\":\"Hub\"}"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_is_requested_for_site_origin_and_sent_as_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains(
            "scope=https%3A%2F%2Fcontoso.sharepoint.com%2F.default",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "issued-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_hub_site(&server, "issued-token").await;

    let client = credentials_client(&server);
    assert_eq!(run_hub(&client).await.unwrap(), Outcome::Success);
}

#[tokio::test]
async fn token_is_cached_across_runs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "issued-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_hub_site(&server, "issued-token").await;

    let client = credentials_client(&server);
    run_hub(&client).await.unwrap();
    run_hub(&client).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let token_calls = received.iter().filter(|r| r.url.path() == TOKEN_PATH).count();
    assert_eq!(token_calls, 1, "second run must reuse the cached token");
}

#[tokio::test]
async fn rejected_credentials_stop_before_sharepoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(HUB_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = credentials_client(&server);
    let err = run_hub(&client).await.unwrap_err();

    assert!(matches!(err, SpoError::Auth { .. }));
    assert_eq!(err.exit_code(), 1);
    let msg = err.to_string();
    assert!(msg.contains("401"), "got: {msg}");
    assert!(msg.contains("AADSTS7000215"), "got: {msg}");
}

#[tokio::test]
async fn missing_credentials_fail_without_any_request() {
    let server = MockServer::start().await;

    let client = SpoClient::with_base_url(
        TokenProvider::new("", "", "").with_authority(&server.uri()),
        &server.uri(),
    );
    let err = run_hub(&client).await.unwrap_err();

    assert!(matches!(err, SpoError::Auth { .. }));
    assert!(err.to_string().contains("no client credentials configured"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
