use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use edgepass_access::{
    verify_signed_cookie_set, NonEmptyPasswordAuthenticator, SignedCookieSet, SigningKey,
    COOKIE_KEY_PAIR_ID, COOKIE_POLICY, COOKIE_SIGNATURE,
};
use edgepass_gateway::{
    build_cookie_issuer_router, CookieIssuerServerConfig, CookieIssuerState,
    GET_SIGNED_COOKIES_ENDPOINT,
};
use edgepass_provider::{
    CredentialItemNames, CredentialProvider, ExtensionCredentialSource, ExtensionSourceConfig,
};
use httpmock::{Method::GET, MockServer};
use reqwest::header::{CONTENT_TYPE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;

const PKCS1_PEM: &str = include_str!("../../../testdata/signing-key-pkcs1.pem");
const SECRET_NAME: &str = "get-signed-cookies-sample-private-key";
const KEY_PAIR_ID_NAME: &str = "/get-signed-cookies-sample/CLOUDFRONT_KEY_PAIR_ID";
const DOMAIN_NAME: &str = "/get-signed-cookies-sample/CLOUDFRONT_DOMAIN";

async fn mock_parameters(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/systemsmanager/parameters/get")
                .query_param("name", KEY_PAIR_ID_NAME);
            then.status(200)
                .json_body(json!({ "Parameter": { "Value": "K2JCJMDEHXQW5F" } }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/systemsmanager/parameters/get")
                .query_param("name", DOMAIN_NAME);
            then.status(200)
                .json_body(json!({ "Parameter": { "Value": "example-cdn.test" } }));
        })
        .await;
}

async fn spawn_issuer(
    extension: &MockServer,
    config: CookieIssuerServerConfig,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let source = ExtensionCredentialSource::new(ExtensionSourceConfig {
        endpoint: extension.base_url(),
        session_token: Some("session-token".to_string()),
        request_timeout_ms: 2_000,
    })?;
    let provider = Arc::new(CredentialProvider::new(
        Arc::new(source),
        CredentialItemNames::default(),
    ));
    let state = Arc::new(CookieIssuerState::new(
        config,
        provider,
        Arc::new(NonEmptyPasswordAuthenticator),
    ));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind ephemeral listener")?;
    let addr = listener.local_addr().context("resolve listener addr")?;
    let app = build_cookie_issuer_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok((addr, handle))
}

async fn post_form(addr: SocketAddr, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}{GET_SIGNED_COOKIES_ENDPOINT}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .send()
        .await
        .expect("send issuance request")
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| value.to_str().expect("ascii cookie").to_string())
        .collect()
}

fn cookie_value(cookies: &[String], name: &str) -> String {
    cookies
        .iter()
        .find_map(|cookie| cookie.strip_prefix(&format!("{name}=")))
        .and_then(|rest| rest.split(';').next())
        .expect("cookie present")
        .to_string()
}

#[tokio::test]
async fn integration_password_request_yields_three_cookies_for_protected_domain() {
    let extension = MockServer::start_async().await;
    let secret = extension
        .mock_async(|when, then| {
            when.method(GET)
                .path("/secretsmanager/get")
                .query_param("secretId", SECRET_NAME)
                .header("x-aws-parameters-secrets-token", "session-token");
            then.status(200).json_body(json!({ "SecretString": PKCS1_PEM }));
        })
        .await;
    mock_parameters(&extension).await;
    let (addr, handle) = spawn_issuer(&extension, CookieIssuerServerConfig::default())
        .await
        .expect("spawn issuer");

    let issued_at = Utc::now().timestamp();
    let response = post_form(addr, "password=secret123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);

    let set = SignedCookieSet {
        key_pair_id: cookie_value(&cookies, COOKIE_KEY_PAIR_ID),
        signature_encoded: cookie_value(&cookies, COOKIE_SIGNATURE),
        policy_encoded: cookie_value(&cookies, COOKIE_POLICY),
    };
    assert_eq!(set.key_pair_id, "K2JCJMDEHXQW5F");
    let public_key = SigningKey::from_pem("fixture", PKCS1_PEM)
        .expect("parse fixture key")
        .public_key();
    verify_signed_cookie_set(&public_key, &set).expect("cookie set verifies");

    let policy = set.decode_policy().expect("decode policy");
    assert_eq!(policy.resource(), "https://example-cdn.test/*");
    let lifetime = policy.not_after() - issued_at;
    assert!((60..=62).contains(&lifetime), "lifetime={lifetime}");

    let second = post_form(addr, "password=again").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert!(secret.hits_async().await >= 1);
    handle.abort();
}

#[tokio::test]
async fn integration_missing_secret_returns_5xx_without_cookies_or_key_material() {
    let extension = MockServer::start_async().await;
    extension
        .mock_async(|when, then| {
            when.method(GET).path("/secretsmanager/get");
            then.status(400).json_body(json!({
                "__type": "ResourceNotFoundException",
                "Message": "Secrets Manager can't find the specified secret."
            }));
        })
        .await;
    mock_parameters(&extension).await;
    let (addr, handle) = spawn_issuer(&extension, CookieIssuerServerConfig::default())
        .await
        .expect("spawn issuer");

    let response = post_form(addr, "password=secret123").await;
    assert!(response.status().is_server_error());
    assert!(set_cookies(&response).is_empty());
    let body = response.text().await.expect("body");
    assert!(!body.contains("PRIVATE KEY"));
    assert!(!body.contains("ResourceNotFoundException"));
    handle.abort();
}

#[tokio::test]
async fn integration_missing_or_empty_password_never_contacts_extension() {
    let extension = MockServer::start_async().await;
    let secret = extension
        .mock_async(|when, then| {
            when.method(GET).path("/secretsmanager/get");
            then.status(200).json_body(json!({ "SecretString": PKCS1_PEM }));
        })
        .await;
    let (addr, handle) = spawn_issuer(&extension, CookieIssuerServerConfig::default())
        .await
        .expect("spawn issuer");

    for body in ["user=ann", "password="] {
        let response = post_form(addr, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "body={body:?}");
        assert!(set_cookies(&response).is_empty());
    }
    secret.assert_calls_async(0).await;
    handle.abort();
}

#[tokio::test]
async fn integration_zero_window_fails_before_credential_fetch() {
    let extension = MockServer::start_async().await;
    let secret = extension
        .mock_async(|when, then| {
            when.method(GET).path("/secretsmanager/get");
            then.status(200).json_body(json!({ "SecretString": PKCS1_PEM }));
        })
        .await;
    mock_parameters(&extension).await;
    let config = CookieIssuerServerConfig {
        validity_seconds: 0,
        ..CookieIssuerServerConfig::default()
    };
    let (addr, handle) = spawn_issuer(&extension, config)
        .await
        .expect("spawn issuer");

    let response = post_form(addr, "password=secret123").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    secret.assert_calls_async(0).await;
    handle.abort();
}
