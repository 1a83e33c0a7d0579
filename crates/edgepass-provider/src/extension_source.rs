//! Credential source backed by the AWS Parameters and Secrets Lambda extension.
//!
//! The extension exposes a local HTTP cache in front of Secrets Manager and
//! Parameter Store. Every request carries the session token in
//! `X-Aws-Parameters-Secrets-Token`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use edgepass_core::{IssuanceError, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::credential_source::CredentialSource;

pub const DEFAULT_EXTENSION_ENDPOINT: &str = "http://localhost:2773";
pub const DEFAULT_CREDENTIAL_FETCH_TIMEOUT_MS: u64 = 3_000;
pub const SESSION_TOKEN_HEADER: &str = "x-aws-parameters-secrets-token";

const SECRETS_PATH: &str = "secretsmanager/get";
const PARAMETERS_PATH: &str = "systemsmanager/parameters/get";
const CURRENT_VERSION_STAGE: &str = "AWSCURRENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSourceConfig {
    pub endpoint: String,
    pub session_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ExtensionSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EXTENSION_ENDPOINT.to_string(),
            session_token: None,
            request_timeout_ms: DEFAULT_CREDENTIAL_FETCH_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SecretValueResponse {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: ParameterValue,
}

#[derive(Debug, Deserialize)]
struct ParameterValue {
    #[serde(rename = "Value")]
    value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExtensionCredentialSource {
    client: reqwest::Client,
    endpoint: String,
}

impl ExtensionCredentialSource {
    pub fn new(config: ExtensionSourceConfig) -> anyhow::Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&endpoint)
            .with_context(|| format!("invalid extension endpoint '{endpoint}'"))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = config
            .session_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            let mut value =
                HeaderValue::from_str(token).context("session token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(SESSION_TOKEN_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to build extension HTTP client")?;
        Ok(Self { client, endpoint })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        item: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{path}", self.endpoint);
        debug!(item, path, "requesting credential item from extension");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| {
                IssuanceError::credential_unavailable(item, transport_message(error))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IssuanceError::credential_unavailable(
                item,
                format!("extension returned status {}", status.as_u16()),
            ));
        }
        response.json::<T>().await.map_err(|error| {
            IssuanceError::credential_unavailable(
                item,
                format!("unexpected extension response: {}", error.without_url()),
            )
        })
    }
}

fn transport_message(error: reqwest::Error) -> String {
    if error.is_timeout() {
        return "extension request timed out".to_string();
    }
    if error.is_connect() {
        return "extension is unreachable".to_string();
    }
    format!("extension request failed: {}", error.without_url())
}

#[async_trait]
impl CredentialSource for ExtensionCredentialSource {
    fn source_name(&self) -> &'static str {
        "parameters_secrets_extension"
    }

    async fn fetch_secret(&self, name: &str) -> Result<String> {
        let response: SecretValueResponse = self
            .get_json(
                name,
                SECRETS_PATH,
                &[("secretId", name), ("versionStage", CURRENT_VERSION_STAGE)],
            )
            .await?;
        response
            .secret_string
            .ok_or_else(|| IssuanceError::credential_unavailable(name, "secret has no string value"))
    }

    async fn fetch_parameter(&self, name: &str) -> Result<String> {
        let response: ParameterResponse = self
            .get_json(name, PARAMETERS_PATH, &[("name", name)])
            .await?;
        response
            .parameter
            .value
            .ok_or_else(|| IssuanceError::credential_unavailable(name, "parameter has no value"))
    }
}
