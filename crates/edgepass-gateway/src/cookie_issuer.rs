//! Signed cookie issuer server: configuration, shared state and router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::TimeDelta;
use edgepass_access::{
    authorize, build_policy_now, sign, validate_resource_pattern, validity_window_from_seconds,
    AuthorizationDecision, Authenticator, DEFAULT_VALIDITY_SECONDS,
};
use edgepass_core::IssuanceError;
use edgepass_provider::CredentialProvider;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cookie_response::{build_cookie_response, error_response, IssuedCookies};

mod issuance_runtime;
mod server_bootstrap;

pub use issuance_runtime::{issue_signed_cookies, IssuanceOutcome};
pub use server_bootstrap::{build_cookie_issuer_router, run_cookie_issuer_server};

pub const GET_SIGNED_COOKIES_ENDPOINT: &str = "/auth-api/get-signed-cookies";
pub const HEALTH_ENDPOINT: &str = "/auth-api/health";
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieIssuerServerConfig {
    pub bind: String,
    /// Overrides the `https://<domain>/*` pattern derived from the credential.
    pub resource_pattern: Option<String>,
    pub validity_seconds: i64,
}

impl Default for CookieIssuerServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            resource_pattern: None,
            validity_seconds: DEFAULT_VALIDITY_SECONDS,
        }
    }
}

impl CookieIssuerServerConfig {
    pub fn valid_for(&self) -> edgepass_core::Result<TimeDelta> {
        validity_window_from_seconds(self.validity_seconds)
    }

    /// Checks the settings that would otherwise fail on every request.
    pub fn validate(&self) -> edgepass_core::Result<()> {
        self.valid_for()?;
        if let Some(pattern) = self.resource_pattern.as_deref() {
            validate_resource_pattern(pattern)?;
        }
        Ok(())
    }
}

/// Shared per-process state handed to every request.
pub struct CookieIssuerState {
    pub(crate) config: CookieIssuerServerConfig,
    pub(crate) provider: Arc<CredentialProvider>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
}

impl CookieIssuerState {
    pub fn new(
        config: CookieIssuerServerConfig,
        provider: Arc<CredentialProvider>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            provider,
            authenticator,
        }
    }
}
