//! HTTP responses for issuance outcomes.
//!
//! A granted request gets exactly three `Set-Cookie` headers or none at all:
//! every header value is built before any of them is attached.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use edgepass_access::{AuthorizationDecision, PolicyStatement, SignedCookieSet};
use edgepass_core::{format_http_date, IssuanceError, Result};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
pub const COOKIE_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A signed cookie set together with the instant its policy expires.
pub struct IssuedCookies {
    pub cookies: SignedCookieSet,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCookies {
    pub fn from_policy(cookies: SignedCookieSet, policy: &PolicyStatement) -> Result<Self> {
        let expires_at = policy.not_after_utc().ok_or_else(|| {
            IssuanceError::signing_failure(format!(
                "policy expiry {} is not a representable instant",
                policy.not_after()
            ))
        })?;
        Ok(Self {
            cookies,
            expires_at,
        })
    }
}

/// `<Name>=<Value>; expires=<HTTP-date>; path=/`
pub fn set_cookie_header_value(name: &str, value: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        "{name}={value}; expires={}; path={COOKIE_PATH}",
        format_http_date(expires_at)
    )
}

pub fn build_cookie_response(
    decision: &AuthorizationDecision,
    issued: Option<&IssuedCookies>,
) -> Response {
    match (decision, issued) {
        (AuthorizationDecision::Denied { .. }, _) => status_page(StatusCode::UNAUTHORIZED),
        (AuthorizationDecision::Granted, None) => status_page(StatusCode::INTERNAL_SERVER_ERROR),
        (AuthorizationDecision::Granted, Some(issued)) => granted_response(issued),
    }
}

pub fn issuance_error_status(error: &IssuanceError) -> StatusCode {
    match error {
        IssuanceError::AuthorizationDenied { .. } => StatusCode::UNAUTHORIZED,
        IssuanceError::CredentialUnavailable { .. } => StatusCode::BAD_GATEWAY,
        IssuanceError::CredentialMalformed { .. }
        | IssuanceError::InvalidValidityWindow { .. }
        | IssuanceError::InvalidResourcePattern { .. }
        | IssuanceError::SigningFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Generic page for a failed issuance. Never carries error details.
pub fn error_response(error: &IssuanceError) -> Response {
    status_page(issuance_error_status(error))
}

fn granted_response(issued: &IssuedCookies) -> Response {
    let mut cookie_headers = Vec::with_capacity(3);
    for (name, value) in issued.cookies.cookies() {
        let header = set_cookie_header_value(name, value, issued.expires_at);
        let Ok(header) = HeaderValue::from_str(&header) else {
            return status_page(StatusCode::INTERNAL_SERVER_ERROR);
        };
        cookie_headers.push(header);
    }

    let mut response = html_response(StatusCode::OK, render_acknowledgment(issued));
    for header in cookie_headers {
        response.headers_mut().append(SET_COOKIE, header);
    }
    response
}

fn render_acknowledgment(issued: &IssuedCookies) -> String {
    let rows = issued
        .cookies
        .cookies()
        .iter()
        .map(|(name, value)| format!("<dt>{name}</dt><dd>{}</dd>", escape_html(value)))
        .collect::<String>();
    format!(
        "<!DOCTYPE html><html><head><title>Signed cookies issued</title></head><body><h1>Signed cookies issued</h1><dl>{rows}</dl><p>Expires: {}</p></body></html>",
        format_http_date(issued.expires_at)
    )
}

fn status_page(status: StatusCode) -> Response {
    let body = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    html_response(status, body)
}

fn html_response(status: StatusCode, body: String) -> Response {
    let mut response = (status, Body::from(body)).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
