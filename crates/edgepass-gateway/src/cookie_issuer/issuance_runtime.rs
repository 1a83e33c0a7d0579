//! Per-request issuance pipeline and its HTTP handlers.

use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    Denied(AuthorizationDecision),
    Issued(IssuedCookies),
}

/// Runs authorization, credential lookup, policy construction and signing.
///
/// A denied request returns before the credential provider is touched. The
/// validity window is checked before any credential fetch.
pub async fn issue_signed_cookies(
    state: &CookieIssuerState,
    raw_body: &str,
) -> edgepass_core::Result<IssuanceOutcome> {
    let decision = authorize(raw_body, state.authenticator.as_ref());
    if !decision.is_granted() {
        return Ok(IssuanceOutcome::Denied(decision));
    }

    let valid_for = state.config.valid_for()?;
    let credential = state.provider.fetch_credential().await?;
    let resource = state
        .config
        .resource_pattern
        .clone()
        .unwrap_or_else(|| credential.default_resource_pattern());
    let policy = build_policy_now(&resource, valid_for)?;
    let cookies = sign(&credential, &policy)?;
    let issued = IssuedCookies::from_policy(cookies, &policy)?;
    info!(
        decision = decision.status(),
        key_pair_id = %credential.key_pair_id(),
        resource = %policy.resource(),
        not_after = policy.not_after(),
        "signed cookies issued"
    );
    Ok(IssuanceOutcome::Issued(issued))
}

pub(super) async fn handle_get_signed_cookies(
    State(state): State<Arc<CookieIssuerState>>,
    body: Bytes,
) -> Response {
    let raw_body = String::from_utf8_lossy(&body);
    match issue_signed_cookies(&state, &raw_body).await {
        Ok(IssuanceOutcome::Issued(issued)) => {
            build_cookie_response(&AuthorizationDecision::Granted, Some(&issued))
        }
        Ok(IssuanceOutcome::Denied(decision)) => {
            let denied = IssuanceError::AuthorizationDenied {
                reason_code: decision.reason_code().to_string(),
            };
            log_issuance_error(&denied);
            error_response(&denied)
        }
        Err(issuance_error) => {
            log_issuance_error(&issuance_error);
            error_response(&issuance_error)
        }
    }
}

pub(super) async fn handle_health(State(state): State<Arc<CookieIssuerState>>) -> Response {
    Json(json!({
        "status": "ok",
        "credential_cached": state.provider.is_cached(),
        "validity_seconds": state.config.validity_seconds,
    }))
    .into_response()
}

fn log_issuance_error(issuance_error: &IssuanceError) {
    match issuance_error {
        IssuanceError::AuthorizationDenied { reason_code } => {
            info!(reason_code = %reason_code, "signed cookie request denied");
        }
        other => {
            error!(
                error_kind = other.kind(),
                configuration_error = other.is_configuration_error(),
                error = %other,
                "signed cookie issuance failed"
            );
        }
    }
}
