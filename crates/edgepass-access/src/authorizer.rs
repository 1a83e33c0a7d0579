//! Form-body request authorization.
//!
//! The issuance endpoint receives an `application/x-www-form-urlencoded` body.
//! An [`Authenticator`] decides whether the parsed fields earn a cookie set.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

pub const PASSWORD_FIELD: &str = "password";

pub const REASON_GRANTED: &str = "allow_authenticated";
pub const REASON_DENIED: &str = "deny_invalid_credentials";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Decoded form fields of an issuance request.
pub struct AccessRequest {
    fields: BTreeMap<String, String>,
}

impl AccessRequest {
    /// Parses a urlencoded body. Repeated fields keep the last value; malformed
    /// pairs decode leniently rather than failing.
    pub fn parse(raw_body: &str) -> Self {
        let fields = url::form_urlencoded::parse(raw_body.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect::<BTreeMap<_, _>>();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn password(&self) -> Option<&str> {
        self.get(PASSWORD_FIELD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Granted,
    Denied { reason_code: String },
}

impl AuthorizationDecision {
    pub fn denied(reason_code: &str) -> Self {
        Self::Denied {
            reason_code: reason_code.to_string(),
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    pub fn reason_code(&self) -> &str {
        match self {
            Self::Granted => REASON_GRANTED,
            Self::Denied { reason_code } => reason_code.as_str(),
        }
    }

    /// Short label for structured logs.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied { .. } => "denied",
        }
    }
}

/// Pluggable authentication predicate. Must be a pure function of the request.
pub trait Authenticator: Send + Sync {
    fn authorize(&self, request: &AccessRequest) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
/// Grants any request carrying a non-empty `password` field.
pub struct NonEmptyPasswordAuthenticator;

impl Authenticator for NonEmptyPasswordAuthenticator {
    fn authorize(&self, request: &AccessRequest) -> bool {
        request.password().is_some_and(|password| !password.is_empty())
    }
}

/// Grants requests whose `password` equals a configured value.
pub struct StaticPasswordAuthenticator {
    expected_digest: [u8; 32],
}

impl StaticPasswordAuthenticator {
    pub fn new(expected_password: &str) -> Self {
        Self {
            expected_digest: password_digest(expected_password),
        }
    }
}

impl std::fmt::Debug for StaticPasswordAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticPasswordAuthenticator([REDACTED])")
    }
}

impl Authenticator for StaticPasswordAuthenticator {
    fn authorize(&self, request: &AccessRequest) -> bool {
        request
            .password()
            .filter(|password| !password.is_empty())
            .is_some_and(|password| digests_match(&password_digest(password), &self.expected_digest))
    }
}

fn password_digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

fn digests_match(left: &[u8; 32], right: &[u8; 32]) -> bool {
    left.iter()
        .zip(right.iter())
        .fold(0_u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}

/// Parses `raw_body` and runs it through `authenticator`.
///
/// Every rejection carries the same reason code.
pub fn authorize(raw_body: &str, authenticator: &dyn Authenticator) -> AuthorizationDecision {
    let request = AccessRequest::parse(raw_body);
    if authenticator.authorize(&request) {
        AuthorizationDecision::Granted
    } else {
        AuthorizationDecision::denied(REASON_DENIED)
    }
}
