//! Issuance error types.
//!
//! Every failure the signed cookie pipeline can produce maps to exactly one
//! variant here. Variants carry item *names* (secret ids, parameter names) and
//! never the fetched values.

use thiserror::Error;

/// Errors raised while authorizing a request and issuing its cookie set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssuanceError {
    /// The authentication predicate rejected the request.
    #[error("authorization denied: {reason_code}")]
    AuthorizationDenied {
        /// Generic reason code, safe to return to the caller.
        reason_code: String,
    },

    /// A secret or parameter could not be fetched, or came back empty.
    #[error("credential item '{item}' is unavailable: {message}")]
    CredentialUnavailable {
        /// Name of the secret or parameter.
        item: String,
        /// Diagnostic detail without the item value.
        message: String,
    },

    /// The fetched private key could not be parsed.
    #[error("credential item '{item}' is malformed: {message}")]
    CredentialMalformed {
        /// Name of the secret holding the key.
        item: String,
        /// Parser detail without key material.
        message: String,
    },

    /// Policy validity window is zero, negative or longer than one year.
    #[error("validity window must be between 1 second and one year (got {seconds}s)")]
    InvalidValidityWindow {
        /// Configured window in whole seconds.
        seconds: i64,
    },

    /// Resource pattern is not a fully-qualified URL with at most a trailing `/*`.
    #[error("invalid resource pattern '{pattern}': {message}")]
    InvalidResourcePattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// The signature primitive rejected the input.
    #[error("signing failed: {message}")]
    SigningFailure {
        /// Primitive error detail.
        message: String,
    },
}

impl IssuanceError {
    pub fn credential_unavailable(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CredentialUnavailable {
            item: item.into(),
            message: message.into(),
        }
    }

    pub fn credential_malformed(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CredentialMalformed {
            item: item.into(),
            message: message.into(),
        }
    }

    pub fn invalid_resource_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResourcePattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn signing_failure(message: impl Into<String>) -> Self {
        Self::SigningFailure {
            message: message.into(),
        }
    }

    /// Stable snake_case label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthorizationDenied { .. } => "authorization_denied",
            Self::CredentialUnavailable { .. } => "credential_unavailable",
            Self::CredentialMalformed { .. } => "credential_malformed",
            Self::InvalidValidityWindow { .. } => "invalid_validity_window",
            Self::InvalidResourcePattern { .. } => "invalid_resource_pattern",
            Self::SigningFailure { .. } => "signing_failure",
        }
    }

    /// True for failures caused by deployment configuration rather than by a request.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidValidityWindow { .. } | Self::InvalidResourcePattern { .. }
        )
    }
}

/// Result type alias for issuance operations.
pub type Result<T> = std::result::Result<T, IssuanceError>;
