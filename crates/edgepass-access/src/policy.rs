//! Canonical custom access policy statements.
//!
//! The canonical JSON produced here is the exact byte sequence that gets
//! signed, so it is written by an explicit formatter with a fixed field order
//! (resource, not-before, not-after) and whole-second timestamps.

use anyhow::{anyhow, Context};
use chrono::{DateTime, TimeDelta, Utc};
use edgepass_core::{unix_timestamp_to_utc, IssuanceError, Result};
use serde_json::Value;
use url::Url;

/// `2000-01-01T00:00:00Z`: lower bound meaning "valid from issuance".
pub const NOT_BEFORE_SENTINEL_UNIX: i64 = 946_684_800;
pub const DEFAULT_VALIDITY_SECONDS: i64 = 60;
/// One year. Keeps every expiry a representable four-digit-year HTTP-date.
pub const MAX_VALIDITY_SECONDS: i64 = 365 * 24 * 60 * 60;

const EPOCH_TIME_KEY: &str = "AWS:EpochTime";
const WILDCARD_SUFFIX: &str = "/*";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable access policy for one authorized request.
pub struct PolicyStatement {
    resource: String,
    not_before: i64,
    not_after: i64,
}

impl PolicyStatement {
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    pub fn not_after_utc(&self) -> Option<DateTime<Utc>> {
        unix_timestamp_to_utc(self.not_after)
    }

    /// Serializes the statement into its canonical, signable JSON form.
    pub fn canonical_json(&self) -> String {
        format!(
            "{{\"Statement\":[{{\"Resource\":{},\"Condition\":{{\"DateGreaterThan\":{{\"{}\":{}}},\"DateLessThan\":{{\"{}\":{}}}}}}}]}}",
            Value::String(self.resource.clone()),
            EPOCH_TIME_KEY,
            self.not_before,
            EPOCH_TIME_KEY,
            self.not_after,
        )
    }

    /// Reads a policy back from its canonical JSON form.
    pub fn parse_canonical(raw: &str) -> anyhow::Result<Self> {
        let document = serde_json::from_str::<Value>(raw).context("policy is not valid JSON")?;
        let statements = document
            .get("Statement")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("policy is missing the Statement array"))?;
        let [statement] = statements.as_slice() else {
            return Err(anyhow!(
                "policy must contain exactly one statement (found {})",
                statements.len()
            ));
        };
        let resource = statement
            .get("Resource")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("statement is missing Resource"))?;
        let condition = statement
            .get("Condition")
            .ok_or_else(|| anyhow!("statement is missing Condition"))?;
        let epoch_time = |name: &str| {
            condition
                .get(name)
                .and_then(|value| value.get(EPOCH_TIME_KEY))
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("condition is missing {name}.{EPOCH_TIME_KEY}"))
        };
        Ok(Self {
            resource: resource.to_string(),
            not_before: epoch_time("DateGreaterThan")?,
            not_after: epoch_time("DateLessThan")?,
        })
    }
}

/// Rejects zero, negative and longer-than-[`MAX_VALIDITY_SECONDS`] windows.
pub fn validate_validity_window(valid_for: TimeDelta) -> Result<()> {
    if valid_for <= TimeDelta::zero() || valid_for > TimeDelta::seconds(MAX_VALIDITY_SECONDS) {
        return Err(IssuanceError::InvalidValidityWindow {
            seconds: valid_for.num_seconds(),
        });
    }
    Ok(())
}

/// Converts configured whole seconds into a validated window.
pub fn validity_window_from_seconds(seconds: i64) -> Result<TimeDelta> {
    let valid_for =
        TimeDelta::try_seconds(seconds).ok_or(IssuanceError::InvalidValidityWindow { seconds })?;
    validate_validity_window(valid_for)?;
    Ok(valid_for)
}

/// Accepts fully-qualified http(s) URLs, optionally ending in one `/*` segment.
pub fn validate_resource_pattern(pattern: &str) -> Result<()> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(IssuanceError::invalid_resource_pattern(
            pattern,
            "pattern cannot be empty",
        ));
    }
    if trimmed != pattern {
        return Err(IssuanceError::invalid_resource_pattern(
            pattern,
            "pattern cannot contain surrounding whitespace",
        ));
    }
    let url = Url::parse(pattern).map_err(|error| {
        IssuanceError::invalid_resource_pattern(
            pattern,
            format!("expected a fully-qualified URL: {error}"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IssuanceError::invalid_resource_pattern(
            pattern,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(IssuanceError::invalid_resource_pattern(
            pattern,
            "URL must include a host",
        ));
    }
    let wildcard_count = pattern.matches('*').count();
    if wildcard_count > 1 || (wildcard_count == 1 && !pattern.ends_with(WILDCARD_SUFFIX)) {
        return Err(IssuanceError::invalid_resource_pattern(
            pattern,
            "only a single trailing '/*' wildcard segment is supported",
        ));
    }
    Ok(())
}

/// Builds the policy for a request issued at `now`.
///
/// `not_after` is the first whole second strictly after `now + valid_for`;
/// `not_before` is always [`NOT_BEFORE_SENTINEL_UNIX`].
pub fn build_policy(
    resource_pattern: &str,
    valid_for: TimeDelta,
    now: DateTime<Utc>,
) -> Result<PolicyStatement> {
    validate_validity_window(valid_for)?;
    validate_resource_pattern(resource_pattern)?;
    let expires = now
        .checked_add_signed(valid_for)
        .ok_or(IssuanceError::InvalidValidityWindow {
            seconds: valid_for.num_seconds(),
        })?;
    Ok(PolicyStatement {
        resource: resource_pattern.to_string(),
        not_before: NOT_BEFORE_SENTINEL_UNIX,
        not_after: expires.timestamp().saturating_add(1),
    })
}

pub fn build_policy_now(resource_pattern: &str, valid_for: TimeDelta) -> Result<PolicyStatement> {
    build_policy(resource_pattern, valid_for, Utc::now())
}
