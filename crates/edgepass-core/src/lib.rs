//! Foundational utilities shared across edgepass crates.
//!
//! Provides the issuance error taxonomy and the time helpers used for policy
//! expiry and cookie `expires` rendering.

pub mod error;
pub mod time_utils;

pub use error::{IssuanceError, Result};
pub use time_utils::{format_http_date, unix_timestamp_to_utc};
