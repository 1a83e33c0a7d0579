//! HTTP surface of the signed cookie issuer.
pub mod cookie_issuer;
pub mod cookie_response;

pub use cookie_issuer::*;
pub use cookie_response::*;
