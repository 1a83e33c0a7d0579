//! Signing credential retrieval and caching.
//!
//! A [`CredentialProvider`] pulls the private key secret and the two public
//! parameters from a [`CredentialSource`] and keeps the parsed result for the
//! rest of the process lifetime.

pub mod credential_provider;
pub mod credential_source;
pub mod extension_source;

pub use credential_provider::*;
pub use credential_source::*;
pub use extension_source::*;
