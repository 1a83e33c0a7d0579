//! Access policy, signing and request authorization for edgepass.
//!
//! - [`policy`]: canonical custom policy statements
//! - [`signer`]: SHA-1/RSA signatures and CDN-safe cookie encoding
//! - [`signing_key`]: PEM key parsing and the process signing credential
//! - [`authorizer`]: form body parsing and the pluggable authentication predicate
pub mod authorizer;
pub mod policy;
pub mod signer;
pub mod signing_key;

pub use authorizer::*;
pub use policy::*;
pub use signer::*;
pub use signing_key::*;
