//! Authentication for webhook-style requests signed by a remote authority.
//!
//! ```text
//! request → SignatureAuthLayer
//!         → RequestAuthenticator (headers present?)
//!         → KeyCache::get_keys (single-flight refresh from KeySource)
//!         → verify_signature (ECDSA P-256 / SHA-256 over the raw body)
//!         → inner service with the original body re-attached
//! ```

pub mod authenticator;
pub mod cache;
pub mod error;
pub mod keys;
pub mod layer;
pub mod source;
pub mod verify;

#[cfg(test)]
pub(crate) mod testutil;

pub use authenticator::{AuthDecision, RejectReason, RequestAuthenticator, SignatureHeaders};
pub use cache::{DEFAULT_KEY_TTL, KeyCache};
pub use error::KeyFetchError;
pub use keys::{KeySet, VerificationKey};
pub use layer::{SignatureAuthLayer, VerifiedRequest};
pub use source::{DEFAULT_PUBLIC_KEYS_URL, HttpKeySource, KeySource};
pub use verify::{verify_signature, verify_with_key};
