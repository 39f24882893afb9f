use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderName, InvalidHeaderName};

use crate::cache::KeyCache;
use crate::error::KeyFetchError;
use crate::verify::verify_signature;

pub const DEFAULT_SIGNATURE_HEADER: &str = "x-signature";
pub const DEFAULT_KEY_IDENTIFIER_HEADER: &str = "x-key-identifier";

/// Names of the two headers the authenticator reads. Nothing else in the
/// request is inspected besides the body.
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    pub signature: HeaderName,
    pub key_identifier: HeaderName,
}

impl SignatureHeaders {
    pub fn new(signature: &str, key_identifier: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            signature: HeaderName::try_from(signature)?,
            key_identifier: HeaderName::try_from(key_identifier)?,
        })
    }
}

impl Default for SignatureHeaders {
    fn default() -> Self {
        Self {
            signature: HeaderName::from_static(DEFAULT_SIGNATURE_HEADER),
            key_identifier: HeaderName::from_static(DEFAULT_KEY_IDENTIFIER_HEADER),
        }
    }
}

/// Why a request was turned away. Logged server-side only; every variant
/// maps to the same "unauthorized" response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingSignature,
    MissingKeyIdentifier,
    UnknownKey,
    BadSignature,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::MissingSignature => "missing_signature",
            RejectReason::MissingKeyIdentifier => "missing_key_identifier",
            RejectReason::UnknownKey => "unknown_key",
            RejectReason::BadSignature => "bad_signature",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Accepted { key_identifier: String },
    Rejected(RejectReason),
}

pub struct RequestAuthenticator {
    cache: Arc<KeyCache>,
    headers: SignatureHeaders,
}

impl RequestAuthenticator {
    pub fn new(cache: Arc<KeyCache>, headers: SignatureHeaders) -> Self {
        Self { cache, headers }
    }

    pub fn headers(&self) -> &SignatureHeaders {
        &self.headers
    }

    /// Decide whether `body` was signed by a currently published key.
    ///
    /// Missing headers reject before the key cache is touched, so malformed
    /// requests never cause a key fetch. `Err` means the key set could not
    /// be obtained at all.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<AuthDecision, KeyFetchError> {
        let Some(signature) = non_empty_header(headers, &self.headers.signature) else {
            return Ok(AuthDecision::Rejected(RejectReason::MissingSignature));
        };
        let Some(key_identifier) = non_empty_header(headers, &self.headers.key_identifier) else {
            return Ok(AuthDecision::Rejected(RejectReason::MissingKeyIdentifier));
        };

        let keys = self.cache.get_keys().await?;
        if keys.find(key_identifier).is_none() {
            return Ok(AuthDecision::Rejected(RejectReason::UnknownKey));
        }

        if verify_signature(body, signature, key_identifier, &keys) {
            Ok(AuthDecision::Accepted {
                key_identifier: key_identifier.to_string(),
            })
        } else {
            Ok(AuthDecision::Rejected(RejectReason::BadSignature))
        }
    }
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
