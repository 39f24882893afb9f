//! ECDSA P-256 / SHA-256 verification of signed request bodies.
//!
//! Both entry points are total: any malformed input (empty values, bad
//! base64, non-DER signatures, unparsable keys) yields `false`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;

use crate::keys::KeySet;

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

/// Verify `signature_b64` over `raw_body` with the key named `key_identifier`.
///
/// An identifier that is not in `key_set` is a rejection, not an error.
pub fn verify_signature(
    raw_body: &[u8],
    signature_b64: &str,
    key_identifier: &str,
    key_set: &KeySet,
) -> bool {
    match key_set.find(key_identifier) {
        Some(key) => verify_with_key(raw_body, signature_b64, &key.material),
        None => false,
    }
}

/// Verify against one PEM (or bare base64 DER) public key.
///
/// The body is checked byte-for-byte; callers must pass exactly what was
/// received on the wire.
pub fn verify_with_key(raw_body: &[u8], signature_b64: &str, key_pem: &str) -> bool {
    if raw_body.is_empty() || signature_b64.is_empty() || key_pem.is_empty() {
        return false;
    }

    let Some(key) = decode_public_key(key_pem) else {
        return false;
    };
    let Ok(signature_der) = STANDARD.decode(signature_b64) else {
        return false;
    };
    // The issuer signs with the ASN.1 DER sequence encoding, not the fixed
    // 64-byte r||s form.
    let Ok(signature) = Signature::from_der(&signature_der) else {
        return false;
    };

    key.verify(raw_body, &signature).is_ok()
}

fn decode_public_key(key_pem: &str) -> Option<VerifyingKey> {
    let encoded: String = key_pem
        .replace(PEM_HEADER, "")
        .replace(PEM_FOOTER, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = STANDARD.decode(encoded).ok()?;
    VerifyingKey::from_public_key_der(&der).ok()
}
