use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use rand::rngs::OsRng;

use crate::error::KeyFetchError;
use crate::keys::{KeySet, VerificationKey};
use crate::source::KeySource;

/// Freshly generated P-256 key pair with its published PEM form.
pub(crate) struct TestKey {
    pub identifier: String,
    pub pem: String,
    signing: SigningKey,
}

impl TestKey {
    pub fn generate(identifier: &str) -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let pem = signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public key should encode as PEM");
        Self {
            identifier: identifier.to_string(),
            pem,
            signing,
        }
    }

    /// Base64 DER signature, the form carried in the signature header.
    pub fn sign(&self, body: &[u8]) -> String {
        let signature: Signature = self.signing.sign(body);
        STANDARD.encode(signature.to_der().as_bytes())
    }

    pub fn sign_fixed(&self, body: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing.sign(body);
        signature.to_bytes().to_vec()
    }

    pub fn der(&self) -> Vec<u8> {
        self.signing
            .verifying_key()
            .to_public_key_der()
            .expect("public key should encode as DER")
            .as_bytes()
            .to_vec()
    }

    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            identifier: self.identifier.clone(),
            material: self.pem.clone(),
            is_current: true,
        }
    }
}

/// Key source that counts fetches and can be switched into failure mode.
#[derive(Clone)]
pub(crate) struct CountingKeySource {
    keys: Vec<VerificationKey>,
    fetches: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    delay: Duration,
}

impl CountingKeySource {
    pub fn new(keys: Vec<VerificationKey>) -> Self {
        Self {
            keys,
            fetches: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeySource for CountingKeySource {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(KeyFetchError::Status { status: 503 });
        }
        Ok(KeySet::new(self.keys.clone()))
    }
}
