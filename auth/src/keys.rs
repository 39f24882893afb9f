use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trusted public key as published by the signing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    #[serde(rename = "key_identifier")]
    pub identifier: String,
    /// PEM-armoured SubjectPublicKeyInfo
    #[serde(rename = "key")]
    pub material: String,
    #[serde(default)]
    pub is_current: bool,
}

/// Snapshot of the published keys. Replaced wholesale on refresh, never
/// mutated.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<VerificationKey>,
    fetched_at: DateTime<Utc>,
}

impl KeySet {
    pub fn new(keys: Vec<VerificationKey>) -> Self {
        Self {
            keys,
            fetched_at: Utc::now(),
        }
    }

    pub fn fetch_time(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// First key with a matching identifier.
    pub fn find(&self, identifier: &str) -> Option<&VerificationKey> {
        self.keys.iter().find(|key| key.identifier == identifier)
    }

    pub fn current(&self) -> Option<&VerificationKey> {
        self.keys.iter().find(|key| key.is_current)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Wire shape of the key endpoint: `{"public_keys": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct PublicKeysDocument {
    #[serde(default)]
    pub public_keys: Option<Vec<VerificationKey>>,
}
