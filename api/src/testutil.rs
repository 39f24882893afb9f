use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use taskpilot_auth::{
    DEFAULT_KEY_TTL, KeyCache, KeyFetchError, KeySet, KeySource, RequestAuthenticator,
    SignatureHeaders, VerificationKey,
};
use taskpilot_core::weather::WeatherReport;

use crate::github::DirectoryError;
use crate::identity::UserDirectory;
use crate::state::AppState;
use crate::store::MemoryTaskStore;
use crate::weather::{WeatherError, WeatherProvider};

pub(crate) const OCTOCAT: &str = "ghu_octocat";
pub(crate) const HUBOT: &str = "ghu_hubot";

/// Resolves `ghu_<login>` tokens; anything else is rejected.
pub(crate) struct FakeDirectory;

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn login_for(&self, token: &str) -> Result<String, DirectoryError> {
        token
            .strip_prefix("ghu_")
            .map(str::to_string)
            .ok_or(DirectoryError::Rejected)
    }
}

#[derive(Default)]
pub(crate) struct FakeWeather {
    failing: bool,
}

impl FakeWeather {
    pub fn failing() -> Self {
        Self { failing: true }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(
        &self,
        city: &str,
        country: Option<&str>,
    ) -> Result<WeatherReport, WeatherError> {
        if self.failing {
            return Err(WeatherError::Transport("connection refused".to_string()));
        }
        Ok(WeatherReport {
            location: city.to_string(),
            country: country.unwrap_or("PT").to_string(),
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            temperature_c: 21.5,
            humidity_percent: 60,
            wind_speed_ms: 3.2,
            sunrise: Utc.with_ymd_and_hms(2026, 1, 4, 7, 55, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2026, 1, 4, 17, 30, 0).unwrap(),
        })
    }
}

/// Unsigned skillset, in-memory store, fake upstreams.
pub(crate) fn state() -> (AppState, Arc<MemoryTaskStore>) {
    let store = Arc::new(MemoryTaskStore::new());
    let state = AppState {
        store: store.clone(),
        users: Arc::new(FakeDirectory),
        weather: Arc::new(FakeWeather::default()),
        skillset_auth: None,
    };
    (state, store)
}

pub(crate) struct Signer {
    key_id: String,
    signing: SigningKey,
}

impl Signer {
    pub fn generate(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            signing: SigningKey::random(&mut OsRng),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, body: &[u8]) -> String {
        let signature: Signature = self.signing.sign(body);
        STANDARD.encode(signature.to_der().as_bytes())
    }

    pub fn authenticator(&self) -> Arc<RequestAuthenticator> {
        let pem = self
            .signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public key should encode as PEM");
        let keys = KeySet::new(vec![VerificationKey {
            identifier: self.key_id.clone(),
            material: pem,
            is_current: true,
        }]);
        let cache = KeyCache::new(Arc::new(StaticKeys(keys)), DEFAULT_KEY_TTL);
        Arc::new(RequestAuthenticator::new(
            Arc::new(cache),
            SignatureHeaders::default(),
        ))
    }
}

struct StaticKeys(KeySet);

#[async_trait]
impl KeySource for StaticKeys {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        Ok(self.0.clone())
    }
}
