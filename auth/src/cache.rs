//! Time-bounded cache of the trusted key set.
//!
//! Two tiers, both `moka` caches holding a single entry:
//!
//! - `keys`: the live set, evicted after the TTL. Concurrent misses are
//!   coalesced by `try_get_with` into one fetch whose result, success or
//!   failure, reaches every waiter.
//! - `fallback`: the last set that was fetched successfully. A failed
//!   refresh never touches it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;

use crate::error::KeyFetchError;
use crate::keys::KeySet;
use crate::source::KeySource;

/// Default lifetime of a fetched key set (30 minutes).
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(30 * 60);

pub struct KeyCache {
    source: Arc<dyn KeySource>,
    keys: Cache<(), Arc<KeySet>>,
    fallback: Cache<(), Arc<KeySet>>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn KeySource>, ttl: Duration) -> Self {
        Self {
            source,
            keys: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
            fallback: Cache::builder().max_capacity(1).build(),
        }
    }

    /// Return the held key set if it is younger than the TTL, otherwise
    /// refresh it (joining an in-flight refresh if there is one).
    pub async fn get_keys(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        let result = self
            .keys
            .try_get_with((), async {
                tracing::debug!("refreshing public key set");
                let keys = Arc::new(self.source.fetch().await?);
                tracing::debug!(
                    key_count = keys.len(),
                    fetched_at = %keys.fetch_time(),
                    "public key set cached"
                );
                self.fallback.insert((), Arc::clone(&keys)).await;
                Ok::<_, KeyFetchError>(keys)
            })
            .await;

        match result {
            Ok(keys) => Ok(keys),
            Err(err) => {
                let previous_age_secs = self
                    .fallback
                    .get(&())
                    .await
                    .map(|keys| (Utc::now() - keys.fetch_time()).num_seconds());
                tracing::warn!(
                    error = %err,
                    previous_age_secs = ?previous_age_secs,
                    "public key refresh failed; previous key set left in place"
                );
                Err((*err).clone())
            }
        }
    }

    /// The last successfully fetched key set regardless of age, without
    /// triggering a refresh.
    pub async fn cached(&self) -> Option<Arc<KeySet>> {
        self.fallback.get(&()).await
    }
}
