use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;
use tracing::{debug, instrument, warn};

use crate::PlannerError;
use crate::models::{CityForecast, WeatherSnapshot};
use crate::weather::{CityQuery, SnapshotFetcher};
use crate::window::TargetWindow;

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

/// On-disk key/value store with per-entry expiry
#[derive(Clone)]
pub struct ForecastCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl ForecastCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path).open().map_err(|e| {
            PlannerError::cache(format!("Failed to open cache at {}: {e}", path.display()))
        })?;
        let items = db.keyspace("forecasts", fjall::KeyspaceCreateOptions::default)?;
        Ok(Self { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Expired entries are removed and reported as a miss.
    #[instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        if now < entry.expires_at {
            debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// TTL scaled by a random factor in [0.9, 1.1) so entries written together
/// do not all expire together
fn jittered(ttl: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f64(jitter)
}

/// Fetcher decorator that serves forecasts from a `ForecastCache`
pub struct CachedFetcher<F> {
    inner: F,
    cache: ForecastCache,
    ttl: Duration,
}

impl<F: SnapshotFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: ForecastCache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<F: SnapshotFetcher> SnapshotFetcher for CachedFetcher<F> {
    #[instrument(skip(self, window), fields(city = %query.city))]
    async fn fetch_forecast(
        &self,
        query: &CityQuery,
        window: &TargetWindow,
    ) -> Result<CityForecast> {
        let key = query.cache_key(window);

        // A broken cache degrades to a direct fetch
        match self.cache.get::<Vec<WeatherSnapshot>>(&key).await {
            Ok(Some(snapshots)) => {
                debug!("Cache hit for {}", query.city);
                return Ok(CityForecast::new(query.city.clone(), snapshots)?);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {key}: {e:#}"),
        }

        let forecast = self.inner.fetch_forecast(query, window).await?;

        // A short forecast gains days as the window approaches
        let missing = forecast.missing_dates(window);
        if !missing.is_empty() {
            debug!(
                "Not caching forecast for {}: {} window days missing",
                query.city,
                missing.len()
            );
            return Ok(forecast);
        }

        if let Err(e) = self
            .cache
            .put(&key, forecast.snapshots().to_vec(), jittered(self.ttl))
            .await
        {
            warn!("Cache write failed for {key}: {e:#}");
        }
        Ok(forecast)
    }
}
