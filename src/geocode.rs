//! Area name to coordinate resolution.
//!
//! Upstream providers implement [`Geocoder`]. [`CachedGeocoder`] owns the
//! cache, throttling and retries so that scoring and search never do.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::GeocoderConfig;
use crate::distance::LatLon;
use crate::error::{DataError, GeocodeError};
use crate::graph::GeocodedArea;
use crate::safety::AreaProfile;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the provider answered but found nothing.
    async fn geocode(&self, city: &str, area: &str) -> Result<Option<LatLon>, GeocodeError>;
}

// ── Nominatim ─────────────────────────────────────────────────────────────────

/// Free-form search against a Nominatim instance.
///
/// The public instance allows one request per second; wrap this in a
/// [`CachedGeocoder`] with `min_interval` of at least that.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, country: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            country: country.to_string(),
        })
    }

    fn query(&self, city: &str, area: &str) -> String {
        if self.country.is_empty() {
            format!("{area}, {city}")
        } else {
            format!("{area}, {city}, {}", self.country)
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, city: &str, area: &str) -> Result<Option<LatLon>, GeocodeError> {
        let query = self.query(city, area);
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.as_str()), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_nominatim(&body)
    }
}

fn parse_nominatim(body: &serde_json::Value) -> Result<Option<LatLon>, GeocodeError> {
    let parse_err = |message: &str| GeocodeError::Parse {
        message: message.to_string(),
    };

    let results = body
        .as_array()
        .ok_or_else(|| parse_err("Nominatim response is not an array"))?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let coord = |key: &str| {
        first[key]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| parse_err(&format!("Missing {key} in Nominatim response")))
    };
    let (lat, lon) = (coord("lat")?, coord("lon")?);

    LatLon::new(lat, lon)
        .map(Some)
        .map_err(|e| parse_err(&e.to_string()))
}

// ── Static table ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TableRow {
    city: String,
    area_name: String,
    latitude: f64,
    longitude: f64,
}

/// Fixed lookup table, for offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    table: HashMap<(String, String), LatLon>,
}

impl StaticGeocoder {
    pub fn from_path(path: &Path) -> Result<Self, GeocodeError> {
        let file = std::fs::File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Rows with out-of-range coordinates are dropped with a warning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeocodeError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut table = HashMap::new();
        for row in rdr.deserialize::<TableRow>() {
            let row = row.map_err(DataError::from)?;
            match LatLon::new(row.latitude, row.longitude) {
                Ok(location) => {
                    table.insert((row.city, row.area_name), location);
                }
                Err(e) => log::warn!("Ignoring {} in {}: {e}", row.area_name, row.city),
            }
        }
        Ok(Self { table })
    }

    pub fn insert(&mut self, city: &str, area: &str, location: LatLon) {
        self.table
            .insert((city.to_string(), area.to_string()), location);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, city: &str, area: &str) -> Result<Option<LatLon>, GeocodeError> {
        Ok(self
            .table
            .get(&(city.to_string(), area.to_string()))
            .copied())
    }
}

// ── Cache, throttle, retry ────────────────────────────────────────────────────

/// How often and how patiently to ask the upstream geocoder.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Timeout for each attempt; its length is the attempt count.
    pub attempt_timeouts: Vec<Duration>,
    /// Pause after a failed attempt.
    pub retry_delay: Duration,
    /// Minimum spacing between upstream calls.
    pub min_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeouts: vec![Duration::from_secs(10), Duration::from_secs(15)],
            retry_delay: Duration::from_secs(5),
            min_interval: Duration::from_secs(1),
        }
    }
}

struct CacheState {
    resolved: HashMap<(String, String), Option<LatLon>>,
    last_call: Option<Instant>,
}

pub struct CachedGeocoder {
    inner: Box<dyn Geocoder>,
    policy: RetryPolicy,
    state: Mutex<CacheState>,
}

impl CachedGeocoder {
    pub fn new(inner: Box<dyn Geocoder>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            state: Mutex::new(CacheState {
                resolved: HashMap::new(),
                last_call: None,
            }),
        }
    }

    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        match config {
            GeocoderConfig::Nominatim {
                base_url,
                user_agent,
                country,
                min_interval_ms,
                attempt_timeouts_secs,
                retry_delay_secs,
            } => {
                let policy = RetryPolicy {
                    attempt_timeouts: attempt_timeouts_secs
                        .iter()
                        .map(|s| Duration::from_secs(*s))
                        .collect(),
                    retry_delay: Duration::from_secs(*retry_delay_secs),
                    min_interval: Duration::from_millis(*min_interval_ms),
                };
                let inner = NominatimGeocoder::new(base_url, user_agent, country)?;
                Ok(Self::new(Box::new(inner), policy))
            }
            GeocoderConfig::Static { path } => {
                let inner = StaticGeocoder::from_path(path)?;
                log::info!("Loaded {} fixed coordinates from {}", inner.len(), path.display());
                let policy = RetryPolicy {
                    attempt_timeouts: vec![Duration::from_secs(1)],
                    retry_delay: Duration::ZERO,
                    min_interval: Duration::ZERO,
                };
                Ok(Self::new(Box::new(inner), policy))
            }
        }
    }

    /// Resolves an area, answering repeated lookups from the cache. Failures
    /// after the last attempt are cached as unresolved.
    pub async fn resolve(&self, city: &str, area: &str) -> Option<LatLon> {
        let key = (city.to_string(), area.to_string());
        let mut state = self.state.lock().await;
        if let Some(hit) = state.resolved.get(&key) {
            return *hit;
        }

        let attempts = self.policy.attempt_timeouts.len();
        let mut outcome = None;
        for (attempt, timeout) in self.policy.attempt_timeouts.iter().enumerate() {
            if let Some(last) = state.last_call {
                tokio::time::sleep_until(last + self.policy.min_interval).await;
            }
            state.last_call = Some(Instant::now());

            let result = tokio::time::timeout(*timeout, self.inner.geocode(city, area))
                .await
                .unwrap_or_else(|_| Err(GeocodeError::Timeout(*timeout)));

            match result {
                Ok(found) => {
                    log::info!("Geocoded {area}, {city} -> {found:?}");
                    outcome = found;
                    break;
                }
                Err(e) if attempt + 1 < attempts => {
                    log::warn!(
                        "Geocoding {area}, {city} failed ({e}), retrying in {:?}",
                        self.policy.retry_delay
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    log::warn!("Could not geocode {area}, {city} after {attempts} attempts: {e}");
                }
            }
        }

        state.resolved.insert(key, outcome);
        outcome
    }
}

/// Attaches coordinates to every profile, dropping the ones that do not
/// resolve.
pub async fn geocode_profiles(
    profiles: Vec<AreaProfile>,
    geocoder: &CachedGeocoder,
) -> Vec<GeocodedArea> {
    let total = profiles.len();
    let mut areas = Vec::with_capacity(total);
    for profile in profiles {
        match geocoder.resolve(&profile.city, &profile.area_name).await {
            Some(location) => areas.push(GeocodedArea { profile, location }),
            None => log::warn!(
                "Dropping {}, {}: no coordinates",
                profile.area_name,
                profile.city
            ),
        }
    }
    log::info!("Geocoded {} of {total} areas", areas.len());
    areas
}
