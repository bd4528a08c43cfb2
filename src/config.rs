//! TOML configuration.
//!
//! The file path comes from `SAFEMAP_CONFIG` and defaults to
//! `safemap.toml`. Everything but the data sources has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::safety::ScoreWeights;

pub const CONFIG_ENV: &str = "SAFEMAP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "safemap.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub sources: Vec<DataSource>,
}

/// One observation file. `city` applies to every row; without it the file
/// needs a `city` column.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSource {
    pub path: PathBuf,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum GeocoderConfig {
    Nominatim {
        #[serde(default = "default_nominatim_url")]
        base_url: String,
        #[serde(default = "default_user_agent")]
        user_agent: String,
        /// Appended to every query, e.g. "Saket, Delhi, India".
        #[serde(default = "default_country")]
        country: String,
        #[serde(default = "default_min_interval_ms")]
        min_interval_ms: u64,
        /// One entry per attempt.
        #[serde(default = "default_attempt_timeouts")]
        attempt_timeouts_secs: Vec<u64>,
        #[serde(default = "default_retry_delay")]
        retry_delay_secs: u64,
    },
    /// CSV lookup table `city,area_name,latitude,longitude`.
    Static { path: PathBuf },
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self::Nominatim {
            base_url: default_nominatim_url(),
            user_agent: default_user_agent(),
            country: default_country(),
            min_interval_ms: default_min_interval_ms(),
            attempt_timeouts_secs: default_attempt_timeouts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_user_agent() -> String {
    concat!("safemap/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_country() -> String {
    "India".to_string()
}

const fn default_min_interval_ms() -> u64 {
    1000
}

fn default_attempt_timeouts() -> Vec<u64> {
    vec![10, 15]
}

const fn default_retry_delay() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// OSRM route endpoint; without it routes are drawn as straight lines.
    pub osrm_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            osrm_url: None,
            timeout_secs: 10,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;

        // Relative paths in the file are resolved against its directory.
        if let Some(dir) = path.parent() {
            for source in &mut config.data.sources {
                if source.path.is_relative() {
                    source.path = dir.join(&source.path);
                }
            }
            if let GeocoderConfig::Static { path: table } = &mut config.geocoder {
                if table.is_relative() {
                    *table = dir.join(&*table);
                }
            }
        }
        Ok(config)
    }

    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        log::info!("Reading config from {path}");
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [[data.sources]]
            path = "data/delhi.csv"
            city = "Delhi"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.scoring, ScoreWeights::default());
        assert_eq!(config.data.sources.len(), 1);
        assert_eq!(config.data.sources[0].city.as_deref(), Some("Delhi"));
        assert!(config.render.osrm_url.is_none());
        match config.geocoder {
            GeocoderConfig::Nominatim {
                country,
                min_interval_ms,
                attempt_timeouts_secs,
                retry_delay_secs,
                ..
            } => {
                assert_eq!(country, "India");
                assert_eq!(min_interval_ms, 1000);
                assert_eq!(attempt_timeouts_secs, vec![10, 15]);
                assert_eq!(retry_delay_secs, 5);
            }
            GeocoderConfig::Static { .. } => panic!("expected nominatim default"),
        }
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [[data.sources]]
            path = "all.csv"

            [scoring]
            crime_weight = 0.5
            lighting_weight = 0.5

            [geocoder]
            provider = "static"
            path = "coords.csv"

            [render]
            osrm_url = "http://localhost:5000/route/v1/foot"
            timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(config.data.sources[0].city.is_none());
        assert_eq!(config.scoring.crime_weight, 0.5);
        assert!(matches!(config.geocoder, GeocoderConfig::Static { .. }));
        assert_eq!(config.render.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn data_section_is_required() {
        assert!(matches!(
            Config::from_toml("[server]\nbind = \"0.0.0.0:1\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::load("no/such/safemap.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
