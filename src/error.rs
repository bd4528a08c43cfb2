//! Error types for every layer of the service.
//!
//! "No path" and "no variance" are not errors: the pathfinder answers
//! `Ok(None)` and the normalizer maps flat series to zero.

use std::time::Duration;

use thiserror::Error;

/// A route query that cannot be answered against the loaded networks.
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("unknown city '{0}'")]
    UnknownCity(String),

    #[error("area '{area}' is not part of the {city} network")]
    UnknownArea { city: String, area: String },

    /// A graph node without a coordinate or danger score. Networks built by
    /// `CityNetworks::build` never produce this.
    #[error("area '{0}' has no coordinate or danger score")]
    IncompleteNetwork(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate ({lat}, {lon}) is outside [-90, 90] x [-180, 180]")]
    OutOfRange { lat: f64, lon: f64 },
}

/// Failures while reading observation files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("geocoder did not answer within {0:?}")]
    Timeout(Duration),

    #[error("failed to load lookup table: {0}")]
    Table(#[from] DataError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("failed to write map: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize map: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
