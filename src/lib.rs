//! Safety-weighted routing between the areas of a city.
//!
//! Observations are aggregated into per-area danger scores ([`safety`]),
//! geocoded ([`geocode`]), joined into one complete graph per city
//! ([`graph`]) and searched with a risk-accumulating best-first search
//! ([`pathfinder`]). Routes are served over HTTP ([`api`]) and drawn as
//! GeoJSON ([`render`]).

pub mod api;
pub mod config;
pub mod data;
pub mod distance;
pub mod error;
pub mod geocode;
pub mod graph;
pub mod pathfinder;
pub mod render;
pub mod safety;

pub use distance::{LatLon, haversine_km};
pub use error::{CoordinateError, RouteError};
pub use graph::{AreaId, CityGraph, CityNetwork, CityNetworks, GeocodedArea};
pub use pathfinder::{SafePath, find_safest_path};
pub use safety::{AreaProfile, Observation, ScoreWeights, score_areas};
