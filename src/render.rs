//! Route maps as GeoJSON.
//!
//! Every area of the city becomes a colour-coded point, the route a line.
//! Road geometry comes from OSRM when configured; otherwise, or when OSRM
//! fails, consecutive path areas are joined by straight segments.

use std::path::Path;
use std::time::Duration;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;

use crate::distance::LatLon;
use crate::error::RenderError;
use crate::graph::CityNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerLevel {
    Low,
    Moderate,
    High,
}

impl DangerLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 3.5 {
            Self::Low
        } else if score < 6.0 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Moderate => "orange",
            Self::High => "red",
        }
    }
}

/// Where the drawn route line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Road,
    Straight,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteMap {
    /// Mean of the path coordinates.
    pub center: LatLon,
    pub source: RouteSource,
    pub features: FeatureCollection,
}

impl RouteMap {
    /// `None` for an empty path. Path areas missing from the network are
    /// skipped.
    pub fn build(
        path: &[String],
        network: &CityNetwork,
        road_geometry: Option<Vec<LatLon>>,
    ) -> Option<Self> {
        let path_coords = path_coordinates(path, network);
        if path_coords.is_empty() {
            return None;
        }

        let n = path_coords.len() as f64;
        let center = LatLon {
            lat: path_coords.iter().map(|c| c.lat).sum::<f64>() / n,
            lon: path_coords.iter().map(|c| c.lon).sum::<f64>() / n,
        };

        let mut features = Vec::with_capacity(network.graph.node_count() + 3);
        for area in network.graph.areas() {
            let (Some(&location), Some(&score)) =
                (network.coords.get(area), network.danger.get(area))
            else {
                continue;
            };
            let level = DangerLevel::from_score(score);
            features.push(point_feature(
                location,
                json!({
                    "kind": "area",
                    "name": area,
                    "danger_score": score,
                    "level": level,
                    "color": level.color(),
                }),
            ));
        }

        let (first, last) = (&path[0], &path[path.len() - 1]);
        features.push(point_feature(
            path_coords[0],
            json!({ "kind": "start", "name": first, "color": "green" }),
        ));
        features.push(point_feature(
            path_coords[path_coords.len() - 1],
            json!({ "kind": "end", "name": last, "color": "red" }),
        ));

        let (line, source, color) = match road_geometry {
            Some(road) if road.len() >= 2 => (road, RouteSource::Road, "blue"),
            _ => (path_coords, RouteSource::Straight, "purple"),
        };
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(
                line.into_iter().map(LatLon::to_position).collect(),
            ))),
            id: None,
            properties: properties(json!({
                "kind": "route",
                "source": source,
                "color": color,
            })),
            foreign_members: None,
        });

        Some(Self {
            center,
            source,
            features: FeatureCollection {
                bbox: None,
                features,
                foreign_members: properties(json!({ "center": [center.lat, center.lon] })),
            },
        })
    }
}

pub fn path_coordinates(path: &[String], network: &CityNetwork) -> Vec<LatLon> {
    path.iter()
        .filter_map(|area| network.coords.get(area).copied())
        .collect()
}

fn properties(value: serde_json::Value) -> Option<JsonObject> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

fn point_feature(location: LatLon, props: serde_json::Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(location.to_position()))),
        id: None,
        properties: properties(props),
        foreign_members: None,
    }
}

/// Writes the map's feature collection as JSON.
pub fn save_map(map: &RouteMap, path: impl AsRef<Path>) -> Result<(), RenderError> {
    let text = serde_json::to_string_pretty(&map.features)?;
    std::fs::write(path.as_ref(), text)?;
    log::info!("Route map saved to {}", path.as_ref().display());
    Ok(())
}

// ── OSRM ──────────────────────────────────────────────────────────────────────

/// Client for an OSRM `route` endpoint, e.g.
/// `http://router.project-osrm.org/route/v1/driving`.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, waypoints: &[LatLon]) -> String {
        // OSRM takes lon,lat pairs
        let coords = waypoints
            .iter()
            .map(|c| format!("{},{}", c.lon, c.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}/{coords}", self.base_url)
    }

    /// Road geometry through `waypoints` in order.
    pub async fn route_geometry(&self, waypoints: &[LatLon]) -> Result<Vec<LatLon>, RenderError> {
        let body: serde_json::Value = self
            .client
            .get(self.url(waypoints))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_osrm(&body)
    }

    /// Like [`Self::route_geometry`], logging failures and returning `None`
    /// so the caller can draw straight lines.
    pub async fn try_route_geometry(&self, waypoints: &[LatLon]) -> Option<Vec<LatLon>> {
        if waypoints.len() < 2 {
            return None;
        }
        match self.route_geometry(waypoints).await {
            Ok(line) => Some(line),
            Err(e) => {
                log::warn!("Could not fetch OSRM route, using straight lines: {e}");
                None
            }
        }
    }
}

fn parse_osrm(body: &serde_json::Value) -> Result<Vec<LatLon>, RenderError> {
    let parse_err = |message: &str| RenderError::Parse {
        message: message.to_string(),
    };

    if let Some(code) = body["code"].as_str() {
        if code != "Ok" {
            return Err(parse_err(&format!("OSRM answered {code}")));
        }
    }

    let coords = body["routes"][0]["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| parse_err("OSRM response has no route geometry"))?;

    coords
        .iter()
        .map(|pair| match (pair[0].as_f64(), pair[1].as_f64()) {
            (Some(lon), Some(lat)) => {
                LatLon::new(lat, lon).map_err(|e| parse_err(&e.to_string()))
            }
            _ => Err(parse_err("OSRM coordinate is not a [lon, lat] pair")),
        })
        .collect()
}
