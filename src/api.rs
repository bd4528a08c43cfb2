use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::distance::LatLon;
use crate::error::{CoordinateError, RouteError};
use crate::graph::{CityNetworks, GeocodedArea};
use crate::render::{OsrmClient, RouteMap, path_coordinates};

/// Shared, read-only state. Each request runs its own search.
pub struct AppState {
    pub networks: CityNetworks,
    pub osrm: Option<OsrmClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/cities", get(list_cities))
        .route("/cities/:city/areas", get(list_areas))
        .route("/route", post(calculate_route))
        .layer(cors)
        .with_state(state)
}

// --- API DTOs ---

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Area(String),
    /// [lat, lon], snapped to the nearest area of the city
    Point([f64; 2]),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub city: String,
    pub start: Endpoint,
    pub end: Endpoint,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub city: String,
    /// `None` when no path was found.
    pub path: Option<Vec<String>>,
    pub cost: Option<f64>,
    pub map: Option<RouteMap>,
}

#[derive(Debug, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub areas: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub enum ApiError {
    Route(RouteError),
    Coordinate(CoordinateError),
}

impl From<RouteError> for ApiError {
    fn from(value: RouteError) -> Self {
        Self::Route(value)
    }
}

impl From<CoordinateError> for ApiError {
    fn from(value: CoordinateError) -> Self {
        Self::Coordinate(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Route(e @ (RouteError::UnknownCity(_) | RouteError::UnknownArea { .. })) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            Self::Route(e @ RouteError::IncompleteNetwork(_)) => {
                log::error!("{e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Coordinate(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// --- Handlers ---

async fn list_cities(State(state): State<Arc<AppState>>) -> Json<Vec<CitySummary>> {
    Json(
        state
            .networks
            .cities()
            .map(|n| CitySummary {
                city: n.city.clone(),
                areas: n.graph.node_count(),
            })
            .collect(),
    )
}

async fn list_areas(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<Vec<GeocodedArea>>, ApiError> {
    let network = state.networks.get(&city)?;
    Ok(Json(network.profiles.clone()))
}

async fn calculate_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let network = state.networks.get(&payload.city)?;

    // 1. Resolve endpoints to areas
    let resolve = |endpoint: &Endpoint| -> Result<String, ApiError> {
        match endpoint {
            Endpoint::Area(name) => Ok(name.clone()),
            Endpoint::Point([lat, lon]) => {
                let target = LatLon::new(*lat, *lon)?;
                network
                    .nearest_area(target)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        RouteError::UnknownArea {
                            city: network.city.clone(),
                            area: format!("{lat},{lon}"),
                        }
                        .into()
                    })
            }
        }
    };
    let start = resolve(&payload.start)?;
    let end = resolve(&payload.end)?;

    // 2. Search
    let Some(found) = network.route(&start, &end)? else {
        log::info!("No path in {} from {start} to {end}", network.city);
        return Ok(Json(RouteResponse {
            city: network.city.clone(),
            path: None,
            cost: None,
            map: None,
        }));
    };
    log::info!("Path found: {}", found.areas.join(" -> "));

    // 3. Render
    let road = match &state.osrm {
        Some(osrm) => {
            osrm.try_route_geometry(&path_coordinates(&found.areas, network))
                .await
        }
        None => None,
    };
    let map = RouteMap::build(&found.areas, network, road);

    Ok(Json(RouteResponse {
        city: network.city.clone(),
        path: Some(found.areas),
        cost: Some(found.cost),
        map,
    }))
}
