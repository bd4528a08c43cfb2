use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

use crate::distance::{LatLon, haversine_km};
use crate::error::RouteError;
use crate::pathfinder::{SafePath, find_safest_path};
use crate::safety::AreaProfile;

/// Area identifier, unique within one city.
pub type AreaId = String;

pub type CoordinateMap = HashMap<AreaId, LatLon>;
pub type DangerMap = HashMap<AreaId, f64>;

/// An area profile that resolved to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedArea {
    #[serde(flatten)]
    pub profile: AreaProfile,
    pub location: LatLon,
}

/// Complete undirected graph over the areas of one city. Edges carry no
/// weight; search cost comes from the destination's danger score.
#[derive(Debug, Clone, Default)]
pub struct CityGraph {
    graph: UnGraph<AreaId, ()>,
    index: HashMap<AreaId, NodeIndex>,
}

impl CityGraph {
    /// Connects every pair of distinct areas once. Repeated ids are ignored.
    pub fn complete<I>(areas: I) -> Self
    where
        I: IntoIterator<Item = AreaId>,
    {
        let mut graph = UnGraph::default();
        let mut index = HashMap::new();

        for area in areas {
            if index.contains_key(&area) {
                continue;
            }
            let idx = graph.add_node(area.clone());
            index.insert(area, idx);
        }

        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        graph.reserve_edges(nodes.len() * nodes.len().saturating_sub(1) / 2);
        for (a, b) in nodes.into_iter().tuple_combinations() {
            graph.add_edge(a, b, ());
        }

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, area: &str) -> bool {
        self.index.contains_key(area)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Areas in insertion order.
    pub fn areas(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    pub(crate) fn node(&self, area: &str) -> Option<NodeIndex> {
        self.index.get(area).copied()
    }

    pub(crate) fn inner(&self) -> &UnGraph<AreaId, ()> {
        &self.graph
    }
}

/// One city's graph together with its coordinate and danger lookups, all
/// keyed by the same area ids.
#[derive(Debug, Clone)]
pub struct CityNetwork {
    pub city: String,
    pub graph: CityGraph,
    pub coords: CoordinateMap,
    pub danger: DangerMap,
    pub profiles: Vec<GeocodedArea>,
}

impl CityNetwork {
    pub fn route(&self, start: &str, end: &str) -> Result<Option<SafePath>, RouteError> {
        find_safest_path(&self.graph, &self.coords, &self.danger, start, end).map_err(|e| {
            match e {
                RouteError::UnknownArea { area, .. } => RouteError::UnknownArea {
                    city: self.city.clone(),
                    area,
                },
                other => other,
            }
        })
    }

    /// Area closest to `target` by great-circle distance.
    pub fn nearest_area(&self, target: LatLon) -> Option<&str> {
        self.graph
            .areas()
            .filter_map(|area| self.coords.get(area).map(|&c| (area, haversine_km(c, target))))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(area, _)| area)
    }
}

/// Every city's network, keyed by city name.
#[derive(Debug, Clone, Default)]
pub struct CityNetworks {
    cities: BTreeMap<String, CityNetwork>,
}

impl CityNetworks {
    pub fn build(areas: Vec<GeocodedArea>) -> Self {
        let mut by_city: BTreeMap<String, Vec<GeocodedArea>> = BTreeMap::new();
        for area in areas {
            by_city
                .entry(area.profile.city.clone())
                .or_default()
                .push(area);
        }

        let mut cities = BTreeMap::new();
        for (city, mut areas) in by_city {
            let mut seen = HashSet::new();
            areas.retain(|a| {
                let fresh = seen.insert(a.profile.area_name.clone());
                if !fresh {
                    log::warn!("Duplicate area {} in {city}, keeping the first", a.profile.area_name);
                }
                fresh
            });

            let graph = CityGraph::complete(areas.iter().map(|a| a.profile.area_name.clone()));
            let coords = areas
                .iter()
                .map(|a| (a.profile.area_name.clone(), a.location))
                .collect();
            let danger = areas
                .iter()
                .map(|a| (a.profile.area_name.clone(), a.profile.danger_score))
                .collect();

            log::info!(
                "Built graph for {city}: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );

            cities.insert(
                city.clone(),
                CityNetwork {
                    city,
                    graph,
                    coords,
                    danger,
                    profiles: areas,
                },
            );
        }

        Self { cities }
    }

    pub fn get(&self, city: &str) -> Result<&CityNetwork, RouteError> {
        self.cities
            .get(city)
            .ok_or_else(|| RouteError::UnknownCity(city.to_string()))
    }

    pub fn cities(&self) -> impl Iterator<Item = &CityNetwork> + '_ {
        self.cities.values()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
