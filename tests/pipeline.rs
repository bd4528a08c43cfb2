//! End-to-end run over the bundled sample data with the offline geocoder.

use std::path::PathBuf;

use safemap::config::Config;
use safemap::data::load_observations;
use safemap::geocode::{CachedGeocoder, geocode_profiles};
use safemap::{CityNetworks, RouteError, score_areas};

fn sample_config() -> Config {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("safemap.toml");
    Config::load(path).unwrap()
}

async fn build_networks() -> CityNetworks {
    let config = sample_config();
    let observations = load_observations(&config.data.sources).unwrap();
    let profiles = score_areas(&observations, &config.scoring);
    let geocoder = CachedGeocoder::from_config(&config.geocoder).unwrap();
    CityNetworks::build(geocode_profiles(profiles, &geocoder).await)
}

#[tokio::test]
async fn sample_cities_are_scored_and_connected() {
    let networks = build_networks().await;
    assert_eq!(networks.len(), 2);

    for network in networks.cities() {
        let n = network.graph.node_count();
        assert_eq!(network.graph.edge_count(), n * (n - 1) / 2);

        let scores: Vec<f64> = network.danger.values().copied().collect();
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 1.0, "{}", network.city);
        assert_eq!(max, 10.0, "{}", network.city);
    }

    let delhi = networks.get("Delhi").unwrap();
    assert_eq!(delhi.graph.node_count(), 5);
    assert_eq!(delhi.danger["Karol Bagh"], 10.0);
    assert_eq!(delhi.danger["Saket"], 1.0);

    let kochi = networks.get("Kochi").unwrap();
    assert_eq!(kochi.danger["Vyttila"], 10.0);
    assert_eq!(kochi.danger["Fort Kochi"], 1.0);
}

#[tokio::test]
async fn routes_are_stable_across_runs() {
    let first = build_networks().await;
    let second = build_networks().await;

    let a = first.get("Delhi").unwrap().route("Karol Bagh", "Saket").unwrap();
    let b = second.get("Delhi").unwrap().route("Karol Bagh", "Saket").unwrap();
    assert_eq!(a, b);

    let path = a.unwrap();
    assert_eq!(path.areas, vec!["Karol Bagh", "Saket"]);
    assert_eq!(path.cost, 1.0);
}

#[tokio::test]
async fn queries_outside_the_network_are_rejected() {
    let networks = build_networks().await;
    assert_eq!(
        networks.get("Chennai").unwrap_err(),
        RouteError::UnknownCity("Chennai".into())
    );
    assert_eq!(
        networks
            .get("Kochi")
            .unwrap()
            .route("Fort Kochi", "Saket")
            .unwrap_err(),
        RouteError::UnknownArea {
            city: "Kochi".into(),
            area: "Saket".into()
        }
    );
}
