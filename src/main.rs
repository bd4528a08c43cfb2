use std::sync::Arc;

use safemap::api::{AppState, router};
use safemap::config::Config;
use safemap::geocode::{CachedGeocoder, geocode_profiles};
use safemap::render::OsrmClient;
use safemap::{CityNetworks, data, score_areas};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = Config::load_from_env()?;

    // 1. Observations -> per-area danger scores
    let observations = data::load_observations(&config.data.sources)?;
    if observations.is_empty() {
        anyhow::bail!("no observations loaded, check [[data.sources]]");
    }
    let profiles = score_areas(&observations, &config.scoring);

    // 2. Coordinates; areas that do not resolve are left out of the graphs
    let geocoder = CachedGeocoder::from_config(&config.geocoder)?;
    let areas = geocode_profiles(profiles, &geocoder).await;
    if areas.is_empty() {
        anyhow::bail!("geocoding resolved no areas");
    }

    // 3. One complete graph per city
    let networks = CityNetworks::build(areas);

    let osrm = match &config.render.osrm_url {
        Some(url) => Some(OsrmClient::new(url, config.render.timeout())?),
        None => None,
    };

    let app = router(Arc::new(AppState { networks, osrm }));

    log::info!("API server running on http://{}", config.server.bind);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
