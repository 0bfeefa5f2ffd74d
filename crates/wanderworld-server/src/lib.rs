pub mod cleanup;
pub mod config;

use std::sync::Arc;

use tracing::{info, warn};
use wanderworld_api::geocode::{DisabledGeocoder, Geocoder, MapboxGeocoder};

use crate::config::Config;

/// Installs the fmt subscriber, honouring `RUST_LOG` when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wanderworld=debug,tower_http=debug".into()),
        )
        .init();
}

/// Mapbox when a token is configured, otherwise listings are stored without coordinates.
pub fn geocoder(config: &Config) -> anyhow::Result<Arc<dyn Geocoder>> {
    match &config.map_token {
        Some(token) => {
            info!("Geocoding through Mapbox");
            Ok(Arc::new(MapboxGeocoder::new(token.clone())?))
        }
        None => {
            warn!("MAP_TOKEN is not set; new listings will have no map location");
            Ok(Arc::new(DisabledGeocoder))
        }
    }
}
