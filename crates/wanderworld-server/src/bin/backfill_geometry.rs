//! Geocodes every listing that was saved without coordinates.

use std::sync::Arc;

use anyhow::bail;
use tracing::{info, warn};

use wanderworld_api::geocode::locate;
use wanderworld_db::Database;
use wanderworld_server::config::Config;
use wanderworld_server::{geocoder, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    if config.map_token.is_none() {
        bail!("MAP_TOKEN must be set to backfill listing coordinates");
    }
    let geocoder = geocoder(&config)?;
    let db = Arc::new(Database::open(&config.database_path)?);

    let pending = {
        let db = db.clone();
        tokio::task::spawn_blocking(move || db.listings_without_geometry()).await??
    };
    info!("{} listings have no coordinates", pending.len());

    let mut updated = 0usize;
    for listing in pending {
        let query = format!("{}, {}", listing.location, listing.country);
        let Some(point) = locate(geocoder.as_ref(), &query).await else {
            warn!("No location found for listing {} ({})", listing.id, query);
            continue;
        };

        let db = db.clone();
        let id = listing.id;
        tokio::task::spawn_blocking(move || db.set_listing_geometry(id, point)).await??;
        updated += 1;
    }

    info!("Backfilled coordinates for {} listings", updated);
    Ok(())
}
