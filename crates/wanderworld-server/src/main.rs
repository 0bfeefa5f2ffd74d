use std::sync::Arc;

use axum::{ServiceExt, extract::Request};
use sha2::{Digest, Sha512};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::Key};
use tracing::info;

use wanderworld_api::AppStateInner;
use wanderworld_api::routes::{router, with_method_override};
use wanderworld_db::{Database, SqliteSessionStore};
use wanderworld_server::cleanup::run_cleanup_loop;
use wanderworld_server::config::Config;
use wanderworld_server::{geocoder, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let db = Arc::new(Database::open(&config.database_path)?);
    let state = Arc::new(AppStateInner {
        db: db.clone(),
        geocoder: geocoder(&config)?,
        map_token: config.map_token.clone(),
    });

    let store = SqliteSessionStore::new(db);

    // Background cleanup task (runs every hour)
    tokio::spawn(run_cleanup_loop(store.clone(), 3600));

    let key = Key::from(Sha512::digest(config.secret.as_bytes()).as_slice());
    let sessions = SessionManagerLayer::new(store)
        .with_secure(config.production)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)))
        .with_signed(key);

    let app = with_method_override(
        router(state, &config.public_dir)
            .layer(sessions)
            .layer(TraceLayer::new_for_http()),
    );

    info!(
        "Wanderworld listening on {} ({})",
        config.addr,
        if config.production { "production" } else { "development" }
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}
