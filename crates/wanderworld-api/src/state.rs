use std::sync::Arc;

use uuid::Uuid;

use wanderworld_db::Database;

use crate::error::AppError;
use crate::geocode::Geocoder;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Public map token handed to the browser for rendering listing maps.
    pub map_token: Option<String>,
}

impl AppStateInner {
    /// Runs a blocking database call off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let value = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
        Ok(value)
    }
}

/// Parses an identifier taken from the URL.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {what} id")))
}
