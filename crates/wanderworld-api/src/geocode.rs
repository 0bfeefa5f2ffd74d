use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use wanderworld_types::models::GeoPoint;

const MAPBOX_PLACES_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";

/// Forward geocoding: free-text place to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// The best match for `query`, or `None` when nothing matched.
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>>;
}

/// Used when no map token is configured. Never finds anything.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn forward(&self, _query: &str) -> Result<Option<GeoPoint>> {
        Ok(None)
    }
}

pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    coordinates: [f64; 2],
}

impl MapboxGeocoder {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, MAPBOX_PLACES_URL)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(base_url).context("invalid geocoding base url")?,
            token,
        })
    }

    fn request_url(&self, query: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("geocoding base url cannot take a path"))?
            .pop_if_empty()
            .push(&format!("{query}.json"));
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair("limit", "1");
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>> {
        let url = self.request_url(query)?;
        debug!("Geocoding '{}'", query);

        let body: FeatureCollection = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.features.into_iter().next().map(|feature| {
            let [lng, lat] = feature.geometry.coordinates;
            GeoPoint { lng, lat }
        }))
    }
}

/// Geocodes `query`, logging and swallowing failures so a listing can still
/// be saved without coordinates.
pub async fn locate(geocoder: &dyn Geocoder, query: &str) -> Option<GeoPoint> {
    match geocoder.forward(query).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            debug!("No geocoding result for '{}'", query);
            None
        }
        Err(e) => {
            warn!("Geocoding '{}' failed: {:#}", query, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_encodes_query_as_one_segment() {
        let geocoder = MapboxGeocoder::new("tok".into()).unwrap();
        let url = geocoder.request_url("New Delhi, India/North").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/New%20Delhi,%20India%2FNorth.json?access_token=tok&limit=1"
        );
    }

    #[test]
    fn parses_first_feature_longitude_first() {
        let body: FeatureCollection = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"geometry":{"type":"Point","coordinates":[77.2,28.6]}},
                {"geometry":{"type":"Point","coordinates":[0.0,0.0]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.features[0].geometry.coordinates, [77.2, 28.6]);
    }

    #[tokio::test]
    async fn disabled_geocoder_finds_nothing() {
        assert_eq!(locate(&DisabledGeocoder, "Paris, France").await, None);
    }
}
