//! Database row types — these map directly to SQLite rows.
//! Conversions into the domain models in wanderworld-types live here so
//! the query layer can hand typed values to callers.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use wanderworld_types::models::{GeoPoint, Image, Listing, Review, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub location: String,
    pub country: String,
    pub image_url: String,
    pub image_filename: String,
    pub geometry_lng: Option<f64>,
    pub geometry_lat: Option<f64>,
    pub owner_id: Option<String>,
    pub created_at: String,
}

pub struct ReviewRow {
    pub id: String,
    pub listing_id: String,
    pub author_id: String,
    pub author_username: Option<String>,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id, "user id")?,
            username: self.username,
            email: self.email,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl ListingRow {
    pub fn into_listing(self) -> Result<Listing> {
        let geometry = match (self.geometry_lng, self.geometry_lat) {
            (Some(lng), Some(lat)) => Some(GeoPoint { lng, lat }),
            _ => None,
        };
        let owner = self
            .owner_id
            .as_deref()
            .map(|owner| parse_id(owner, "listing owner"))
            .transpose()?;

        Ok(Listing {
            id: parse_id(&self.id, "listing id")?,
            title: self.title,
            description: self.description,
            price: self.price,
            location: self.location,
            country: self.country,
            image: Image {
                url: self.image_url,
                filename: self.image_filename,
            },
            geometry,
            owner,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl ReviewRow {
    pub fn into_review(self) -> Result<Review> {
        Ok(Review {
            id: parse_id(&self.id, "review id")?,
            listing_id: parse_id(&self.listing_id, "review listing")?,
            rating: u8::try_from(self.rating)
                .with_context(|| format!("rating {} out of range on review {}", self.rating, self.id))?,
            comment: self.comment,
            author: parse_id(&self.author_id, "review author")?,
            author_username: self.author_username,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt {what} '{raw}'"))
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("corrupt timestamp '{raw}'"))
}
