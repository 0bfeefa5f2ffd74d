use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shown for listings created without an image.
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1625505826533-5c80aca7d157?auto=format&fit=crop&w=800&q=60";

pub const DEFAULT_IMAGE_FILENAME: &str = "listingimage";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A GeoJSON-style point. Coordinates are stored longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub filename: String,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            url: DEFAULT_IMAGE_URL.to_string(),
            filename: DEFAULT_IMAGE_FILENAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub location: String,
    pub country: String,
    pub image: Image,
    pub geometry: Option<GeoPoint>,
    /// `None` only for rows written before ownership was recorded.
    pub owner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// True only when the listing has an owner and it is `user_id`.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub author: Uuid,
    pub author_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author == user_id
    }
}

/// A listing together with everything its detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub owner_username: Option<String>,
    /// Oldest first.
    pub reviews: Vec<Review>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(owner: Option<Uuid>) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            title: "Cabin".into(),
            description: "Quiet".into(),
            price: 100,
            location: "X".into(),
            country: "Y".into(),
            image: Image::default(),
            geometry: None,
            owner,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_check_requires_matching_owner() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(listing(Some(owner)).is_owned_by(owner));
        assert!(!listing(Some(owner)).is_owned_by(other));
    }

    #[test]
    fn listing_without_owner_is_owned_by_nobody() {
        assert!(!listing(None).is_owned_by(Uuid::new_v4()));
        assert!(!listing(None).is_owned_by(Uuid::nil()));
    }

    #[test]
    fn review_author_check() {
        let author = Uuid::new_v4();
        let review = Review {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            rating: 4,
            comment: "Lovely".into(),
            author,
            author_username: None,
            created_at: Utc::now(),
        };

        assert!(review.is_authored_by(author));
        assert!(!review.is_authored_by(Uuid::new_v4()));
    }
}
