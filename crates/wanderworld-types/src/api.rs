use serde::Deserialize;

// -- Listings --

/// Raw listing form as submitted by the browser. Every field is optional
/// here; `validation::validate_listing` decides what is acceptable.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListingInput {
    #[serde(rename = "listing[title]")]
    pub title: Option<String>,
    #[serde(rename = "listing[description]")]
    pub description: Option<String>,
    #[serde(rename = "listing[price]")]
    pub price: Option<String>,
    #[serde(rename = "listing[location]")]
    pub location: Option<String>,
    #[serde(rename = "listing[country]")]
    pub country: Option<String>,
    #[serde(rename = "listing[image]")]
    pub image: Option<String>,
}

/// A listing payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub location: String,
    pub country: String,
    pub image_url: Option<String>,
}

impl NewListing {
    /// The forward-geocoding query for this listing.
    pub fn place_query(&self) -> String {
        format!("{}, {}", self.location, self.country)
    }
}

// -- Reviews --

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReviewInput {
    #[serde(rename = "review[rating]")]
    pub rating: Option<String>,
    #[serde(rename = "review[comment]")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
