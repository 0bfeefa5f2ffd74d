//! Payload validation for listing and review submissions.
//!
//! Each validator checks every rule and reports all failures at once, so a
//! rejected form produces one message per offending field.

use crate::api::{ListingInput, NewListing, NewReview, ReviewInput};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Field errors for a rejected payload, in the order the fields were checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .0.join(","))]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

#[derive(Default)]
struct Collector(Vec<String>);

impl Collector {
    fn text(&mut self, path: &str, value: Option<&str>) -> String {
        match value.map(str::trim) {
            None => {
                self.0.push(format!("\"{path}\" is required"));
                String::new()
            }
            Some("") => {
                self.0.push(format!("\"{path}\" is not allowed to be empty"));
                String::new()
            }
            Some(text) => text.to_string(),
        }
    }

    fn integer(&mut self, path: &str, value: Option<&str>, min: i64, max: Option<i64>) -> i64 {
        let Some(raw) = value.map(str::trim) else {
            self.0.push(format!("\"{path}\" is required"));
            return 0;
        };
        let Ok(number) = raw.parse::<i64>() else {
            self.0.push(format!("\"{path}\" must be a number"));
            return 0;
        };
        if number < min {
            self.0.push(format!("\"{path}\" must be greater than or equal to {min}"));
        }
        if let Some(max) = max.filter(|max| number > *max) {
            self.0.push(format!("\"{path}\" must be less than or equal to {max}"));
        }
        number
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

pub fn validate_listing(input: &ListingInput) -> Result<NewListing, ValidationErrors> {
    let mut errors = Collector::default();

    let title = errors.text("listing.title", input.title.as_deref());
    let description = errors.text("listing.description", input.description.as_deref());
    let price = errors.integer("listing.price", input.price.as_deref(), 0, None);
    let location = errors.text("listing.location", input.location.as_deref());
    let country = errors.text("listing.country", input.country.as_deref());
    let image_url = input
        .image
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    errors.finish(NewListing {
        title,
        description,
        price,
        location,
        country,
        image_url,
    })
}

pub fn validate_review(input: &ReviewInput) -> Result<NewReview, ValidationErrors> {
    let mut errors = Collector::default();

    let rating = errors.integer(
        "review.rating",
        input.rating.as_deref(),
        MIN_RATING,
        Some(MAX_RATING),
    );
    let comment = errors.text("review.comment", input.comment.as_deref());

    let rating = u8::try_from(rating).unwrap_or_default();
    errors.finish(NewReview { rating, comment })
}
