use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;
use uuid::Uuid;

use wanderworld_types::api::ReviewInput;
use wanderworld_types::validation::validate_review;

use crate::error::AppError;
use crate::form::Form;
use crate::listings::LISTING_MISSING;
use crate::middleware::{CurrentUser, ReviewPath};
use crate::session::SessionContext;
use crate::state::{AppState, parse_id};

/// POST /listings/{id}/reviews
pub async fn create(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    session: SessionContext,
    Form(input): Form<ReviewInput>,
) -> Result<Response, AppError> {
    let listing_id = parse_id(&listing_id, "listing")?;
    let review = validate_review(&input)?;

    let review_id = Uuid::new_v4();
    let author = user.id;
    let created = state
        .db(move |db| {
            if db.get_listing(listing_id)?.is_none() {
                return Ok(false);
            }
            db.insert_review(review_id, listing_id, author, &review)?;
            Ok(true)
        })
        .await?;

    if !created {
        session.flash_error(LISTING_MISSING).await?;
        return Ok(Redirect::to("/listings").into_response());
    }

    info!("User {} reviewed listing {}", user.username, listing_id);
    session.flash_success("New Review Created!").await?;
    Ok(Redirect::to(&format!("/listings/{listing_id}")).into_response())
}

/// DELETE /listings/{id}/reviews/{review_id}
pub async fn destroy(
    State(state): State<AppState>,
    Path(path): Path<ReviewPath>,
    session: SessionContext,
) -> Result<Response, AppError> {
    let listing_id = parse_id(&path.id, "listing")?;
    let review_id = parse_id(&path.review_id, "review")?;

    if state
        .db(move |db| db.delete_review(listing_id, review_id))
        .await?
    {
        session.flash_success("Review Deleted!").await?;
    } else {
        session.flash_error("Review not found").await?;
    }
    Ok(Redirect::to(&format!("/listings/{listing_id}")).into_response())
}
