use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use wanderworld_types::api::ListingInput;
use wanderworld_types::validation::validate_listing;

use crate::error::AppError;
use crate::form::Form;
use crate::geocode::locate;
use crate::middleware::CurrentUser;
use crate::session::SessionContext;
use crate::state::{AppState, parse_id};
use crate::views::Locals;

pub const LISTING_MISSING: &str = "Listing you requested for does not exist!";

/// GET /listings
pub async fn index(State(state): State<AppState>, locals: Locals) -> Result<Response, AppError> {
    let all_listings = state.db(|db| db.list_listings()).await?;
    Ok(locals
        .page("listings/index", json!({ "all_listings": all_listings }))
        .await?
        .into_response())
}

/// GET /listings/new
pub async fn new_form(locals: Locals) -> Result<Response, AppError> {
    Ok(locals.page("listings/new", json!({})).await?.into_response())
}

/// GET /listings/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: SessionContext,
    locals: Locals,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "listing")?;

    let Some(detail) = state.db(move |db| db.get_listing_detail(id)).await? else {
        session.flash_error(LISTING_MISSING).await?;
        return Ok(Redirect::to("/listings").into_response());
    };

    let viewer = locals.viewer_id();
    let is_owner = viewer.is_some_and(|user| detail.listing.is_owned_by(user));
    let reviews: Vec<_> = detail
        .reviews
        .iter()
        .map(|review| {
            json!({
                "review": review,
                "can_delete": viewer.is_some_and(|user| review.is_authored_by(user)),
            })
        })
        .collect();

    Ok(locals
        .page(
            "listings/show",
            json!({ "listing": detail, "reviews": reviews, "is_owner": is_owner }),
        )
        .await?
        .into_response())
}

/// POST /listings
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: SessionContext,
    Form(input): Form<ListingInput>,
) -> Result<Response, AppError> {
    let listing = validate_listing(&input)?;
    let geometry = locate(state.geocoder.as_ref(), &listing.place_query()).await;

    let id = Uuid::new_v4();
    let owner = user.id;
    state
        .db(move |db| db.insert_listing(id, owner, &listing, geometry))
        .await?;

    info!("User {} created listing {}", user.username, id);
    session.flash_success("New Listing Created!").await?;
    Ok(Redirect::to("/listings").into_response())
}

/// GET /listings/{id}/edit
pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: SessionContext,
    locals: Locals,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "listing")?;

    let Some(listing) = state.db(move |db| db.get_listing(id)).await? else {
        session.flash_error(LISTING_MISSING).await?;
        return Ok(Redirect::to("/listings").into_response());
    };

    Ok(locals
        .page("listings/edit", json!({ "listing": listing }))
        .await?
        .into_response())
}

/// PUT /listings/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: SessionContext,
    Form(input): Form<ListingInput>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "listing")?;
    let listing = validate_listing(&input)?;

    let Some(current) = state.db(move |db| db.get_listing(id)).await? else {
        session.flash_error(LISTING_MISSING).await?;
        return Ok(Redirect::to("/listings").into_response());
    };

    // Only re-geocode when the place actually moved.
    let moved = current.location != listing.location || current.country != listing.country;
    let geometry = if moved || current.geometry.is_none() {
        locate(state.geocoder.as_ref(), &listing.place_query()).await
    } else {
        current.geometry
    };

    state
        .db(move |db| db.update_listing(id, &listing, geometry))
        .await?;

    session.flash_success("Listing Updated!").await?;
    Ok(Redirect::to(&format!("/listings/{id}")).into_response())
}

/// DELETE /listings/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    session: SessionContext,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "listing")?;

    if state.db(move |db| db.delete_listing(id)).await? {
        info!("User {} deleted listing {}", user.username, id);
        session.flash_success("Listing Deleted!").await?;
    } else {
        session.flash_error(LISTING_MISSING).await?;
    }
    Ok(Redirect::to("/listings").into_response())
}
