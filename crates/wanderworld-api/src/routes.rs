use std::path::Path;

use axum::{
    Router,
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower::{Layer, util::{MapRequest, MapRequestLayer}};
use tower_http::services::ServeDir;

use crate::error::not_found;
use crate::middleware::{
    is_logged_in, is_owner, is_review_author, load_current_user, method_override,
    save_redirect_url,
};
use crate::state::AppState;
use crate::{auth, listings, reviews};

/// The router with every route, its gates, and the current-user loader.
/// Callers must wrap it in a tower-sessions `SessionManagerLayer`.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/listings") }))
        .route("/listings", get(listings::index))
        .route("/listings/new", get(listings::new_form))
        .route("/listings/{id}", get(listings::show))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form))
        .route("/logout", get(auth::logout));

    let login_routes = Router::new()
        .route("/login", post(auth::login))
        .route_layer(from_fn(save_redirect_url));

    let member_routes = Router::new()
        .route("/listings", post(listings::create))
        .route("/listings/{id}/reviews", post(reviews::create))
        .route_layer(from_fn(is_logged_in));

    // route_layer: the last layer added runs first, so authentication
    // happens before the ownership lookup.
    let owner_routes = Router::new()
        .route("/listings/{id}/edit", get(listings::edit_form))
        .route("/listings/{id}", put(listings::update).delete(listings::destroy))
        .route_layer(from_fn_with_state(state.clone(), is_owner))
        .route_layer(from_fn(is_logged_in));

    let author_routes = Router::new()
        .route("/listings/{id}/reviews/{review_id}", delete(reviews::destroy))
        .route_layer(from_fn_with_state(state.clone(), is_review_author))
        .route_layer(from_fn(is_logged_in));

    Router::new()
        .merge(public_routes)
        .merge(login_routes)
        .merge(member_routes)
        .merge(owner_routes)
        .merge(author_routes)
        // Static files are added after the loader so they skip the user lookup.
        .layer(from_fn_with_state(state.clone(), load_current_user))
        .nest_service("/static", ServeDir::new(public_dir))
        .fallback(not_found)
        .with_state(state)
}

pub type App = MapRequest<Router, fn(Request) -> Request>;

/// Applies the `_method` override ahead of routing.
pub fn with_method_override(router: Router) -> App {
    MapRequestLayer::new(method_override as fn(Request) -> Request).layer(router)
}
