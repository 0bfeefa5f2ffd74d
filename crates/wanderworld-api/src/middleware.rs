//! Request gates. Each either hands the request to the next layer or ends
//! it with a flash message and a redirect.

use axum::{
    extract::{Path, Request, State},
    http::{Method, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionContext;
use crate::state::{AppState, parse_id};

pub const LOGIN_REQUIRED: &str = "You must be logged in to create listing!";

/// The authenticated user, available to handlers behind `is_logged_in`.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Who is making the request, if anyone. Set for every request by
/// `load_current_user`.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<CurrentUser>);

/// Post-login destination captured by `save_redirect_url`.
#[derive(Debug, Clone, Default)]
pub struct RedirectUrl(pub Option<String>);

#[derive(Debug, Deserialize)]
pub struct ListingPath {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPath {
    pub id: String,
    pub review_id: String,
}

/// Resolves the session's user id into a `Viewer`.
pub async fn load_current_user(
    State(state): State<AppState>,
    session: SessionContext,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let viewer = match session.user_id().await? {
        Some(id) => {
            let user = state.db(move |db| db.get_user_by_id(id)).await?;
            if user.is_none() {
                debug!("Session names unknown user {}", id);
            }
            user.map(|user| CurrentUser {
                id: user.id,
                username: user.username,
            })
        }
        None => None,
    };

    req.extensions_mut().insert(Viewer(viewer));
    Ok(next.run(req).await)
}

pub async fn is_logged_in(
    session: SessionContext,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.0.clone());

    let Some(user) = user else {
        session.stash_redirect_url(&return_path(&req)).await?;
        session.flash_error(LOGIN_REQUIRED).await?;
        return Ok(Redirect::to("/login").into_response());
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn save_redirect_url(
    session: SessionContext,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let url = session.take_redirect_url().await?;
    req.extensions_mut().insert(RedirectUrl(url));
    Ok(next.run(req).await)
}

pub async fn is_owner(
    State(state): State<AppState>,
    session: SessionContext,
    Path(path): Path<ListingPath>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = parse_id(&path.id, "listing")?;
    let user = require_user(&req)?;

    let listing = state.db(move |db| db.get_listing(id)).await?;
    let Some(listing) = listing else {
        session.flash_error("Listing not found").await?;
        return Ok(Redirect::to("/listings").into_response());
    };

    if !listing.is_owned_by(user.id) {
        session.flash_error("You are not the owner").await?;
        return Ok(Redirect::to(&format!("/listings/{id}")).into_response());
    }

    Ok(next.run(req).await)
}

pub async fn is_review_author(
    State(state): State<AppState>,
    session: SessionContext,
    Path(path): Path<ReviewPath>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let listing_id = parse_id(&path.id, "listing")?;
    let review_id = parse_id(&path.review_id, "review")?;
    let user = require_user(&req)?;
    let back = same_host_referer(&req).unwrap_or_else(|| format!("/listings/{listing_id}"));

    let review = state.db(move |db| db.get_review(review_id)).await?;
    let Some(review) = review.filter(|review| review.listing_id == listing_id) else {
        session.flash_error("Review not found").await?;
        return Ok(Redirect::to(&back).into_response());
    };

    if !review.is_authored_by(user.id) {
        session.flash_error("You are not the author of this review").await?;
        return Ok(Redirect::to(&back).into_response());
    }

    Ok(next.run(req).await)
}

/// Rewrites `POST ...?_method=PUT|PATCH|DELETE` into the named method so
/// HTML forms can reach those routes. Must run before routing.
pub fn method_override(mut req: Request) -> Request {
    if req.method() != Method::POST {
        return req;
    }

    let requested = req.uri().query().and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("_method="))
            .map(str::to_ascii_uppercase)
    });

    match requested.as_deref() {
        Some("PUT") => *req.method_mut() = Method::PUT,
        Some("PATCH") => *req.method_mut() = Method::PATCH,
        Some("DELETE") => *req.method_mut() = Method::DELETE,
        _ => {}
    }
    req
}

fn require_user(req: &Request) -> Result<CurrentUser, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("ownership gate ran without an authenticated user").into())
}

/// Where to send the user after logging in. Page loads return to themselves;
/// form submissions return to the page that held the form, or to the path
/// they targeted when that page is unknown.
fn return_path(req: &Request) -> String {
    if req.method() == Method::GET {
        return req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
    }
    same_host_referer(req).unwrap_or_else(|| req.uri().path().to_string())
}

/// The Referer's path, only when it points back at this host.
fn same_host_referer(req: &Request) -> Option<String> {
    let host = req.headers().get(header::HOST)?.to_str().ok()?;
    let referer: axum::http::Uri = req.headers().get(header::REFERER)?.to_str().ok()?.parse().ok()?;

    if referer.authority()?.as_str() != host {
        return None;
    }
    referer
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn post(uri: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn method_override_rewrites_posts_only() {
        assert_eq!(method_override(post("/listings/1?_method=PUT")).method(), Method::PUT);
        assert_eq!(method_override(post("/listings/1?_method=delete")).method(), Method::DELETE);
        assert_eq!(method_override(post("/listings?x=1&_method=PATCH")).method(), Method::PATCH);
        assert_eq!(method_override(post("/listings?_method=GET")).method(), Method::POST);
        assert_eq!(method_override(post("/listings")).method(), Method::POST);

        let get = Request::builder()
            .uri("/listings?_method=DELETE")
            .body(Body::empty())
            .unwrap();
        assert_eq!(method_override(get).method(), Method::GET);
    }

    #[test]
    fn referer_must_match_host() {
        let req = Request::builder()
            .header(header::HOST, "localhost:8000")
            .header(header::REFERER, "http://localhost:8000/listings/abc?page=2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(same_host_referer(&req).as_deref(), Some("/listings/abc?page=2"));

        let foreign = Request::builder()
            .header(header::HOST, "localhost:8000")
            .header(header::REFERER, "https://evil.example/phish")
            .body(Body::empty())
            .unwrap();
        assert_eq!(same_host_referer(&foreign), None);

        let missing = Request::builder()
            .header(header::HOST, "localhost:8000")
            .body(Body::empty())
            .unwrap();
        assert_eq!(same_host_referer(&missing), None);
    }

    #[test]
    fn return_path_for_page_loads_keeps_query() {
        let req = Request::builder()
            .uri("/listings/abc/edit?tab=photos")
            .body(Body::empty())
            .unwrap();
        assert_eq!(return_path(&req), "/listings/abc/edit?tab=photos");
        assert_eq!(return_path(&post("/listings")), "/listings");
    }

    #[test]
    fn return_path_without_referer_is_the_target_path() {
        let put = Request::builder()
            .method(Method::PUT)
            .uri("/listings/abc?_method=PUT")
            .header(header::HOST, "localhost")
            .body(Body::empty())
            .unwrap();
        assert_eq!(return_path(&put), "/listings/abc");
    }
}
