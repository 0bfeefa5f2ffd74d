use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Html,
};
use handlebars::{Handlebars, TemplateError};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::middleware::{CurrentUser, Viewer};
use crate::session::SessionContext;
use crate::state::AppState;

static PARTIALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("header", include_str!("../templates/partials/header.hbs"));
    m.insert("footer", include_str!("../templates/partials/footer.hbs"));
    m
});

static PAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("error", include_str!("../templates/error.hbs"));
    m.insert("listings/index", include_str!("../templates/listings/index.hbs"));
    m.insert("listings/new", include_str!("../templates/listings/new.hbs"));
    m.insert("listings/show", include_str!("../templates/listings/show.hbs"));
    m.insert("listings/edit", include_str!("../templates/listings/edit.hbs"));
    m.insert("users/signup", include_str!("../templates/users/signup.hbs"));
    m.insert("users/login", include_str!("../templates/users/login.hbs"));
    m
});

static REGISTRY: Lazy<Result<Handlebars<'static>, TemplateError>> = Lazy::new(|| {
    let mut hb = Handlebars::new();
    for (name, source) in PARTIALS.iter() {
        hb.register_partial(name, *source)?;
    }
    for (name, source) in PAGES.iter() {
        hb.register_template_string(name, *source)?;
    }
    Ok(hb)
});

/// Render a page by name with Handlebars.
pub fn render(name: &str, ctx: &Value) -> anyhow::Result<String> {
    let hb = REGISTRY
        .as_ref()
        .map_err(|e| anyhow!("template registry failed to load: {e}"))?;

    hb.render(name, ctx)
        .map_err(|e| anyhow!("rendering page '{name}' failed: {e}"))
}

/// Values every page can show: pending flash messages, the signed-in user,
/// and the public map token. Flash messages are only consumed when a page
/// is actually rendered, so a handler that redirects instead keeps them.
pub struct Locals {
    session: SessionContext,
    pub curr_user: Option<CurrentUser>,
    pub map_token: Option<String>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    success: Vec<String>,
    error: Vec<String>,
    curr_user: Option<&'a CurrentUser>,
    map_token: Option<&'a str>,
}

impl Locals {
    pub fn new(session: SessionContext, curr_user: Option<CurrentUser>, map_token: Option<String>) -> Self {
        Self {
            session,
            curr_user,
            map_token,
        }
    }

    pub fn viewer_id(&self) -> Option<uuid::Uuid> {
        self.curr_user.as_ref().map(|user| user.id)
    }

    /// Renders `template` with `data` merged over these locals.
    pub async fn page(self, template: &str, data: Value) -> Result<Html<String>, AppError> {
        let flash = self.session.take_flash().await?;
        let page = PageContext {
            success: flash.success,
            error: flash.error,
            curr_user: self.curr_user.as_ref(),
            map_token: self.map_token.as_deref(),
        };

        let mut ctx = match serde_json::to_value(&page).map_err(anyhow::Error::from)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(data) = data {
            ctx.extend(data);
        }

        Ok(Html(render(template, &Value::Object(ctx))?))
    }
}

impl FromRequestParts<AppState> for Locals {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| anyhow!(msg))?;
        let curr_user = parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.0.clone());

        Ok(Self::new(session, curr_user, state.map_token.clone()))
    }
}
