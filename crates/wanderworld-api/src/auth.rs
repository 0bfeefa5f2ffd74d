use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use wanderworld_db::TakenField;
use wanderworld_types::api::{LoginForm, SignupForm};

use crate::error::AppError;
use crate::form::Form;
use crate::middleware::RedirectUrl;
use crate::session::SessionContext;
use crate::state::AppState;
use crate::views::Locals;

pub const LOGIN_FAILED: &str = "Invalid username or password";

/// GET /signup
pub async fn signup_form(locals: Locals) -> Result<Response, AppError> {
    Ok(locals.page("users/signup", json!({})).await?.into_response())
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();

    if let Some(problem) = signup_problem(&username, &email, &form.password) {
        session.flash_error(problem).await?;
        return Ok(Redirect::to("/signup").into_response());
    }

    let (lookup_name, lookup_email) = (username.clone(), email.clone());
    let taken = state
        .db(move |db| {
            if db.get_user_by_username(&lookup_name)?.is_some() {
                return Ok(Some(TakenField::Username));
            }
            if db.get_user_by_email(&lookup_email)?.is_some() {
                return Ok(Some(TakenField::Email));
            }
            Ok(None)
        })
        .await?;
    if let Some(field) = taken {
        session.flash_error(taken_message(field)).await?;
        return Ok(Redirect::to("/signup").into_response());
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    // A concurrent signup can claim the name between the check and the insert.
    let user_id = Uuid::new_v4();
    let name = username.clone();
    let taken = state
        .db(move |db| db.create_user(user_id, &name, &email, &password_hash))
        .await?;
    if let Some(field) = taken {
        session.flash_error(taken_message(field)).await?;
        return Ok(Redirect::to("/signup").into_response());
    }

    info!("Registered user {} ({})", username, user_id);
    session.log_in(user_id).await?;
    session.flash_success("Welcome to Wanderworld!").await?;
    Ok(Redirect::to("/listings").into_response())
}

/// GET /login
pub async fn login_form(locals: Locals) -> Result<Response, AppError> {
    Ok(locals.page("users/login", json!({})).await?.into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    session: SessionContext,
    Extension(RedirectUrl(redirect_url)): Extension<RedirectUrl>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let lookup = username.clone();
    let user = state.db(move |db| db.get_user_by_username(&lookup)).await?;

    let verified = user.filter(|user| match PasswordHash::new(&user.password) {
        Ok(parsed) => Argon2::default()
            .verify_password(form.password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash for {} is unreadable: {}", user.username, e);
            false
        }
    });

    let Some(user) = verified else {
        session.flash_error(LOGIN_FAILED).await?;
        return Ok(Redirect::to("/login").into_response());
    };

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    session.log_in(user_id).await?;
    session.flash_success("Welcome back to Wanderworld!").await?;
    let target = redirect_url.unwrap_or_else(|| "/listings".to_string());
    Ok(Redirect::to(&target).into_response())
}

/// GET /logout
pub async fn logout(session: SessionContext) -> Result<Response, AppError> {
    session.log_out().await?;
    session.flash_success("You are logged out!").await?;
    Ok(Redirect::to("/listings").into_response())
}

fn taken_message(field: TakenField) -> &'static str {
    match field {
        TakenField::Username => "A user with the given username is already registered",
        TakenField::Email => "A user with the given email is already registered",
    }
}

/// Basic shape checks on a signup form; uniqueness is checked separately.
fn signup_problem(username: &str, email: &str, password: &str) -> Option<&'static str> {
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Some("Username must be between 3 and 32 characters");
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Some("Please enter a valid email address");
    }
    if password.len() < 8 {
        return Some("Password must be at least 8 characters");
    }
    None
}
