//! Session helpers to keep handlers and gates free of raw session keys.
//!
//! Wraps the tower-sessions [`Session`] so callers deal in user identity,
//! flash messages, and the post-login redirect target.

use axum::{extract::FromRequestParts, http::StatusCode, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_KEY: &str = "user_id";
pub const REDIRECT_URL_KEY: &str = "redirect_url";
pub const FLASH_KEY: &str = "flash";

/// One-time notices shown on the next rendered page.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub success: Vec<String>,
    pub error: Vec<String>,
}

#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub async fn user_id(&self) -> Result<Option<Uuid>, AppError> {
        let raw = self.0.get::<String>(USER_ID_KEY).await?;
        Ok(raw.and_then(|raw| match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("invalid user id in session: {}", e);
                None
            }
        }))
    }

    /// Binds the session to `user_id`, issuing a fresh session id.
    pub async fn log_in(&self, user_id: Uuid) -> Result<(), AppError> {
        self.0.cycle_id().await?;
        self.0.insert(USER_ID_KEY, user_id.to_string()).await?;
        Ok(())
    }

    /// Drops the identity but keeps the session so a flash can follow.
    pub async fn log_out(&self) -> Result<(), AppError> {
        self.0.remove::<String>(USER_ID_KEY).await?;
        self.0.cycle_id().await?;
        Ok(())
    }

    pub async fn flash_success(&self, message: impl Into<String>) -> Result<(), AppError> {
        let mut flash = self.peek_flash().await?;
        if push_once(&mut flash.success, message.into()) {
            self.0.insert(FLASH_KEY, flash).await?;
        }
        Ok(())
    }

    /// Queues an error notice. A notice already pending is not queued twice.
    pub async fn flash_error(&self, message: impl Into<String>) -> Result<(), AppError> {
        let mut flash = self.peek_flash().await?;
        if push_once(&mut flash.error, message.into()) {
            self.0.insert(FLASH_KEY, flash).await?;
        }
        Ok(())
    }

    /// Returns pending flash messages and clears them.
    pub async fn take_flash(&self) -> Result<Flash, AppError> {
        Ok(self.0.remove::<Flash>(FLASH_KEY).await?.unwrap_or_default())
    }

    async fn peek_flash(&self) -> Result<Flash, AppError> {
        Ok(self.0.get::<Flash>(FLASH_KEY).await?.unwrap_or_default())
    }

    pub async fn stash_redirect_url(&self, url: &str) -> Result<(), AppError> {
        self.0.insert(REDIRECT_URL_KEY, url).await?;
        Ok(())
    }

    /// Single use: the stored URL is removed as it is read.
    pub async fn take_redirect_url(&self) -> Result<Option<String>, AppError> {
        Ok(self.0.remove::<String>(REDIRECT_URL_KEY).await?)
    }
}

fn push_once(queue: &mut Vec<String>, message: String) -> bool {
    if queue.contains(&message) {
        return false;
    }
    queue.push(message);
    true
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> SessionContext {
        SessionContext::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn redirect_url_is_read_once() {
        let session = session();
        session.stash_redirect_url("/listings/new").await.unwrap();

        assert_eq!(
            session.take_redirect_url().await.unwrap().as_deref(),
            Some("/listings/new")
        );
        assert_eq!(session.take_redirect_url().await.unwrap(), None);
    }

    #[tokio::test]
    async fn flash_messages_are_consumed_on_read() {
        let session = session();
        session.flash_success("Listing Updated!").await.unwrap();
        session.flash_error("You are not the owner").await.unwrap();
        session.flash_error("Listing not found").await.unwrap();

        let flash = session.take_flash().await.unwrap();
        assert_eq!(flash.success, ["Listing Updated!"]);
        assert_eq!(flash.error, ["You are not the owner", "Listing not found"]);
        assert_eq!(session.take_flash().await.unwrap(), Flash::default());
    }

    #[tokio::test]
    async fn repeated_flash_is_queued_once() {
        let session = session();
        session.flash_error("You must be logged in to create listing!").await.unwrap();
        session.flash_error("You must be logged in to create listing!").await.unwrap();
        session.flash_success("Listing Updated!").await.unwrap();
        session.flash_success("Listing Updated!").await.unwrap();

        let flash = session.take_flash().await.unwrap();
        assert_eq!(flash.error, ["You must be logged in to create listing!"]);
        assert_eq!(flash.success, ["Listing Updated!"]);
    }

    #[tokio::test]
    async fn log_out_forgets_user_but_keeps_flash() {
        let session = session();
        let user = Uuid::new_v4();
        session.log_in(user).await.unwrap();
        assert_eq!(session.user_id().await.unwrap(), Some(user));

        session.log_out().await.unwrap();
        session.flash_success("You are logged out!").await.unwrap();
        assert_eq!(session.user_id().await.unwrap(), None);
        assert_eq!(session.take_flash().await.unwrap().success.len(), 1);
    }
}
