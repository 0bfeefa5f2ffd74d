pub mod auth;
pub mod error;
pub mod form;
pub mod geocode;
pub mod listings;
pub mod middleware;
pub mod reviews;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

pub use error::AppError;
pub use state::{AppState, AppStateInner};
