//! Backend API integration

pub mod api;
pub mod sessions;

pub use api::{ApiError, ArenaApiClient};
pub use sessions::SessionStore;
